use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use doctrove::core::config::chrome_executable_override;
use doctrove::core::{DoctroveConfig, DoctroveError};
use doctrove::{Crawler, Embed, EmbedProvider, FixedDimensionEmbeddings, Model2VecEmbedder, Scope, ScrapeMode, ScraperOptions, Store};

/// Manual `--flag value` / `--flag=value` argument parsing, the same style
/// as the teacher's `parse_port_from_args`/`port_from_env` helpers — CLI
/// argument parsing is deliberately not delegated to a crate here.
struct Args {
    rest: Vec<String>,
}

impl Args {
    fn new(args: Vec<String>) -> Self {
        Self { rest: args }
    }

    fn take_flag(&mut self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        if let Some(idx) = self.rest.iter().position(|a| a == name) {
            self.rest.remove(idx);
            if idx < self.rest.len() {
                return Some(self.rest.remove(idx));
            }
            return None;
        }
        if let Some(idx) = self.rest.iter().position(|a| a.starts_with(&prefix)) {
            let value = self.rest.remove(idx);
            return Some(value[prefix.len()..].to_string());
        }
        None
    }

    fn take_all_flag(&mut self, name: &str) -> Vec<String> {
        let mut values = Vec::new();
        while let Some(v) = self.take_flag(name) {
            values.push(v);
        }
        values
    }

    fn take_bool_flag(&mut self, name: &str) -> bool {
        if let Some(idx) = self.rest.iter().position(|a| a == name) {
            self.rest.remove(idx);
            true
        } else {
            false
        }
    }
}

/// Every error raised along the way — fetch, crawl, embed, store, or a bare
/// `anyhow::Error` from config/CLI handling — is aggregated into
/// `DoctroveError` here, the single error type the process can exit with.
#[tokio::main]
async fn main() -> Result<(), DoctroveError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        print_usage();
        std::process::exit(2);
    }
    let command = argv.remove(0);
    let mut args = Args::new(argv);

    let config = DoctroveConfig::load();
    let embedder = build_embedder(&config).await?;
    let store = Store::initialize(&config.sqlite_path, embedder, config.vector_dimension)
        .await
        .context("failed to initialize store")?;

    let result = match command.as_str() {
        "scrape" => run_scrape(&mut args, &config, &store).await,
        "search" => run_search(&mut args, &store).await,
        other => {
            warn!(command = other, "unknown subcommand");
            print_usage();
            std::process::exit(2);
        }
    };
    result.map_err(DoctroveError::from)
}

async fn build_embedder(config: &DoctroveConfig) -> Result<Arc<dyn Embed>> {
    let provider = EmbedProvider::parse(&config.embed_provider)
        .map_err(|e| anyhow::anyhow!("invalid embed_provider {:?}: {e}", config.embed_provider))?;
    if provider.provider != "model2vec" {
        bail!("unsupported embedding provider: {}", provider.provider);
    }
    let inner = Model2VecEmbedder::load(provider.model)
        .await
        .context("failed to load embedding model")?;
    let wrapped = FixedDimensionEmbeddings::new(inner, config.vector_dimension)
        .context("embedding dimension exceeds configured vector_dimension")?;
    Ok(Arc::new(wrapped))
}

async fn run_scrape(args: &mut Args, config: &DoctroveConfig, store: &Store) -> Result<()> {
    let url = args.take_flag("--url").context("--url is required")?;
    let library = args.take_flag("--library").context("--library is required")?;
    let version = args.take_flag("--version").unwrap_or_default();

    let mut options = ScraperOptions::new(url, library, version);
    if let Some(v) = args.take_flag("--max-pages") {
        options.max_pages = v.parse().context("--max-pages must be an integer")?;
    }
    if let Some(v) = args.take_flag("--max-depth") {
        options.max_depth = v.parse().context("--max-depth must be an integer")?;
    }
    if let Some(v) = args.take_flag("--max-concurrency") {
        options.max_concurrency = v.parse().context("--max-concurrency must be an integer")?;
    }
    if let Some(v) = args.take_flag("--scope") {
        options.scope = Scope::parse_str(&v).with_context(|| format!("invalid --scope {v:?}"))?;
    }
    if let Some(v) = args.take_flag("--scrape-mode") {
        options.scrape_mode = ScrapeMode::parse_str(&v).with_context(|| format!("invalid --scrape-mode {v:?}"))?;
    }
    if args.take_bool_flag("--no-follow-redirects") {
        options.follow_redirects = false;
    }
    if args.take_bool_flag("--fail-fast") {
        options.ignore_errors = false;
    }
    options.exclude_selectors = args.take_all_flag("--exclude-selector");

    let library = options.library.clone();
    let version = options.version.clone();

    let crawler = Crawler::new(chrome_executable_override(config));
    let progress = Arc::new(move |p: doctrove::CrawlProgress| {
        info!(
            url = %p.url,
            depth = p.depth,
            pages_scraped = p.pages_scraped,
            documents_emitted = p.documents_emitted,
            errors = p.errors.len(),
            "page scraped"
        );
        for err in &p.errors {
            warn!(page = %p.url, error = %err, "page-level error");
        }
    });

    let documents = crawler.crawl(options, progress).await.context("crawl failed")?;
    info!(count = documents.len(), "crawl complete, writing to store");
    store
        .add_documents(&library, &version, &documents)
        .await
        .context("failed to persist documents")?;
    println!("scraped and stored {} documents", documents.len());
    Ok(())
}

async fn run_search(args: &mut Args, store: &Store) -> Result<()> {
    let library = args.take_flag("--library").context("--library is required")?;
    let version = args.take_flag("--version").unwrap_or_default();
    let query = args.take_flag("--query").context("--query is required")?;
    let limit: usize = args
        .take_flag("--limit")
        .map(|v| v.parse())
        .transpose()
        .context("--limit must be an integer")?
        .unwrap_or(10);

    let results = store
        .find_by_content(&library, &version, &query, limit)
        .await
        .context("search failed")?;

    if results.is_empty() {
        println!("no results");
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} — {}",
            rank + 1,
            result.score,
            result.document.url,
            result.document.content.chars().take(120).collect::<String>()
        );
    }
    Ok(())
}

fn print_usage() {
    error!("usage: doctrove <scrape|search> [flags]");
    eprintln!(
        "usage:\n  doctrove scrape --url <url> --library <lib> [--version <v>] [--max-pages N] [--max-depth N]\n                  [--max-concurrency N] [--scope subpages|hostname|domain] [--scrape-mode fetch|playwright|auto]\n                  [--no-follow-redirects] [--fail-fast] [--exclude-selector <css>]...\n  doctrove search --library <lib> [--version <v>] --query <text> [--limit N]"
    );
}
