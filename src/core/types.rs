//! Core data model shared by the pipeline, crawler, and store (SPEC_FULL.md §3).

use std::collections::HashMap;

use scraper::Html;
use tokio_util::sync::CancellationToken;
use url::Url;

/// The mutable envelope that flows through the [`crate::pipeline::Pipeline`].
///
/// `source` is an absolute, normalized URL and is never rewritten by a
/// middleware. `content_type` starts as whatever the `Fetcher` reported and
/// is rewritten by `HtmlToMarkdown` to `text/markdown`. `dom` is populated by
/// `HtmlParser` and consumed by the other HTML-aware stages; it is cleared
/// once `HtmlToMarkdown` has run since nothing downstream is HTML-aware.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub content: String,
    pub content_type: String,
    pub source: Url,
    pub dom: Option<Html>,
    pub metadata: HashMap<String, String>,
    pub links: Vec<Url>,
    pub errors: Vec<String>,
    pub options: ScraperOptions,
}

impl ProcessingContext {
    pub fn new(content: String, content_type: String, source: Url, options: ScraperOptions) -> Self {
        Self {
            content,
            content_type,
            source,
            dom: None,
            metadata: HashMap::new(),
            links: Vec::new(),
            errors: Vec::new(),
            options,
        }
    }

    /// Push a non-fatal error onto the accumulator. Never aborts the chain.
    pub fn push_error(&mut self, stage: &str, err: impl std::fmt::Display) {
        self.errors.push(format!("{stage}: {err}"));
    }

    pub fn is_html(&self) -> bool {
        self.content_type.starts_with("text/html")
    }
}

/// A chunk of normalized text plus its embedding, ready to be persisted by
/// the [`crate::store::Store`]. `library`/`version` are lowercased; an empty
/// `version` is the valid "unversioned" sentinel.
#[derive(Debug, Clone)]
pub struct Document {
    pub library: String,
    pub version: String,
    pub url: String,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub embedding: Vec<f32>,
}

/// A row returned from [`crate::store::Store::find_by_content`], fused by RRF.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub id: i64,
    pub document: Document,
    pub score: f64,
}

/// Scope predicate applied to discovered links (SPEC_FULL.md / spec.md §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Same hostname AND path begins with the starting URL's directory.
    Subpages,
    /// Same exact hostname.
    Hostname,
    /// Same registrable domain, including subdomains.
    Domain,
}

impl Scope {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subpages" => Some(Scope::Subpages),
            "hostname" => Some(Scope::Hostname),
            "domain" => Some(Scope::Domain),
            _ => None,
        }
    }
}

/// Fetcher selection (spec.md §4.A). `Auto` resolves to `Playwright`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMode {
    Fetch,
    Playwright,
    Auto,
}

impl ScrapeMode {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fetch" => Some(ScrapeMode::Fetch),
            "playwright" => Some(ScrapeMode::Playwright),
            "auto" => Some(ScrapeMode::Auto),
            _ => None,
        }
    }

    pub fn resolved(self) -> ScrapeMode {
        match self {
            ScrapeMode::Auto => ScrapeMode::Playwright,
            other => other,
        }
    }
}

/// The recognized configuration surface for a scrape run (spec.md §6).
#[derive(Debug, Clone)]
pub struct ScraperOptions {
    pub url: String,
    pub library: String,
    pub version: String,
    pub max_pages: usize,
    pub max_depth: usize,
    pub max_concurrency: usize,
    pub scope: Scope,
    pub follow_redirects: bool,
    pub exclude_selectors: Vec<String>,
    pub ignore_errors: bool,
    pub scrape_mode: ScrapeMode,
    pub cancellation: CancellationToken,
}

impl ScraperOptions {
    pub fn new(url: impl Into<String>, library: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            library: library.into().to_lowercase(),
            version: version.into().to_lowercase(),
            max_pages: 100,
            max_depth: 3,
            max_concurrency: 5,
            scope: Scope::Subpages,
            follow_redirects: true,
            exclude_selectors: Vec::new(),
            ignore_errors: true,
            scrape_mode: ScrapeMode::Auto,
            cancellation: CancellationToken::new(),
        }
    }
}

/// `(bytes, content_type, status, final_url)` resolved by a [`crate::fetch::Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub status: u16,
    pub final_url: Url,
}

/// Progress reported by the [`crate::crawler::Crawler`] after each page.
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    pub url: String,
    pub depth: usize,
    pub pages_scraped: usize,
    pub documents_emitted: usize,
    pub errors: Vec<String>,
}
