//! Bounded-BFS crawl orchestrator (spec.md §4.E). Grounded in the teacher's
//! `tools::crawl` module: a `futures::stream::iter(...).buffer_unordered(n)`
//! round per BFS depth level gives cooperative, bounded I/O concurrency
//! without a hand-rolled worker-pool/semaphore, and link discovery order
//! within a page is preserved by pushing discovered links in DOM order.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use url::Url;

use crate::core::error::{CrawlError, FetchError};
use crate::core::types::{CrawlProgress, Document, ProcessingContext, ScrapeMode, ScraperOptions};
use crate::fetch::{BrowserFetcher, Fetcher, LocalFileFetcher, StaticFetcher};
use crate::pipeline::default_html_chain;
use crate::strategy::{select_strategy, ScrapeStrategy};

/// Reported once per completed page, in completion order (nondeterministic
/// across pages; `pages_scraped` is monotonically non-decreasing).
pub type ProgressFn = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

pub struct Crawler {
    static_fetcher: Arc<dyn Fetcher>,
    browser_fetcher: Arc<dyn Fetcher>,
    local_fetcher: Arc<dyn Fetcher>,
}

impl Crawler {
    pub fn new(chrome_executable: Option<String>) -> Self {
        Self {
            static_fetcher: Arc::new(StaticFetcher::new()),
            browser_fetcher: Arc::new(BrowserFetcher::new(chrome_executable)),
            local_fetcher: Arc::new(LocalFileFetcher::new()),
        }
    }

    /// Build a crawler with injected fetchers — used by tests to avoid any
    /// real network or browser dependency.
    pub fn with_fetchers(
        static_fetcher: Arc<dyn Fetcher>,
        browser_fetcher: Arc<dyn Fetcher>,
        local_fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            static_fetcher,
            browser_fetcher,
            local_fetcher,
        }
    }

    /// `BrowserFetcher` never inspects the committed navigation's redirect
    /// chain or HTTP status, and always reports `content_type: "text/html"`
    /// regardless of what was actually fetched — so both a disabled
    /// `follow_redirects` and a known JSON registry endpoint need to be
    /// routed to `StaticFetcher` here rather than relying on the browser path
    /// to honor either.
    fn fetcher_for(&self, url: &Url, options: &ScraperOptions) -> &Arc<dyn Fetcher> {
        if url.scheme() == "file" {
            return &self.local_fetcher;
        }
        if !options.follow_redirects || is_json_api_endpoint(url) {
            return &self.static_fetcher;
        }
        match options.scrape_mode.resolved() {
            ScrapeMode::Fetch => &self.static_fetcher,
            _ => &self.browser_fetcher,
        }
    }

    /// Runs the bounded BFS crawl described in spec.md §4.E. Returns every
    /// `Document` emitted across all pages, or a `CrawlError` if a redirect
    /// is observed with `follow_redirects=false` or a fatal page error
    /// occurs with `ignore_errors=false`.
    pub async fn crawl(
        &self,
        options: ScraperOptions,
        progress: ProgressFn,
    ) -> Result<Vec<Document>, CrawlError> {
        let start_url =
            Url::parse(&options.url).map_err(|e| CrawlError::InvalidUrl(format!("{}: {e}", options.url)))?;
        let strategy: Arc<dyn ScrapeStrategy> = Arc::from(select_strategy(&start_url));

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: Vec<(Url, usize)> = strategy
            .seed_urls(&start_url)
            .into_iter()
            .map(|u| (u, 0))
            .collect();
        let mut documents = Vec::new();
        let mut pages_scraped = 0usize;

        while !frontier.is_empty() && pages_scraped < options.max_pages && !options.cancellation.is_cancelled() {
            let remaining_budget = options.max_pages - pages_scraped;
            let mut round: Vec<(Url, usize)> = Vec::new();
            for (url, depth) in frontier.drain(..) {
                if round.len() >= remaining_budget {
                    break;
                }
                if visited.insert(url.to_string()) {
                    round.push((url, depth));
                }
            }
            if round.is_empty() {
                break;
            }

            let outcomes: Vec<Result<PageOutcome, CrawlTaskError>> = stream::iter(round)
                .map(|(url, depth)| {
                    let strategy = strategy.clone();
                    let options = options.clone();
                    let start_url = start_url.clone();
                    async move { self.process_one(url, depth, &start_url, strategy.as_ref(), &options).await }
                })
                .buffer_unordered(options.max_concurrency.max(1))
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    Ok(page) => {
                        pages_scraped += 1;
                        documents.extend(page.documents);
                        for (link, depth) in page.discovered {
                            if depth <= options.max_depth {
                                frontier.push((link, depth));
                            }
                        }
                        progress(CrawlProgress {
                            url: page.url,
                            depth: page.depth,
                            pages_scraped,
                            documents_emitted: documents.len(),
                            errors: page.errors,
                        });
                    }
                    Err(CrawlTaskError::Redirect(url)) => return Err(CrawlError::Redirect(url)),
                    Err(CrawlTaskError::Fatal(msg)) => return Err(CrawlError::Aborted(msg)),
                }
            }
        }

        Ok(documents)
    }

    async fn process_one(
        &self,
        url: Url,
        depth: usize,
        start_url: &Url,
        strategy: &dyn ScrapeStrategy,
        options: &ScraperOptions,
    ) -> Result<PageOutcome, CrawlTaskError> {
        let fetcher = self.fetcher_for(&url, options);
        let fetch_result = tokio::select! {
            r = fetcher.fetch(&url, options) => r,
            _ = options.cancellation.cancelled() => Err(FetchError::Browser("cancelled".to_string())),
        };

        let fetch_result = match fetch_result {
            Ok(r) => r,
            Err(FetchError::Redirect { url }) => return Err(CrawlTaskError::Redirect(url)),
            Err(e) => {
                if options.ignore_errors {
                    return Ok(PageOutcome {
                        url: url.to_string(),
                        depth,
                        documents: Vec::new(),
                        discovered: Vec::new(),
                        errors: vec![e.to_string()],
                    });
                }
                return Err(CrawlTaskError::Fatal(e.to_string()));
            }
        };

        let content = String::from_utf8_lossy(&fetch_result.bytes).to_string();
        let mut ctx = ProcessingContext::new(
            content,
            fetch_result.content_type,
            fetch_result.final_url,
            options.clone(),
        );
        let documents = default_html_chain().run(&mut ctx).await;

        let discovered: Vec<(Url, usize)> = ctx
            .links
            .iter()
            .filter(|link| strategy.in_scope(start_url, link, options.scope))
            .map(|link| (link.clone(), depth + 1))
            .collect();

        Ok(PageOutcome {
            url: url.to_string(),
            depth,
            documents,
            discovered,
            errors: ctx.errors,
        })
    }
}

/// Registry endpoints whose response is JSON metadata rather than a crawlable
/// page: npm's full registry document and PyPI's `.../json` project API.
fn is_json_api_endpoint(url: &Url) -> bool {
    matches!(url.host_str(), Some("registry.npmjs.org")) || url.path().ends_with("/json")
}

struct PageOutcome {
    url: String,
    depth: usize,
    documents: Vec<Document>,
    discovered: Vec<(Url, usize)>,
    errors: Vec<String>,
}

enum CrawlTaskError {
    Redirect(String),
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FetchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn is_json_api_endpoint_matches_npm_registry_and_pypi_json_paths() {
        let npm = Url::parse("https://registry.npmjs.org/left-pad").unwrap();
        let pypi = Url::parse("https://pypi.org/pypi/requests/json").unwrap();
        let html_page = Url::parse("https://pypi.org/project/requests/").unwrap();

        assert!(is_json_api_endpoint(&npm));
        assert!(is_json_api_endpoint(&pypi));
        assert!(!is_json_api_endpoint(&html_page));
    }

    struct MockFetcher {
        pages: std::collections::HashMap<String, (&'static str, Vec<&'static str>)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &Url, _options: &ScraperOptions) -> Result<FetchResult, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (html, _links) = self
                .pages
                .get(url.as_str())
                .ok_or_else(|| FetchError::Status { status: 404 })?;
            Ok(FetchResult {
                bytes: html.as_bytes().to_vec(),
                content_type: "text/html".to_string(),
                status: 200,
                final_url: url.clone(),
            })
        }
    }

    fn mock_crawler(pages: Vec<(&'static str, &'static str)>) -> Crawler {
        let map = pages.into_iter().map(|(u, h)| (u.to_string(), (h, vec![]))).collect();
        let fetcher: Arc<dyn Fetcher> = Arc::new(MockFetcher {
            pages: map,
            calls: AtomicUsize::new(0),
        });
        Crawler::with_fetchers(fetcher.clone(), fetcher.clone(), fetcher)
    }

    #[tokio::test]
    async fn respects_max_depth_and_max_pages() {
        let crawler = mock_crawler(vec![
            ("https://example.com/", r#"<html><body><a href="/a">a</a><a href="/b">b</a></body></html>"#),
            ("https://example.com/a", r#"<html><body><a href="/a/deep">deep</a></body></html>"#),
            ("https://example.com/b", r#"<html><body>leaf</body></html>"#),
            ("https://example.com/a/deep", r#"<html><body>too deep</body></html>"#),
        ]);

        let mut options = ScraperOptions::new("https://example.com/", "lib", "");
        options.max_depth = 1;
        options.max_pages = 10;

        let docs = crawler
            .crawl(options, Arc::new(|_| {}))
            .await
            .unwrap();

        // depth-1 pages (a, b) are fetched; the depth-2 page is discovered but never admitted.
        assert!(docs.iter().all(|d| d.content != "too deep"));
    }

    #[tokio::test]
    async fn stops_admitting_once_max_pages_reached() {
        let crawler = mock_crawler(vec![
            ("https://example.com/", r#"<html><body><a href="/a">a</a><a href="/b">b</a><a href="/c">c</a></body></html>"#),
            ("https://example.com/a", "<html><body>a</body></html>"),
            ("https://example.com/b", "<html><body>b</body></html>"),
            ("https://example.com/c", "<html><body>c</body></html>"),
        ]);

        let mut options = ScraperOptions::new("https://example.com/", "lib", "");
        options.max_pages = 2;
        options.max_depth = 5;

        let mut pages_seen = 0usize;
        let progress: ProgressFn = Arc::new(move |p: CrawlProgress| {
            assert!(p.pages_scraped <= 2);
            let _ = &mut pages_seen;
        });

        crawler.crawl(options, progress).await.unwrap();
    }
}
