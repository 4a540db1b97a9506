//! Black-box tests of `Crawler::crawl` through the public API, using a
//! mock `Fetcher` so no real network or browser dependency is needed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use doctrove::core::FetchError;
use doctrove::{Crawler, CrawlProgress, FetchResult, Fetcher, ScraperOptions};
use url::Url;

struct MockFetcher {
    pages: HashMap<String, &'static str>,
    redirect_from: Option<(&'static str, &'static str)>,
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url, _options: &ScraperOptions) -> Result<FetchResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((from, to)) = self.redirect_from {
            if url.as_str() == from {
                return Err(FetchError::Redirect { url: to.to_string() });
            }
        }
        let html = self
            .pages
            .get(url.as_str())
            .ok_or(FetchError::Status { status: 404 })?;
        Ok(FetchResult {
            bytes: html.as_bytes().to_vec(),
            content_type: "text/html".to_string(),
            status: 200,
            final_url: url.clone(),
        })
    }
}

fn mock_crawler(pages: Vec<(&'static str, &'static str)>, redirect_from: Option<(&'static str, &'static str)>) -> Crawler {
    let map = pages.into_iter().map(|(u, h)| (u.to_string(), h)).collect();
    let fetcher: Arc<dyn Fetcher> = Arc::new(MockFetcher {
        pages: map,
        redirect_from,
        calls: AtomicUsize::new(0),
    });
    Crawler::with_fetchers(fetcher.clone(), fetcher.clone(), fetcher)
}

#[tokio::test]
async fn redirect_with_follow_redirects_disabled_aborts_the_crawl() {
    let crawler = mock_crawler(
        vec![("https://example.com/old", "<html><body>new</body></html>")],
        Some(("https://example.com/", "https://example.com/old")),
    );

    let mut options = ScraperOptions::new("https://example.com/", "lib", "");
    options.follow_redirects = false;

    let err = crawler.crawl(options, Arc::new(|_: CrawlProgress| {})).await.unwrap_err();
    assert!(err.to_string().to_lowercase().contains("redirect"));
}

/// Distinguishes the three fetcher roles (the earlier redirect test injects
/// the same mock into all three, which would pass even if routing were
/// broken) to prove `follow_redirects=false` is actually routed to the
/// static fetcher rather than depending on a browser fetcher that can't
/// honor it.
#[tokio::test]
async fn follow_redirects_false_is_routed_to_the_static_fetcher_not_the_browser_fetcher() {
    let static_fetcher: Arc<dyn Fetcher> = Arc::new(MockFetcher {
        pages: HashMap::from([("https://example.com/".to_string(), "<html><body>static</body></html>")]),
        redirect_from: None,
        calls: AtomicUsize::new(0),
    });
    struct AlwaysFailsFetcher;
    #[async_trait]
    impl Fetcher for AlwaysFailsFetcher {
        async fn fetch(&self, _url: &Url, _options: &ScraperOptions) -> Result<FetchResult, FetchError> {
            panic!("browser fetcher must not be used when follow_redirects is false");
        }
    }
    let browser_fetcher: Arc<dyn Fetcher> = Arc::new(AlwaysFailsFetcher);
    let local_fetcher: Arc<dyn Fetcher> = Arc::new(AlwaysFailsFetcher);
    let crawler = Crawler::with_fetchers(static_fetcher, browser_fetcher, local_fetcher);

    let mut options = ScraperOptions::new("https://example.com/", "lib", "");
    options.follow_redirects = false;

    let docs = crawler.crawl(options, Arc::new(|_: CrawlProgress| {})).await.unwrap();
    assert!(docs.iter().any(|d| d.content.contains("static")));
}

#[tokio::test]
async fn fatal_page_error_aborts_when_ignore_errors_is_false() {
    let crawler = mock_crawler(vec![], None);
    let mut options = ScraperOptions::new("https://example.com/missing", "lib", "");
    options.ignore_errors = false;

    let result = crawler.crawl(options, Arc::new(|_: CrawlProgress| {})).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn page_error_is_recorded_not_fatal_when_ignore_errors_is_true() {
    let crawler = mock_crawler(vec![], None);
    let options = ScraperOptions::new("https://example.com/missing", "lib", "");

    let docs = crawler.crawl(options, Arc::new(|_: CrawlProgress| {})).await.unwrap();
    assert!(docs.is_empty());
}
