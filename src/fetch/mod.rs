//! Resolves a URL to `(bytes, content_type, status, final_url)` (spec.md §4.A).

mod browser_fetcher;
mod local_file;
mod static_fetcher;

pub use browser_fetcher::BrowserFetcher;
pub use local_file::LocalFileFetcher;
pub use static_fetcher::StaticFetcher;

use async_trait::async_trait;
use url::Url;

use crate::core::error::FetchError;
use crate::core::types::{FetchResult, ScraperOptions};

/// A strategy for turning a URL into bytes. `StaticFetcher` issues a plain
/// HTTP GET; `BrowserFetcher` renders the page in a headless browser first;
/// `LocalFileFetcher` reads directly from disk.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, options: &ScraperOptions) -> Result<FetchResult, FetchError>;
}

/// Builds a shared `reqwest::Client` used by every HTTP-backed fetcher.
/// 10s connect / 30s total timeout, mirroring the teacher's
/// `RustScraper::new_with_quality_mode` client construction. Redirects are
/// followed manually by `StaticFetcher` (not by the client) so that
/// `options.follow_redirects == false` can surface a `FetchError::Redirect`
/// instead of silently chasing the `Location` header.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build reqwest client")
}
