use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{build_http_client, Fetcher};
use crate::core::error::FetchError;
use crate::core::types::{FetchResult, ScraperOptions};

const MAX_REDIRECTS: usize = 10;

/// Issues a plain HTTP GET. Redirects are followed manually (see
/// `build_http_client`) so `follow_redirects = false` can raise
/// `FetchError::Redirect` on the first 3xx rather than the client silently
/// chasing `Location` on our behalf.
pub struct StaticFetcher {
    client: reqwest::Client,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url, options: &ScraperOptions) -> Result<FetchResult, FetchError> {
        let mut current = url.clone();

        for _ in 0..=MAX_REDIRECTS {
            debug!(url = %current, "static fetch");
            let resp = self.client.get(current.clone()).send().await?;
            let status = resp.status();

            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| FetchError::Browser("redirect with no Location header".to_string()))?;
                let next = current
                    .join(location)
                    .map_err(|e| FetchError::Browser(format!("invalid redirect location: {e}")))?;

                if !options.follow_redirects {
                    return Err(FetchError::Redirect { url: next.to_string() });
                }
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status { status: status.as_u16() });
            }

            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let final_url = resp.url().clone();
            let bytes = resp.bytes().await?.to_vec();

            return Ok(FetchResult {
                bytes,
                content_type,
                status: status.as_u16(),
                final_url,
            });
        }

        Err(FetchError::Browser("too many redirects".to_string()))
    }
}
