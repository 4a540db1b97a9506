pub mod config;
pub mod error;
pub mod types;

pub use config::DoctroveConfig;
pub use error::{CrawlError, DoctroveError, EmbedError, FetchError, StoreError};
pub use types::{
    CrawlProgress, Document, FetchResult, ProcessingContext, Scope, ScoredDocument, ScrapeMode,
    ScraperOptions,
};

/// Current time as an RFC 3339 string, used for `documents.added_at`.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}
