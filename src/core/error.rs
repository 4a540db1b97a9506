//! Typed error taxonomy for the crate (see SPEC_FULL.md §7).
//!
//! Per-page pipeline errors are plain `String`s pushed onto
//! [`crate::core::types::ProcessingContext::errors`] — they never cross the
//! pipeline boundary as typed errors. Everything below is for orchestrator-
//! and store-level failures that do propagate via `Result`.

use thiserror::Error;

/// Errors raised while resolving a URL to bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("non-2xx response: {status}")]
    Status { status: u16 },

    #[error("headless browser error: {0}")]
    Browser(String),

    #[error("redirect to {url} observed with follow_redirects=false")]
    Redirect { url: String },

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported URL scheme for this fetcher: {0}")]
    UnsupportedScheme(String),
}

/// Errors raised by the crawl orchestrator that are not per-page recoverable
/// errors (those live in `ProcessingContext.errors` instead).
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("redirect to {0} observed with follow_redirects=false")]
    Redirect(String),

    #[error("crawl aborted: {0}")]
    Aborted(String),

    #[error("invalid start URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised by an `Embed` implementation or its dimension wrapper.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding dimension {got} exceeds target {expected} and no truncation is supported")]
    Dimension { expected: usize, got: usize },

    #[error("unsupported embedding provider: {0}")]
    UnsupportedProvider(String),

    #[error("embedding model misconfigured: {0}")]
    ModelConfiguration(String),

    #[error("embedding provider error: {0}")]
    Inner(String),
}

/// Errors raised by the [`crate::store::Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored vector dimension {stored} does not match configured dimension {expected}")]
    DimensionMismatch { expected: usize, stored: usize },

    #[error("document not found: {id}")]
    NotFound { id: i64 },

    #[error("store connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

/// Top-level error used at CLI/library-boundary call sites that can fail for
/// any of the above reasons.
#[derive(Debug, Error)]
pub enum DoctroveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
