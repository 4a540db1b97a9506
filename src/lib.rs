pub mod core;
pub mod crawler;
pub mod embed;
pub mod fetch;
pub mod pipeline;
pub mod store;
pub mod strategy;

pub use core::types;
pub use core::types::*;
pub use core::DoctroveConfig;
pub use crawler::Crawler;
pub use embed::{Embed, EmbedProvider, FixedDimensionEmbeddings, Model2VecEmbedder};
pub use fetch::{BrowserFetcher, Fetcher, LocalFileFetcher, StaticFetcher};
pub use pipeline::{default_html_chain, Middleware, Pipeline};
pub use store::Store;
pub use strategy::{select_strategy, ScrapeStrategy};
