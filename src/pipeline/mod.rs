//! The content processing pipeline: an ordered chain of middlewares that
//! turns fetched bytes into normalized, chunked `Document`s (spec.md §4.B).
//!
//! Grounded in the teacher's `lib.rs` re-export shape and the REDESIGN FLAGS
//! note on mapping the middleware chain to a vector of trait objects with a
//! `next` continuation. `Next` wraps the remaining stage slice rather than a
//! literal closure, so recursion depth is bounded by the chain length and
//! each stage decides, by calling `next.run(ctx)` or not, whether to
//! continue or short-circuit.

pub mod middlewares;

use futures::future::BoxFuture;

use crate::core::types::{Document, ProcessingContext};

/// A single stage in the content pipeline.
///
/// Implementations inspect/mutate `ctx`, then call `next.run(ctx)` to yield
/// control downstream, or return without calling it to short-circuit (used
/// on an unrecoverable parse failure for the current item). Only the
/// terminal `Chunker` stage is expected to return a non-empty `Vec<Document>`;
/// every other stage should return whatever `next.run(ctx)` produced.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document>;

    /// Stage name used in `ctx.push_error` messages.
    fn name(&self) -> &'static str;
}

/// The remaining suffix of the middleware chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Box<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn run(self, ctx: &mut ProcessingContext) -> BoxFuture<'_, Vec<Document>> {
        Box::pin(async move {
            match self.stages.split_first() {
                None => Vec::new(),
                Some((stage, rest)) => stage.process(ctx, Next { stages: rest }).await,
            }
        })
    }
}

/// An ordered list of middlewares. `default_html_chain` builds the standard
/// composition named in spec.md §4.B; callers may assemble a custom chain
/// (e.g. for non-HTML sources that skip the HTML-aware stages entirely).
pub struct Pipeline {
    stages: Vec<Box<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Middleware>>) -> Self {
        Self { stages }
    }

    pub async fn run(&self, ctx: &mut ProcessingContext) -> Vec<Document> {
        Next { stages: &self.stages }.run(ctx).await
    }
}

/// `JsonLinkExtractor → HtmlParser → HtmlSanitizer → HtmlMetadataExtractor →
/// HtmlLinkExtractor → HtmlToMarkdown → MarkdownMetadataExtractor →
/// MarkdownLinkExtractor → Chunker`. `JsonLinkExtractor` short-circuits on
/// any JSON content type (registry API responses), so nothing after it runs
/// for those pages. For non-HTML, non-JSON input the HTML-aware stages no-op
/// on their precondition check and the chain degrades to metadata + link
/// extraction over plain text followed by chunking.
pub fn default_html_chain() -> Pipeline {
    Pipeline::new(vec![
        Box::new(middlewares::JsonLinkExtractor),
        Box::new(middlewares::HtmlParser),
        Box::new(middlewares::HtmlSanitizer),
        Box::new(middlewares::HtmlMetadataExtractor),
        Box::new(middlewares::HtmlLinkExtractor),
        Box::new(middlewares::HtmlToMarkdown),
        Box::new(middlewares::MarkdownMetadataExtractor),
        Box::new(middlewares::MarkdownLinkExtractor),
        Box::new(middlewares::Chunker::default()),
    ])
}
