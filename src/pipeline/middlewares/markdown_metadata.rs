use std::sync::OnceLock;

use regex::Regex;

use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#\s+(.*)$").unwrap())
}

/// If `content_type` is Markdown or plain text and no prior stage set
/// `metadata["title"]`, parses the first line matching `^#\s+(.*)$` as the
/// title; otherwise falls back to `"Untitled"`. Never overwrites a title an
/// earlier stage (e.g. `HtmlMetadataExtractor`) already set.
pub struct MarkdownMetadataExtractor;

#[async_trait::async_trait]
impl Middleware for MarkdownMetadataExtractor {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document> {
        let applies = matches!(ctx.content_type.as_str(), "text/markdown" | "text/plain");
        if applies && !ctx.metadata.contains_key("title") {
            let title = title_re()
                .captures(&ctx.content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());
            ctx.metadata.insert("title".to_string(), title);
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "MarkdownMetadataExtractor"
    }
}
