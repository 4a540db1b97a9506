use scraper::Selector;

use super::collapse_whitespace;
use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

/// Sets `metadata["title"]`: the trimmed `<title>` text, else the trimmed
/// first `<h1>`, else `"Untitled"`. Internal whitespace is collapsed to
/// single spaces.
pub struct HtmlMetadataExtractor;

#[async_trait::async_trait]
impl Middleware for HtmlMetadataExtractor {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document> {
        if let Some(dom) = &ctx.dom {
            let title = first_match_text(dom, "title")
                .or_else(|| first_match_text(dom, "h1"))
                .unwrap_or_else(|| "Untitled".to_string());
            ctx.metadata.insert("title".to_string(), title);
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "HtmlMetadataExtractor"
    }
}

fn first_match_text(dom: &scraper::Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let el = dom.select(&selector).next()?;
    let text = collapse_whitespace(&el.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
