use scraper::Selector;

use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

/// Collects every `<a href>` resolved against `ctx.source`, filters to
/// http(s) and `file` (the latter so `LocalFileStrategy`'s synthetic
/// directory listings can enqueue their entries), and deduplicates into
/// `ctx.links`.
pub struct HtmlLinkExtractor;

#[async_trait::async_trait]
impl Middleware for HtmlLinkExtractor {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document> {
        if let Some(dom) = &ctx.dom {
            let Ok(selector) = Selector::parse("a[href]") else {
                return next.run(ctx).await;
            };
            let mut seen: std::collections::HashSet<String> =
                ctx.links.iter().map(|u| u.to_string()).collect();

            for el in dom.select(&selector) {
                let Some(href) = el.value().attr("href") else {
                    continue;
                };
                let Ok(resolved) = ctx.source.join(href) else {
                    continue;
                };
                if !matches!(resolved.scheme(), "http" | "https" | "file") {
                    continue;
                }
                if seen.insert(resolved.to_string()) {
                    ctx.links.push(resolved);
                }
            }
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "HtmlLinkExtractor"
    }
}
