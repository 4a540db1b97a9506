use scraper::Html;

use crate::core::types::ProcessingContext;
use crate::pipeline::{Middleware, Next};

/// Parses `ctx.content` into `ctx.dom` when `content_type` is HTML.
/// `scraper::Html::parse_document` never fails outright (malformed markup is
/// tolerated the way a browser would tolerate it), so there is no error path
/// here in practice; the short-circuit branch exists for parity with the
/// other HTML stages' failure policy.
pub struct HtmlParser;

#[async_trait::async_trait]
impl Middleware for HtmlParser {
    async fn process(
        &self,
        ctx: &mut ProcessingContext,
        next: Next<'_>,
    ) -> Vec<crate::core::types::Document> {
        if ctx.is_html() {
            ctx.dom = Some(Html::parse_document(&ctx.content));
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "HtmlParser"
    }
}
