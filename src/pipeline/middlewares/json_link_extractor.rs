use serde_json::Value;

use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

/// Pulls crawl seeds out of a registry JSON response (npm's package
/// metadata, PyPI's `.../json` project API) instead of letting the raw JSON
/// fall through to the markdown/chunking stages as if it were prose. Runs
/// first in the chain and short-circuits on any JSON content type: the
/// registry response itself is metadata, never a stored document.
pub struct JsonLinkExtractor;

#[async_trait::async_trait]
impl Middleware for JsonLinkExtractor {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document> {
        if !ctx.content_type.to_ascii_lowercase().contains("json") {
            return next.run(ctx).await;
        }

        match serde_json::from_str::<Value>(&ctx.content) {
            Ok(value) => {
                let mut seen: std::collections::HashSet<String> =
                    ctx.links.iter().map(|u| u.to_string()).collect();
                for raw in candidate_urls(&value) {
                    let normalized = normalize_repo_url(&raw);
                    let Ok(resolved) = ctx.source.join(&normalized) else {
                        continue;
                    };
                    if !matches!(resolved.scheme(), "http" | "https") {
                        continue;
                    }
                    if seen.insert(resolved.to_string()) {
                        ctx.links.push(resolved);
                    }
                }
            }
            Err(e) => ctx.push_error("JsonLinkExtractor", format!("not valid JSON: {e}")),
        }

        Vec::new()
    }

    fn name(&self) -> &'static str {
        "JsonLinkExtractor"
    }
}

/// npm's `package.json`-shaped registry document carries `homepage` and
/// `repository` (string or `{url}` object); PyPI's JSON API nests
/// `home_page`, `docs_url`, and `project_urls` under `info`.
fn candidate_urls(value: &Value) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(homepage) = value.get("homepage").and_then(Value::as_str) {
        out.push(homepage.to_string());
    }
    match value.get("repository") {
        Some(Value::String(s)) => out.push(s.clone()),
        Some(Value::Object(repo)) => {
            if let Some(url) = repo.get("url").and_then(Value::as_str) {
                out.push(url.to_string());
            }
        }
        _ => {}
    }

    if let Some(info) = value.get("info") {
        if let Some(home_page) = info.get("home_page").and_then(Value::as_str) {
            out.push(home_page.to_string());
        }
        if let Some(docs_url) = info.get("docs_url").and_then(Value::as_str) {
            out.push(docs_url.to_string());
        }
        if let Some(Value::Object(project_urls)) = info.get("project_urls") {
            out.extend(project_urls.values().filter_map(Value::as_str).map(str::to_string));
        }
    }

    out
}

/// Strips npm's `git+` prefix and `.git` suffix and upgrades a bare `git://`
/// remote to `https://`, so a `repository.url` like
/// `git+https://github.com/owner/repo.git` resolves to a browsable page.
fn normalize_repo_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let no_prefix = trimmed.strip_prefix("git+").unwrap_or(trimmed);
    let no_suffix = no_prefix.strip_suffix(".git").unwrap_or(no_prefix);
    match no_suffix.strip_prefix("git://") {
        Some(rest) => format!("https://{rest}"),
        None => no_suffix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ScraperOptions;
    use crate::pipeline::Pipeline;
    use url::Url;

    async fn run(content: &str, content_type: &str) -> ProcessingContext {
        let options = ScraperOptions::new("https://registry.npmjs.org/left-pad", "left-pad", "");
        let source = Url::parse(&options.url.clone()).unwrap();
        let mut ctx = ProcessingContext::new(content.to_string(), content_type.to_string(), source, options);
        Pipeline::new(vec![Box::new(JsonLinkExtractor)]).run(&mut ctx).await;
        ctx
    }

    #[tokio::test]
    async fn extracts_and_normalizes_npm_repository_and_homepage() {
        let body = r#"{
            "homepage": "https://github.com/stdlib-js/left-pad#readme",
            "repository": {"type": "git", "url": "git+https://github.com/stdlib-js/left-pad.git"}
        }"#;
        let ctx = run(body, "application/json").await;
        let links: Vec<String> = ctx.links.iter().map(|u| u.to_string()).collect();
        assert!(links.contains(&"https://github.com/stdlib-js/left-pad#readme".to_string()));
        assert!(links.contains(&"https://github.com/stdlib-js/left-pad".to_string()));
    }

    #[tokio::test]
    async fn extracts_pypi_project_urls_and_docs_url() {
        let body = r#"{
            "info": {
                "home_page": "https://requests.readthedocs.io",
                "docs_url": null,
                "project_urls": {"Documentation": "https://requests.readthedocs.io/en/latest/"}
            }
        }"#;
        let ctx = run(body, "application/json; charset=utf-8").await;
        let links: Vec<String> = ctx.links.iter().map(|u| u.to_string()).collect();
        assert!(links.contains(&"https://requests.readthedocs.io/".to_string()));
        assert!(links.contains(&"https://requests.readthedocs.io/en/latest/".to_string()));
    }

    #[tokio::test]
    async fn non_json_content_passes_through_untouched() {
        let ctx = run("<html></html>", "text/html").await;
        assert!(ctx.links.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_reported_as_a_non_fatal_error() {
        let ctx = run("not json", "application/json").await;
        assert!(ctx.links.is_empty());
        assert!(ctx.errors.iter().any(|e| e.contains("JsonLinkExtractor")));
    }
}
