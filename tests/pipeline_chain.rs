//! Black-box tests of the default HTML pipeline chain, exercised through
//! the crate's public API rather than any single middleware's internals.

use doctrove::{default_html_chain, Document, ProcessingContext, ScraperOptions};
use url::Url;

async fn run_html(html: &str, options: ScraperOptions) -> (Vec<Document>, Vec<String>) {
    let source = Url::parse(&options.url.clone()).unwrap();
    let mut ctx = ProcessingContext::new(html.to_string(), "text/html".to_string(), source, options);
    let chain = default_html_chain();
    let docs = chain.run(&mut ctx).await;
    (docs, ctx.errors)
}

#[tokio::test]
async fn exclude_selectors_drop_matched_subtrees_before_markdown_conversion() {
    let html = r#"
        <html><body>
            <h1>Title</h1>
            <nav class="sidebar"><a href="/x">nav link</a></nav>
            <p>Keep this paragraph.</p>
        </body></html>
    "#;
    let mut options = ScraperOptions::new("https://example.com/docs", "lib", "");
    options.exclude_selectors = vec!["nav.sidebar".to_string()];
    let (docs, errors) = run_html(html, options).await;

    assert!(errors.is_empty());
    let joined: String = docs.iter().map(|d| d.content.clone()).collect::<Vec<_>>().join("\n");
    assert!(joined.contains("Keep this paragraph."));
    assert!(!joined.contains("nav link"));
}

#[tokio::test]
async fn exclude_selectors_does_not_let_prose_angle_brackets_corrupt_the_rest_of_the_page() {
    let html = r#"
        <html><body>
            <nav class="sidebar"><a href="/x">nav link</a></nav>
            <p>Use the &lt;div&gt; element, written as <div> in prose.</p>
            <p>This paragraph must survive intact.</p>
        </body></html>
    "#;
    let mut options = ScraperOptions::new("https://example.com/docs", "lib", "");
    options.exclude_selectors = vec!["nav.sidebar".to_string()];
    let (docs, errors) = run_html(html, options).await;

    assert!(errors.is_empty());
    let joined: String = docs.iter().map(|d| d.content.clone()).collect::<Vec<_>>().join("\n");
    assert!(joined.contains("This paragraph must survive intact."));
    assert!(!joined.contains("nav link"));
}

#[tokio::test]
async fn title_is_collapsed_to_single_whitespace_and_trimmed() {
    let html = "<html><head><title>  My \n  Docs   Title  </title></head><body><p>hello</p></body></html>";
    let options = ScraperOptions::new("https://example.com/docs", "lib", "");
    let (docs, _errors) = run_html(html, options).await;

    assert!(!docs.is_empty());
    let title = docs[0]
        .metadata
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert_eq!(title, "My Docs Title");
}

#[tokio::test]
async fn code_fence_language_is_inferred_from_the_highlight_class() {
    let html = r#"
        <html><body>
            <pre class="highlight-source-rust"><code>fn main() {}</code></pre>
        </body></html>
    "#;
    let options = ScraperOptions::new("https://example.com/docs", "lib", "");
    let (docs, _errors) = run_html(html, options).await;

    let joined: String = docs.iter().map(|d| d.content.clone()).collect::<Vec<_>>().join("\n");
    assert!(joined.contains("```rust"));
    assert!(joined.contains("fn main() {}"));
}

#[tokio::test]
async fn empty_body_produces_no_documents_and_no_errors() {
    let html = "<html><head><title>Empty</title></head><body>   </body></html>";
    let options = ScraperOptions::new("https://example.com/docs", "lib", "");
    let (docs, errors) = run_html(html, options).await;

    assert!(docs.is_empty());
    assert!(errors.is_empty());
}

#[tokio::test]
async fn headings_become_chunk_paths() {
    let html = r#"
        <html><body>
            <h1>Guide</h1>
            <h2>Installation</h2>
            <p>Run the installer and follow the prompts to finish setup properly.</p>
        </body></html>
    "#;
    let options = ScraperOptions::new("https://example.com/docs", "lib", "");
    let (docs, _errors) = run_html(html, options).await;

    assert_eq!(docs.len(), 1);
    let path = docs[0]
        .metadata
        .get("path")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let path: Vec<String> = path
        .into_iter()
        .map(|v| v.as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(path, vec!["Guide".to_string(), "Installation".to_string()]);
}

#[tokio::test]
async fn every_chunk_carries_the_source_url_and_library() {
    let html = "<html><body><h1>T</h1><p>content here</p></body></html>";
    let options = ScraperOptions::new("https://example.com/docs/page", "MyLib", "2.0");
    let (docs, _errors) = run_html(html, options).await;

    assert!(!docs.is_empty());
    for doc in &docs {
        assert_eq!(doc.url, "https://example.com/docs/page");
        assert_eq!(doc.library, "mylib");
        assert_eq!(doc.version, "2.0");
        assert!(doc.embedding.is_empty());
    }
}
