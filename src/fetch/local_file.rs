use async_trait::async_trait;
use url::Url;
use walkdir::WalkDir;

use super::Fetcher;
use crate::core::error::FetchError;
use crate::core::types::{FetchResult, ScraperOptions};

/// Reads `file://` URLs directly from disk; MIME is inferred from extension.
/// A directory is not read as bytes — it is rendered as a synthetic HTML
/// listing of its immediate children, each as an `<a href="file://...">`,
/// so the ordinary BFS/link-discovery machinery in `Crawler` walks the tree
/// one directory level per round instead of needing its own traversal loop.
#[derive(Default)]
pub struct LocalFileFetcher;

impl LocalFileFetcher {
    pub fn new() -> Self {
        Self
    }
}

fn mime_for_extension(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html") | Some("htm") => "text/html",
        Some("md") | Some("markdown") => "text/markdown",
        _ => "text/plain",
    }
}

fn directory_listing_html(path: &std::path::Path) -> Result<String, FetchError> {
    let mut entries: Vec<std::path::PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .collect();
    entries.sort();

    let mut html = String::from("<html><body>\n");
    for entry in entries {
        let Ok(url) = Url::from_file_path(&entry) else {
            continue;
        };
        let name = entry.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        html.push_str(&format!("<a href=\"{url}\">{name}</a>\n"));
    }
    html.push_str("</body></html>");
    Ok(html)
}

#[async_trait]
impl Fetcher for LocalFileFetcher {
    async fn fetch(&self, url: &Url, _options: &ScraperOptions) -> Result<FetchResult, FetchError> {
        if url.scheme() != "file" {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::UnsupportedScheme(format!("not a valid file path: {url}")))?;

        if path.is_dir() {
            let html = directory_listing_html(&path)?;
            return Ok(FetchResult {
                bytes: html.into_bytes(),
                content_type: "text/html".to_string(),
                status: 200,
                final_url: url.clone(),
            });
        }

        let content_type = mime_for_extension(&path).to_string();
        let bytes = tokio::fs::read(&path).await?;

        Ok(FetchResult {
            bytes,
            content_type,
            status: 200,
            final_url: url.clone(),
        })
    }
}
