//! Black-box tests of `Store` through its public API: an in-memory-deterministic
//! `Embed` implementation and a tempfile-backed SQLite path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use doctrove::core::error::EmbedError;
use doctrove::{Document, Embed, Store};

/// Embeds a short piece of text into a single-hot vector keyed by its first
/// word, so documents sharing a leading word are deterministically close in
/// cosine-similarity space while remaining distinguishable from the rest.
struct KeywordEmbedder {
    dim: usize,
}

#[async_trait]
impl Embed for KeywordEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vector_for(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn native_dimension(&self) -> usize {
        self.dim
    }
}

impl KeywordEmbedder {
    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let word = text.split_whitespace().next().unwrap_or("");
        let slot = word.bytes().fold(0usize, |acc, b| acc.wrapping_add(b as usize)) % self.dim;
        v[slot] = 1.0;
        v
    }
}

fn doc(library: &str, url: &str, content: &str) -> Document {
    Document {
        library: library.to_string(),
        version: "1.0".to_string(),
        url: url.to_string(),
        content: content.to_string(),
        metadata: HashMap::new(),
        embedding: Vec::new(),
    }
}

async fn new_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let embedder: Arc<dyn Embed> = Arc::new(KeywordEmbedder { dim: 16 });
    let store = Store::initialize(&path, embedder, 16).await.unwrap();
    (dir, store)
}

#[tokio::test]
async fn add_then_find_scopes_results_to_library_and_version() {
    let (_dir, store) = new_store().await;
    let docs = vec![
        doc("rustdocs", "https://example.com/a", "rocket web framework basics"),
        doc("rustdocs", "https://example.com/b", "axum web framework routing"),
    ];
    store.add_documents("rustdocs", "1.0", &docs).await.unwrap();

    let results = store.find_by_content("rustdocs", "1.0", "rocket framework", 10).await.unwrap();
    assert!(!results.is_empty());
    for r in &results {
        assert_eq!(r.document.library, "rustdocs");
        assert_eq!(r.document.version, "1.0");
    }

    let other_version = store.find_by_content("rustdocs", "2.0", "rocket framework", 10).await.unwrap();
    assert!(other_version.is_empty());
}

#[tokio::test]
async fn find_by_content_has_no_duplicate_ids() {
    let (_dir, store) = new_store().await;
    let docs = vec![doc("lib", "https://example.com/a", "rocket rocket rocket framework")];
    store.add_documents("lib", "1.0", &docs).await.unwrap();

    let results = store.find_by_content("lib", "1.0", "rocket", 10).await.unwrap();
    let mut ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    let before = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

#[tokio::test]
async fn remove_documents_cascades_so_removed_rows_never_resurface() {
    let (_dir, store) = new_store().await;
    let docs = vec![doc("lib", "https://example.com/keep-me-safe", "rocket framework docs")];
    store.add_documents("lib", "1.0", &docs).await.unwrap();

    let removed = store.remove_documents("lib", "1.0", None).await.unwrap();
    assert_eq!(removed, 1);

    let results = store.find_by_content("lib", "1.0", "rocket", 10).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn check_exists_and_list_versions_reflect_stored_documents() {
    let (_dir, store) = new_store().await;
    assert!(!store.check_exists("lib", "1.0").await.unwrap());

    let docs = vec![doc("lib", "https://example.com/a", "rocket framework docs")];
    store.add_documents("lib", "1.0", &docs).await.unwrap();

    assert!(store.check_exists("lib", "1.0").await.unwrap());
    let versions = store.list_versions("lib").await.unwrap();
    assert_eq!(versions, vec!["1.0".to_string()]);
}
