//! The hybrid retrieval store (spec.md §4.G): a single SQLite file combining
//! a full-text index and a brute-force vector scan over the same row set,
//! fused with Reciprocal Rank Fusion.
//!
//! Grounded in `danielchristiancazares-forge/context`'s `sqlite_util`
//! connection-opening pattern, generalized from a one-off secure-file
//! helper into a long-lived, mutex-serialized single-writer connection
//! (spec.md §5: "Store: single writer (SQLite); readers may run
//! concurrently with WAL mode enabled"). `documents_vec` is a plain BLOB
//! table rather than a vector virtual-table extension — see DESIGN.md for
//! why no such crate is pulled in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::core::error::StoreError;
use crate::core::types::{Document, ScoredDocument};
use crate::embed::Embed;

const RRF_K: f64 = 60.0;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS _meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    library TEXT NOT NULL,
    version TEXT NOT NULL,
    url TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata_json TEXT NOT NULL,
    added_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_library_version ON documents(library, version);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(content);

CREATE TABLE IF NOT EXISTS documents_vec (
    id INTEGER PRIMARY KEY,
    embedding BLOB NOT NULL
);
"#;

pub struct Store {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn Embed>,
    vector_dimension: usize,
}

impl Store {
    /// Opens (creating if absent) the SQLite file at `path`, ensures the
    /// schema, and probes the `_meta` table for a previously recorded
    /// `vector_dimension`. A mismatch against `embedder`'s dimension is a
    /// fatal `DimensionMismatch` rather than silent corruption of the vector
    /// index.
    pub async fn initialize(
        path: &Path,
        embedder: Arc<dyn Embed>,
        vector_dimension: usize,
    ) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        let owned_path: PathBuf = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, rusqlite::Error> {
            let conn = Connection::open(&owned_path)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))??;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            vector_dimension,
        };
        store.ensure_meta_dimension().await?;
        Ok(store)
    }

    async fn ensure_meta_dimension(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let target = self.vector_dimension;
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            let stored: Option<String> = conn
                .query_row("SELECT value FROM _meta WHERE key = 'vector_dimension'", [], |row| {
                    row.get(0)
                })
                .optional()?;
            match stored.and_then(|s| s.parse::<usize>().ok()) {
                Some(stored) if stored != target => Err(StoreError::DimensionMismatch {
                    expected: target,
                    stored,
                }),
                Some(_) => Ok(()),
                None => {
                    conn.execute(
                        "INSERT INTO _meta(key, value) VALUES ('vector_dimension', ?1)",
                        params![target.to_string()],
                    )?;
                    conn.execute(
                        "INSERT OR IGNORE INTO _meta(key, value) VALUES ('schema_version', '1')",
                        [],
                    )?;
                    Ok(())
                }
            }
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?
    }

    /// Embeds every document's content (overwriting any pre-populated
    /// `embedding` field, since only the store's own embedder can produce a
    /// vector consistent with the stored dimension) and inserts into
    /// `documents`, `documents_fts`, and `documents_vec` in one transaction.
    pub async fn add_documents(
        &self,
        library: &str,
        version: &str,
        docs: &[Document],
    ) -> Result<(), StoreError> {
        if docs.is_empty() {
            return Ok(());
        }
        let library = library.to_lowercase();
        let version = version.to_lowercase();

        let contents: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&contents).await?;

        let conn = self.conn.clone();
        let docs = docs.to_vec();
        let now = crate::core::now_iso8601();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            for (doc, embedding) in docs.iter().zip(embeddings.iter()) {
                let metadata_json = serde_json::to_string(&doc.metadata)
                    .map_err(|e| StoreError::Connection(format!("metadata serialization failed: {e}")))?;
                tx.execute(
                    "INSERT INTO documents (library, version, url, content, metadata_json, added_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![library, version, doc.url, doc.content, metadata_json, now],
                )?;
                let id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO documents_fts(rowid, content) VALUES (?1, ?2)",
                    params![id, doc.content],
                )?;
                tx.execute(
                    "INSERT INTO documents_vec(id, embedding) VALUES (?1, ?2)",
                    params![id, vector_to_blob(embedding)],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?
    }

    /// Cascading delete across all three tables, scoped to `(library,
    /// version)` and optionally further narrowed to URLs starting with
    /// `url_prefix`.
    pub async fn remove_documents(
        &self,
        library: &str,
        version: &str,
        url_prefix: Option<&str>,
    ) -> Result<usize, StoreError> {
        let library = library.to_lowercase();
        let version = version.to_lowercase();
        let url_prefix = url_prefix.map(|s| s.to_string());
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<usize, StoreError> {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let ids: Vec<i64> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM documents WHERE library = ?1 AND version = ?2
                     AND (?3 IS NULL OR url LIKE ?3 || '%')",
                )?;
                let rows = stmt.query_map(params![library, version, url_prefix], |row| row.get(0))?;
                rows.collect::<Result<Vec<i64>, _>>()?
            };
            for id in &ids {
                tx.execute("DELETE FROM documents_vec WHERE id = ?1", params![id])?;
                tx.execute("DELETE FROM documents_fts WHERE rowid = ?1", params![id])?;
                tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(ids.len())
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?
    }

    /// Hybrid search (spec.md §4.G): fuses a vector candidate set (cosine
    /// similarity over `documents_vec`) and an FTS candidate set
    /// (`documents_fts MATCH`) with Reciprocal Rank Fusion. Results are
    /// strictly scoped to `(library, version)`, contain no duplicate `id`,
    /// and are ordered by fused score with ties broken by ascending `id`.
    pub async fn find_by_content(
        &self,
        library: &str,
        version: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let library = library.to_lowercase();
        let version = version.to_lowercase();
        let query_vec = self.embedder.embed_query(query).await?;
        let fts_query = escape_fts_query(query);

        let conn = self.conn.clone();
        let library_sql = library.clone();
        let version_sql = version.clone();
        let ranked: (Vec<i64>, Vec<i64>) = tokio::task::spawn_blocking(move || -> Result<_, StoreError> {
            let conn = conn.blocking_lock();
            let vector_ranked = vector_candidates(&conn, &library_sql, &version_sql, &query_vec, limit)?;
            let fts_ranked = fts_candidates(&conn, &library_sql, &version_sql, &fts_query, limit)?;
            Ok((vector_ranked, fts_ranked))
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))??;

        let (vector_ranked, fts_ranked) = ranked;
        let mut scores: HashMap<i64, f64> = HashMap::new();
        for (rank, id) in vector_ranked.iter().enumerate() {
            *scores.entry(*id).or_insert(0.0) += 1.0 / (RRF_K + (rank + 1) as f64);
        }
        for (rank, id) in fts_ranked.iter().enumerate() {
            *scores.entry(*id).or_insert(0.0) += 1.0 / (RRF_K + (rank + 1) as f64);
        }

        let mut fused: Vec<(i64, f64)> = scores.into_iter().collect();
        fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        fused.truncate(limit);

        let mut results = Vec::with_capacity(fused.len());
        for (id, score) in fused {
            if let Some(document) = self.get_by_id(id).await.ok() {
                results.push(ScoredDocument { id, document, score });
            }
        }
        Ok(results)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Document, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Document, StoreError> {
            let conn = conn.blocking_lock();
            let row = conn
                .query_row(
                    "SELECT library, version, url, content, metadata_json FROM documents WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?
                .ok_or(StoreError::NotFound { id })?;

            let embedding: Option<Vec<u8>> = conn
                .query_row("SELECT embedding FROM documents_vec WHERE id = ?1", params![id], |row| row.get(0))
                .optional()?;

            let (library, version, url, content, metadata_json) = row;
            let metadata: HashMap<String, Value> =
                serde_json::from_str(&metadata_json).unwrap_or_default();

            Ok(Document {
                library,
                version,
                url,
                content,
                metadata,
                embedding: embedding.map(|b| blob_to_vector(&b)).unwrap_or_default(),
            })
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?
    }

    pub async fn check_exists(&self, library: &str, version: &str) -> Result<bool, StoreError> {
        let library = library.to_lowercase();
        let version = version.to_lowercase();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let conn = conn.blocking_lock();
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE library = ?1 AND version = ?2",
                params![library, version],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?
    }

    pub async fn list_versions(&self, library: &str) -> Result<Vec<String>, StoreError> {
        let library = library.to_lowercase();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare("SELECT DISTINCT version FROM documents WHERE library = ?1 ORDER BY version")?;
            let rows = stmt.query_map(params![library], |row| row.get(0))?;
            Ok(rows.collect::<Result<Vec<String>, _>>()?)
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?
    }
}

/// Wraps the entire user string in double quotes and doubles every embedded
/// double quote, turning any input into a single FTS5 phrase query and
/// defeating operators like `AND`/`OR`/`NEAR`/`*`/`()`. Empty input becomes
/// `""`.
fn escape_fts_query(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

fn vector_candidates(
    conn: &Connection,
    library: &str,
    version: &str,
    query_vec: &[f32],
    limit: usize,
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT documents_vec.id, documents_vec.embedding FROM documents_vec
         JOIN documents ON documents.id = documents_vec.id
         WHERE documents.library = ?1 AND documents.version = ?2",
    )?;
    let rows = stmt.query_map(params![library, version], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;

    let mut scored: Vec<(i64, f64)> = Vec::new();
    for row in rows {
        let (id, blob) = row?;
        let vec = blob_to_vector(&blob);
        scored.push((id, cosine_similarity(query_vec, &vec)));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    scored.truncate(limit);
    Ok(scored.into_iter().map(|(id, _)| id).collect())
}

fn fts_candidates(
    conn: &Connection,
    library: &str,
    version: &str,
    fts_query: &str,
    limit: usize,
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT documents.id FROM documents_fts
         JOIN documents ON documents.id = documents_fts.rowid
         WHERE documents.library = ?1 AND documents.version = ?2 AND documents_fts MATCH ?3
         ORDER BY rank
         LIMIT ?4",
    )?;
    let rows = stmt.query_map(params![library, version, fts_query, limit as i64], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<i64>, _>>()?)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn vector_to_blob(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for f in v {
        out.extend_from_slice(&f.to_le_bytes());
    }
    out
}

fn blob_to_vector(b: &[u8]) -> Vec<f32> {
    b.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EmbedError;
    use async_trait::async_trait;

    struct HashEmbedder {
        dim: usize,
    }

    /// Deterministic, content-sensitive "embedding" for tests: each
    /// dimension is a hash of (word, dimension index), so semantically
    /// identical text embeds identically without needing a real model.
    #[async_trait]
    impl Embed for HashEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.embed_documents(&[text.to_string()]).await.map(|mut v| v.remove(0))
        }
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; self.dim];
                    for word in t.split_whitespace() {
                        let mut h: u64 = 1469598103934665603;
                        for b in word.bytes() {
                            h ^= b as u64;
                            h = h.wrapping_mul(1099511628211);
                        }
                        v[(h as usize) % self.dim] += 1.0;
                    }
                    v
                })
                .collect())
        }
        fn native_dimension(&self) -> usize {
            self.dim
        }
    }

    async fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doctrove.db");
        let embedder: Arc<dyn Embed> = Arc::new(HashEmbedder { dim: 32 });
        let store = Store::initialize(&path, embedder, 32).await.unwrap();
        (store, dir)
    }

    fn doc(url: &str, content: &str) -> Document {
        Document {
            library: "rust".to_string(),
            version: "1.0".to_string(),
            url: url.to_string(),
            content: content.to_string(),
            metadata: HashMap::new(),
            embedding: Vec::new(),
        }
    }

    #[tokio::test]
    async fn add_and_find_scopes_to_library_and_version() {
        let (store, _dir) = test_store().await;
        store
            .add_documents(
                "rust",
                "1.0",
                &[doc("https://a", "ownership and borrowing rules"), doc("https://b", "async runtime scheduling")],
            )
            .await
            .unwrap();
        store
            .add_documents("python", "3.0", &[doc("https://c", "ownership and borrowing rules")])
            .await
            .unwrap();

        let results = store.find_by_content("rust", "1.0", "ownership and borrowing rules", 10).await.unwrap();
        assert!(results.iter().all(|r| r.document.library == "rust" && r.document.version == "1.0"));
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn find_by_content_has_no_duplicate_ids_and_respects_limit() {
        let (store, _dir) = test_store().await;
        let docs: Vec<Document> = (0..20).map(|i| doc(&format!("https://x/{i}"), "shared keyword content")).collect();
        store.add_documents("rust", "1.0", &docs).await.unwrap();

        let results = store.find_by_content("rust", "1.0", "shared keyword", 5).await.unwrap();
        assert!(results.len() <= 5);
        let mut ids: Vec<i64> = results.iter().map(|r| r.id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[tokio::test]
    async fn remove_documents_cascades_across_tables() {
        let (store, _dir) = test_store().await;
        store.add_documents("rust", "1.0", &[doc("https://a", "hello world")]).await.unwrap();
        assert!(store.check_exists("rust", "1.0").await.unwrap());

        let removed = store.remove_documents("rust", "1.0", None).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!store.check_exists("rust", "1.0").await.unwrap());
    }

    #[test]
    fn fts_escape_wraps_user_text_as_a_single_phrase() {
        assert_eq!(escape_fts_query("hello world"), "\"hello world\"");
        assert_eq!(escape_fts_query("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_fts_query(""), "\"\"");
    }
}
