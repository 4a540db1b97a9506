//! File-based config loader (`doctrove.json`) with env-var fallback.
//!
//! Mirrors the teacher's `ShadowConfig`/`load_shadow_config` resolution
//! order: JSON field → env var → built-in default. Missing or malformed
//! config files fall back to defaults rather than erroring (SPEC_FULL.md §8).

use std::path::Path;

/// Default fixed dimension the store normalizes every embedding to.
/// Matches `model2vec`'s `potion-base-8M` output width so the default
/// `Embed` implementation needs no padding in the common case.
pub const DEFAULT_VECTOR_DIMENSION: usize = 256;

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_SQLITE_PATH: &str = "DOCTROVE_SQLITE_PATH";
pub const ENV_VECTOR_DIMENSION: &str = "DOCTROVE_VECTOR_DIMENSION";
pub const ENV_EMBED_PROVIDER: &str = "DOCTROVE_EMBED_PROVIDER";
pub const ENV_CONFIG_PATH: &str = "DOCTROVE_CONFIG";

#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct DoctroveConfigFile {
    pub vector_dimension: Option<usize>,
    pub sqlite_path: Option<String>,
    pub chrome_executable: Option<String>,
    pub embed_provider: Option<String>,
}

/// Resolved configuration surface (spec.md §6, SPEC_FULL.md §6).
#[derive(Clone, Debug)]
pub struct DoctroveConfig {
    pub vector_dimension: usize,
    pub sqlite_path: std::path::PathBuf,
    pub chrome_executable: Option<String>,
    pub embed_provider: String,
}

impl DoctroveConfig {
    /// Load `doctrove.json` from standard locations, falling back to
    /// env vars and then built-in defaults for any unset field.
    ///
    /// Search order (first found wins): `./doctrove.json`, `../doctrove.json`,
    /// the `DOCTROVE_CONFIG` env var path. Missing file → defaults. Parse
    /// error → log a warning, use defaults.
    pub fn load() -> Self {
        let file = load_config_file();
        Self::resolve(file)
    }

    fn resolve(file: DoctroveConfigFile) -> Self {
        let vector_dimension = file
            .vector_dimension
            .or_else(|| {
                std::env::var(ENV_VECTOR_DIMENSION)
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(DEFAULT_VECTOR_DIMENSION);

        let sqlite_path = file
            .sqlite_path
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var(ENV_SQLITE_PATH).ok().filter(|s| !s.trim().is_empty()))
            .map(std::path::PathBuf::from)
            .unwrap_or_else(default_sqlite_path);

        let chrome_executable = file
            .chrome_executable
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var(ENV_CHROME_EXECUTABLE).ok().filter(|s| !s.trim().is_empty()));

        let embed_provider = file
            .embed_provider
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var(ENV_EMBED_PROVIDER).ok().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| "model2vec:potion-base-8M".to_string());

        Self {
            vector_dimension,
            sqlite_path,
            chrome_executable,
            embed_provider,
        }
    }
}

fn default_sqlite_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".doctrove")
        .join("doctrove.db")
}

fn load_config_file() -> DoctroveConfigFile {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("doctrove.json"),
            std::path::PathBuf::from("../doctrove.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                return match serde_json::from_str::<DoctroveConfigFile>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "doctrove.json loaded");
                        cfg
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "doctrove.json parse error — using defaults");
                        DoctroveConfigFile::default()
                    }
                };
            }
            Err(_) => continue,
        }
    }

    DoctroveConfigFile::default()
}

/// Resolves `config.chrome_executable` to a usable path, discarding it if
/// the file no longer exists so `BrowserFetcher` falls back to its own
/// PATH/well-known-path discovery instead of failing to launch.
pub fn chrome_executable_override(config: &DoctroveConfig) -> Option<String> {
    let p = config.chrome_executable.as_ref()?;
    if Path::new(p).exists() {
        Some(p.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_defaults_when_file_empty() {
        let cfg = DoctroveConfig::resolve(DoctroveConfigFile::default());
        assert_eq!(cfg.vector_dimension, DEFAULT_VECTOR_DIMENSION);
        assert_eq!(cfg.embed_provider, "model2vec:potion-base-8M");
    }

    #[test]
    fn resolve_prefers_file_values() {
        let file = DoctroveConfigFile {
            vector_dimension: Some(512),
            sqlite_path: Some("/tmp/x.db".to_string()),
            chrome_executable: None,
            embed_provider: Some("model2vec:other".to_string()),
        };
        let cfg = DoctroveConfig::resolve(file);
        assert_eq!(cfg.vector_dimension, 512);
        assert_eq!(cfg.sqlite_path, std::path::PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.embed_provider, "model2vec:other");
    }

    #[test]
    fn chrome_executable_override_discards_a_path_that_no_longer_exists() {
        let mut cfg = DoctroveConfig::resolve(DoctroveConfigFile::default());
        cfg.chrome_executable = Some("/no/such/chrome-binary".to_string());
        assert_eq!(chrome_executable_override(&cfg), None);

        cfg.chrome_executable = None;
        assert_eq!(chrome_executable_override(&cfg), None);
    }
}
