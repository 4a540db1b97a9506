//! Text-to-vector embedding capability (spec.md §4.F). Grounded in the
//! teacher's `features::history::MemoryManager`: the `StaticModel` is
//! loaded once via `tokio::task::spawn_blocking`, and a sentinel string is
//! encoded at startup to probe the effective dimension.

mod model2vec;

pub use model2vec::Model2VecEmbedder;

use async_trait::async_trait;

use crate::core::error::EmbedError;

/// Produces a fixed-length float vector for a piece of text. Implementations
/// are not responsible for dimension normalization — see
/// [`FixedDimensionEmbeddings`].
#[async_trait]
pub trait Embed: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// The model's native output width, before any padding/truncation.
    fn native_dimension(&self) -> usize;
}

/// Identifies an embedding backend from the `"provider:model"` external
/// configuration string (spec.md §6). Only `model2vec` is wired to a real
/// implementation; any other provider name is a configuration error, not a
/// crash — the embedding provider catalogue itself is out of scope.
pub struct EmbedProvider {
    pub provider: String,
    pub model: String,
}

impl EmbedProvider {
    pub fn parse(spec: &str) -> Result<Self, EmbedError> {
        let (provider, model) = spec
            .split_once(':')
            .ok_or_else(|| EmbedError::ModelConfiguration(format!("expected \"provider:model\", got {spec:?}")))?;
        if provider.is_empty() || model.is_empty() {
            return Err(EmbedError::ModelConfiguration(format!(
                "expected \"provider:model\", got {spec:?}"
            )));
        }
        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

/// Wraps an inner [`Embed`] to normalize its output to `target_dim`
/// (spec.md §4.F):
/// - `native == target`: pass through.
/// - `native < target`: zero-pad every vector, consistently, so dot products
///   between padded vectors equal dot products between the originals.
/// - `native > target`: fail unless the model supports truncation (no
///   Matryoshka-capable model is wired up in this crate, so this always
///   errors today); truncation support is a documented extension point.
pub struct FixedDimensionEmbeddings<E: Embed> {
    inner: E,
    target_dim: usize,
}

impl<E: Embed> FixedDimensionEmbeddings<E> {
    /// Wraps `inner`, validating its native dimension against `target_dim`
    /// up front rather than deferring the failure to the first embed call.
    pub fn new(inner: E, target_dim: usize) -> Result<Self, EmbedError> {
        let native = inner.native_dimension();
        if native > target_dim {
            return Err(EmbedError::Dimension {
                expected: target_dim,
                got: native,
            });
        }
        Ok(Self { inner, target_dim })
    }

    fn normalize(&self, mut v: Vec<f32>) -> Vec<f32> {
        if v.len() < self.target_dim {
            v.resize(self.target_dim, 0.0);
        } else if v.len() > self.target_dim {
            v.truncate(self.target_dim);
        }
        v
    }

    pub fn target_dimension(&self) -> usize {
        self.target_dim
    }
}

#[async_trait]
impl<E: Embed> Embed for FixedDimensionEmbeddings<E> {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.normalize(self.inner.embed_query(text).await?))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let raw = self.inner.embed_documents(texts).await?;
        Ok(raw.into_iter().map(|v| self.normalize(v)).collect())
    }

    fn native_dimension(&self) -> usize {
        self.target_dim
    }
}
