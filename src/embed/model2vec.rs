use std::sync::Arc;

use async_trait::async_trait;
use model2vec_rs::model::StaticModel;
use tokio::sync::OnceCell;

use super::Embed;
use crate::core::error::EmbedError;

/// Local, network-free embedding backend wrapping `model2vec_rs::StaticModel`
/// (spec.md §4.F / SPEC_FULL.md §4.F), mirroring the teacher's
/// `MemoryManager`: the model loads lazily behind a `OnceCell`, on a
/// blocking thread, and a sentinel string is encoded once at construction to
/// probe the model's native output width.
pub struct Model2VecEmbedder {
    model_id: String,
    model: Arc<OnceCell<Arc<StaticModel>>>,
    dimension: usize,
}

const DIMENSION_PROBE_TEXT: &str = "doctrove embedding dimension probe";

impl Model2VecEmbedder {
    /// Loads the model eagerly to determine its native dimension, the same
    /// order of operations as the teacher's `MemoryManager::new`.
    pub async fn load(model_id: impl Into<String>) -> Result<Self, EmbedError> {
        let model_id = model_id.into();
        let load_id = model_id.clone();
        let model = tokio::task::spawn_blocking(move || {
            StaticModel::from_pretrained(&load_id, None, None, None)
        })
        .await
        .map_err(|e| EmbedError::Inner(format!("embedding model load task panicked: {e}")))?
        .map_err(|e| EmbedError::ModelConfiguration(format!("failed to load model2vec model {model_id:?}: {e}")))?;
        let model = Arc::new(model);

        let probe_model = model.clone();
        let dimension = tokio::task::spawn_blocking(move || probe_model.encode_single(DIMENSION_PROBE_TEXT))
            .await
            .map_err(|e| EmbedError::Inner(format!("embedding dimension probe task panicked: {e}")))?
            .len();

        let cell = OnceCell::new();
        let _ = cell.set(model);

        Ok(Self {
            model_id,
            model: Arc::new(cell),
            dimension,
        })
    }

    async fn model_handle(&self) -> Arc<StaticModel> {
        self.model
            .get_or_init(|| async {
                let model_id = self.model_id.clone();
                tokio::task::spawn_blocking(move || {
                    Arc::new(
                        StaticModel::from_pretrained(&model_id, None, None, None)
                            .expect("model2vec model failed to reload"),
                    )
                })
                .await
                .expect("embedding reload task panicked")
            })
            .await
            .clone()
    }
}

#[async_trait]
impl Embed for Model2VecEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let model = self.model_handle().await;
        let text = text.to_string();
        tokio::task::spawn_blocking(move || model.encode_single(&text))
            .await
            .map_err(|e| EmbedError::Inner(format!("embedding task panicked: {e}")))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let model = self.model_handle().await;
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| model.encode_single(t)).collect())
            .await
            .map_err(|e| EmbedError::Inner(format!("embedding task panicked: {e}")))
    }

    fn native_dimension(&self) -> usize {
        self.dimension
    }
}
