//! all-MiniLM-L6-v2 via fastembed (local ONNX runtime, no API calls).

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::errors::EmbeddingError;
use crate::matching::embedding::Embedder;

pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const MINILM_DIMENSION: usize = 384;

/// fastembed needs `&mut` for inference, so the session sits behind a mutex.
pub struct MiniLmEmbedder {
    model: Mutex<TextEmbedding>,
}

impl MiniLmEmbedder {
    /// Downloads (first run) and loads the model. Slow; call through the provider.
    pub fn load() -> Result<Self, EmbeddingError> {
        let options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        let model =
            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for MiniLmEmbedder {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        MINILM_DIMENSION
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Encode("embedding model lock poisoned".to_string()))?;
        let mut vectors = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Encode(e.to_string()))?;
        vectors.pop().ok_or(EmbeddingError::EmptyOutput)
    }
}
