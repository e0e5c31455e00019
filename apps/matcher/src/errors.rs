use thiserror::Error;

/// Faults raised by the embedding layer.
///
/// Scoring never propagates these: every caller treats them as
/// "semantic information unavailable" and falls back to lexical matching.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding backend unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding model failed to load: {0}")]
    ModelLoad(String),

    #[error("Embedding failed: {0}")]
    Encode(String),

    #[error("Embedding backend returned no vector")]
    EmptyOutput,
}

impl EmbeddingError {
    /// Stable label per variant, used to rate-limit fault logging.
    pub fn kind(&self) -> &'static str {
        match self {
            EmbeddingError::Unavailable(_) => "unavailable",
            EmbeddingError::ModelLoad(_) => "model_load",
            EmbeddingError::Encode(_) => "encode",
            EmbeddingError::EmptyOutput => "empty_output",
        }
    }
}

/// Errors from the settings collaborator (only the write path surfaces them).
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid skill threshold: {0}")]
    InvalidThreshold(f64),
}
