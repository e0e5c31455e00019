use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::matching::embedding::{EmbeddingBackend, EmbeddingProvider, DEFAULT_DIMENSION};
use crate::settings::{EnvThreshold, JsonFileSettings, ThresholdSource};

/// Environment variable that, when set, overrides the settings file threshold.
pub const THRESHOLD_ENV: &str = "MATCHER_SKILL_THRESHOLD";

/// Configuration loaded from environment variables (and `.env` if present).
/// Everything has a default; only malformed values are errors.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings_path: PathBuf,
    /// Take the threshold from `MATCHER_SKILL_THRESHOLD` instead of the file.
    pub threshold_from_env: bool,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_dim: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let embedding_backend = match std::env::var("MATCHER_EMBEDDING_BACKEND") {
            Ok(raw) => raw
                .parse::<EmbeddingBackend>()
                .map_err(|e| anyhow!("MATCHER_EMBEDDING_BACKEND: {e} (expected fastembed, hash or none)"))?,
            Err(_) => EmbeddingBackend::default_for_build(),
        };

        Ok(Config {
            settings_path: std::env::var("MATCHER_SETTINGS_PATH")
                .unwrap_or_else(|_| "semantic_settings.json".to_string())
                .into(),
            threshold_from_env: std::env::var(THRESHOLD_ENV).is_ok(),
            embedding_backend,
            embedding_dim: std::env::var("MATCHER_EMBEDDING_DIM")
                .unwrap_or_else(|_| DEFAULT_DIMENSION.to_string())
                .parse::<usize>()
                .context("MATCHER_EMBEDDING_DIM must be a positive integer")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// The embedding provider; its model loads lazily on first use.
    pub fn embedding_provider(&self) -> EmbeddingProvider {
        self.embedding_backend.provider(self.embedding_dim)
    }

    pub fn file_settings(&self) -> JsonFileSettings {
        JsonFileSettings::new(&self.settings_path)
    }

    /// The threshold source scoring reads on every call.
    pub fn threshold_source(&self) -> Arc<dyn ThresholdSource> {
        if self.threshold_from_env {
            Arc::new(EnvThreshold::new(THRESHOLD_ENV))
        } else {
            Arc::new(self.file_settings())
        }
    }
}
