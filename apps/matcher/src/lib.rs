//! Resume ↔ job match scoring with per-factor explanations.
//!
//! ```ignore
//! use std::sync::Arc;
//! use matcher::matching::{embedding::EmbeddingProvider, scorer::Scorer, CandidateProfile, JobProfile};
//! use matcher::settings::JsonFileSettings;
//!
//! let scorer = Scorer::new(
//!     Arc::new(EmbeddingProvider::hashed(384)),
//!     Arc::new(JsonFileSettings::new("semantic_settings.json")),
//! );
//! let (score, explanation) = scorer.score(&job, &candidate);
//! let report = scorer.explain(&job, &candidate);
//! ```

pub mod config;
pub mod errors;
pub mod matching;
pub mod settings;

pub use matching::scorer::{ExplainabilityReport, ScoreExplanation, Scorer};
pub use matching::{CandidateProfile, JobProfile};
