//! Embedding Provider: maps text to a fixed-length dense vector.
//!
//! The backend is created lazily, on the first `embed` call, through a
//! one-shot initializer: concurrent first calls block on the same slot and the
//! loader runs at most once. A failed load is remembered and reported as an
//! `EmbeddingError` on every later call; callers fall back to lexical matching.
//! Faults are logged at `warn` once per kind and at `debug` after that.
//!
//! Backends:
//! - `HashEmbedder`: deterministic feature hashing, no model files.
//! - `MiniLmEmbedder` (feature `fastembed`): local all-MiniLM-L6-v2 via ONNX.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use siphasher::sip::SipHasher13;
use tracing::{debug, info, warn};

use crate::errors::EmbeddingError;
use crate::matching::normalize::tokens;

/// Output width of all-MiniLM-L6-v2; also the default for the hashing backend.
pub const DEFAULT_DIMENSION: usize = 384;

/// A text → vector backend. Must be deterministic for a given input.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;
    fn dimension(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

type Loader = Box<dyn Fn() -> Result<Box<dyn Embedder>, EmbeddingError> + Send + Sync>;

/// Owns a single lazily-initialized embedding backend.
///
/// Injected into the scorer as `Arc<EmbeddingProvider>`; there is no
/// process-global model handle.
pub struct EmbeddingProvider {
    label: String,
    dimension: usize,
    loader: Option<Loader>,
    handle: OnceLock<Result<Box<dyn Embedder>, EmbeddingError>>,
    reported: Mutex<HashSet<&'static str>>,
}

impl EmbeddingProvider {
    /// Provider whose backend is built by `loader` on first use.
    pub fn new<F>(label: impl Into<String>, dimension: usize, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Embedder>, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            dimension: dimension.max(1),
            loader: Some(Box::new(loader)),
            handle: OnceLock::new(),
            reported: Mutex::default(),
        }
    }

    /// Provider around an already-constructed backend.
    pub fn with_embedder(embedder: impl Embedder + 'static) -> Self {
        let boxed: Box<dyn Embedder> = Box::new(embedder);
        Self {
            label: boxed.name().to_string(),
            dimension: boxed.dimension().max(1),
            loader: None,
            handle: OnceLock::from(Ok(boxed)),
            reported: Mutex::default(),
        }
    }

    /// Provider that never produces vectors. Scoring runs lexical-only.
    pub fn unavailable() -> Self {
        Self {
            label: "none".to_string(),
            dimension: DEFAULT_DIMENSION,
            loader: None,
            handle: OnceLock::new(),
            reported: Mutex::default(),
        }
    }

    /// Lazily-built feature-hashing backend.
    pub fn hashed(dimension: usize) -> Self {
        Self::new("hash", dimension, move || {
            Ok(Box::new(HashEmbedder::new(dimension)) as Box<dyn Embedder>)
        })
    }

    /// Lazily-loaded all-MiniLM-L6-v2 backend.
    #[cfg(feature = "fastembed")]
    pub fn minilm() -> Self {
        use crate::matching::minilm::{MiniLmEmbedder, MINILM_DIMENSION, MODEL_NAME};

        Self::new(MODEL_NAME, MINILM_DIMENSION, || {
            Ok(Box::new(MiniLmEmbedder::load()?) as Box<dyn Embedder>)
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Dimension of the loaded backend, or the declared one before loading.
    pub fn dimension(&self) -> usize {
        match self.handle.get() {
            Some(Ok(embedder)) => embedder.dimension(),
            _ => self.dimension,
        }
    }

    /// Whether the one-time initialization has run (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Embeds `text`. Blank text returns a zero vector without touching the model.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension()]);
        }
        let vector = self.backend()?.embed(text)?;
        if vector.is_empty() {
            return Err(EmbeddingError::EmptyOutput);
        }
        Ok(vector)
    }

    /// Skill embeddings computed once at job-creation time, positionally
    /// aligned with `skills`. Returns `None` when the backend is unavailable.
    pub fn precompute_skill_embeddings(&self, skills: &[String]) -> Option<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(skills.len());
        for skill in skills {
            match self.embed(skill) {
                Ok(vector) => out.push(vector),
                Err(e) => {
                    self.report_fault(&e, "Skipping skill embedding precomputation");
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Logs `error` at `warn` the first time its kind is seen on this provider
    /// and at `debug` afterwards. Returns whether this was the first report.
    pub fn report_fault(&self, error: &EmbeddingError, message: &str) -> bool {
        let first = self
            .reported
            .lock()
            .map(|mut seen| seen.insert(error.kind()))
            .unwrap_or(true);
        if first {
            warn!(backend = %self.label, kind = error.kind(), error = %error, "{message}");
        } else {
            debug!(backend = %self.label, kind = error.kind(), error = %error, "{message}");
        }
        first
    }

    fn backend(&self) -> Result<&dyn Embedder, EmbeddingError> {
        let slot = self.handle.get_or_init(|| match &self.loader {
            Some(load) => {
                info!(backend = %self.label, "Loading embedding model");
                match load() {
                    Ok(embedder) => {
                        info!(
                            backend = %self.label,
                            dimension = embedder.dimension(),
                            "Embedding model ready"
                        );
                        Ok(embedder)
                    }
                    Err(e) => {
                        self.report_fault(
                            &e,
                            "Embedding model unavailable; falling back to lexical matching",
                        );
                        Err(e)
                    }
                }
            }
            None => {
                debug!("No embedding backend configured");
                Err(EmbeddingError::Unavailable(
                    "no embedding backend configured".to_string(),
                ))
            }
        });

        match slot {
            Ok(embedder) => Ok(embedder.as_ref()),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Which backend the provider should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    FastEmbed,
    Hash,
    None,
}

impl EmbeddingBackend {
    /// `fastembed` when compiled in, otherwise `hash`.
    pub fn default_for_build() -> Self {
        if cfg!(feature = "fastembed") {
            EmbeddingBackend::FastEmbed
        } else {
            EmbeddingBackend::Hash
        }
    }

    pub fn provider(self, dimension: usize) -> EmbeddingProvider {
        match self {
            #[cfg(feature = "fastembed")]
            EmbeddingBackend::FastEmbed => EmbeddingProvider::minilm(),
            #[cfg(not(feature = "fastembed"))]
            EmbeddingBackend::FastEmbed => EmbeddingProvider::new("fastembed", dimension, || {
                Err(EmbeddingError::ModelLoad(
                    "built without the `fastembed` feature".to_string(),
                ))
            }),
            EmbeddingBackend::Hash => EmbeddingProvider::hashed(dimension),
            EmbeddingBackend::None => EmbeddingProvider::unavailable(),
        }
    }
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fastembed" | "minilm" => Ok(EmbeddingBackend::FastEmbed),
            "hash" => Ok(EmbeddingBackend::Hash),
            "none" | "off" => Ok(EmbeddingBackend::None),
            other => Err(format!("unknown embedding backend '{other}'")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HashEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Fixed SipHash keys. Changing them changes every vector, which invalidates
/// stored skill embeddings.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

/// Bag-of-tokens feature hashing with signed buckets, L2-normalized.
///
/// Tokens come from the text normalizer, so vectors are case- and
/// punctuation-insensitive.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokens(text) {
            let idx = (self.hash(&token) % self.dimension as u64) as usize;
            let sign = if self.hash(&format!("{token}_sign")) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::cosine_similarity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_blank_text_is_zero_vector_without_loading() {
        let provider = EmbeddingProvider::hashed(16);
        let v = provider.embed("   ").unwrap();
        assert_eq!(v, vec![0.0; 16]);
        assert!(!provider.is_initialized());
    }

    #[test]
    fn test_hash_embedder_is_deterministic() {
        let provider = EmbeddingProvider::hashed(DEFAULT_DIMENSION);
        let a = provider.embed("Rust and Kubernetes").unwrap();
        let b = provider.embed("rust, kubernetes AND").unwrap();
        assert_eq!(a.len(), DEFAULT_DIMENSION);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_embedder_is_unit_length() {
        let v = HashEmbedder::new(64).embed("distributed systems engineer").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_overlapping_texts_are_more_similar() {
        let e = HashEmbedder::new(DEFAULT_DIMENSION);
        let job = e.embed("react developer with docker").unwrap();
        let close = e.embed("senior react developer using docker daily").unwrap();
        let far = e.embed("pastry chef bakery croissant").unwrap();
        assert!(cosine_similarity(&job, &close) > cosine_similarity(&job, &far));
    }

    #[test]
    fn test_unavailable_provider_faults() {
        let provider = EmbeddingProvider::unavailable();
        assert!(matches!(
            provider.embed("anything"),
            Err(EmbeddingError::Unavailable(_))
        ));
        assert!(provider.precompute_skill_embeddings(&["Rust".to_string()]).is_none());
    }

    #[test]
    fn test_failed_load_is_not_retried() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let provider = EmbeddingProvider::new("broken", 8, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(EmbeddingError::ModelLoad("missing weights".to_string()))
        });

        assert!(provider.embed("first").is_err());
        assert!(provider.embed("second").is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_faults_warn_once_per_kind() {
        let provider = EmbeddingProvider::unavailable();
        let unavailable = EmbeddingError::Unavailable("off".to_string());
        let encode = EmbeddingError::Encode("bad input".to_string());

        assert!(provider.report_fault(&unavailable, "resume"));
        assert!(!provider.report_fault(&unavailable, "job description"));
        assert!(provider.report_fault(&encode, "resume"));
        assert!(!provider.report_fault(&encode, "resume"));
    }

    #[test]
    fn test_failed_load_consumes_first_report() {
        let provider = EmbeddingProvider::new("broken", 8, || {
            Err(EmbeddingError::ModelLoad("missing weights".to_string()))
        });
        let err = provider.embed("text").unwrap_err();
        assert!(!provider.report_fault(&err, "Resume embedding unavailable"));
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let provider = Arc::new(EmbeddingProvider::new("hash", 32, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            Ok(Box::new(HashEmbedder::new(32)) as Box<dyn Embedder>)
        }));

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let provider = provider.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    provider.embed(&format!("skill {i}")).unwrap()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap().len(), 32);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_precompute_keeps_positions() {
        let provider = EmbeddingProvider::hashed(16);
        let skills = vec!["Rust".to_string(), String::new(), "SQL".to_string()];
        let vectors = provider.precompute_skill_embeddings(&skills).unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 16));
        // buckets may collide at this width; only the blank slot is known
        assert_eq!(vectors[1], vec![0.0; 16]);
        assert!(vectors[0].iter().any(|x| *x != 0.0));
        assert!(vectors[2].iter().any(|x| *x != 0.0));
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("hash".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Hash));
        assert_eq!(
            "FastEmbed".parse::<EmbeddingBackend>(),
            Ok(EmbeddingBackend::FastEmbed)
        );
        assert_eq!("off".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::None));
        assert!("word2vec".parse::<EmbeddingBackend>().is_err());
    }
}
