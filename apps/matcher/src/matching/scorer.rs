//! Composite Scorer and Explainability Reporter.
//!
//! Both entry points run the same signal computation (`Signals`) and the same
//! composite formula, so `score()` and `explain()` agree bit-for-bit on the
//! composite for identical inputs. `explain()` only keeps more of the detail.
//!
//! composite = 0.40·embedding + 0.35·skills + 0.25·experience, clamped to [0, 1].
//! The raw embedding similarity is NOT clamped before weighting; a negative
//! cosine can offset the other components.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::embedding::EmbeddingProvider;
use crate::matching::experience::experience_score;
use crate::matching::similarity::cosine_similarity;
use crate::matching::skills::{ResumeContext, SkillMatchDetail, SkillMatchOutcome, SkillMatcher};
use crate::matching::{CandidateProfile, JobProfile};
use crate::settings::ThresholdSource;

pub const EMBEDDING_WEIGHT: f64 = 0.40;
pub const SKILL_WEIGHT: f64 = 0.35;
pub const EXPERIENCE_WEIGHT: f64 = 0.25;

pub const REASON_MISSING_SKILLS: &str = "Missing several required skills";
pub const REASON_LOW_SIMILARITY: &str =
    "Low semantic similarity between resume and job description";
pub const REASON_LOW_EXPERIENCE: &str = "Insufficient apparent experience";

const MISSING_SKILLS_BELOW: f64 = 0.5;
const LOW_SIMILARITY_BELOW: f64 = 0.45;
const LOW_EXPERIENCE_BELOW: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// Summary explanation returned alongside the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreExplanation {
    pub embedding_similarity: f64,
    pub matched_skills: Vec<String>,
    pub skill_score: f64,
    pub experience_score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

impl ComponentScore {
    fn new(value: f64, weight: f64) -> Self {
        Self {
            value,
            weight,
            contribution: value * weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub embedding: ComponentScore,
    pub skills: ComponentScore,
    pub experience: ComponentScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub skill_similarity_threshold: f64,
}

/// Human-facing breakdown of a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainabilityReport {
    pub composite_score: f64,
    pub components: ScoreComponents,
    pub per_skill: Vec<SkillMatchDetail>,
    pub matched_skills: Vec<String>,
    pub settings: ReportSettings,
    pub reasons: Vec<String>,
}

/// A candidate with its resume embedding computed once, for scoring one
/// resume against many jobs.
#[derive(Debug, Clone)]
pub struct PreparedCandidate {
    pub candidate: CandidateProfile,
    /// `None` when the embedding provider faulted.
    pub resume_embedding: Option<Vec<f32>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Signals (shared by score and explain)
// ────────────────────────────────────────────────────────────────────────────

struct Signals {
    embedding_similarity: f64,
    skills: SkillMatchOutcome,
    skill_score: f64,
    experience_score: f64,
    threshold: f64,
    has_required_skills: bool,
    requires_experience: bool,
}

impl Signals {
    fn composite(&self) -> f64 {
        let raw = self.embedding_similarity * EMBEDDING_WEIGHT
            + self.skill_score * SKILL_WEIGHT
            + self.experience_score * EXPERIENCE_WEIGHT;
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 1.0)
    }

    fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.skill_score < MISSING_SKILLS_BELOW && self.has_required_skills {
            reasons.push(REASON_MISSING_SKILLS.to_string());
        }
        if self.embedding_similarity < LOW_SIMILARITY_BELOW {
            reasons.push(REASON_LOW_SIMILARITY.to_string());
        }
        if self.experience_score < LOW_EXPERIENCE_BELOW && self.requires_experience {
            reasons.push(REASON_LOW_EXPERIENCE.to_string());
        }
        reasons
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer
// ────────────────────────────────────────────────────────────────────────────

/// Entry point for both scoring and explanation. Cheap to clone and share.
#[derive(Clone)]
pub struct Scorer {
    provider: Arc<EmbeddingProvider>,
    matcher: SkillMatcher,
}

impl Scorer {
    pub fn new(provider: Arc<EmbeddingProvider>, settings: Arc<dyn ThresholdSource>) -> Self {
        let matcher = SkillMatcher::new(provider.clone(), settings);
        Self { provider, matcher }
    }

    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    pub fn skill_matcher(&self) -> &SkillMatcher {
        &self.matcher
    }

    /// Embeds the resume once. A provider fault leaves `resume_embedding` empty.
    pub fn prepare(&self, candidate: &CandidateProfile) -> PreparedCandidate {
        let resume_embedding = match self.provider.embed(&candidate.resume_text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                self.provider
                    .report_fault(&e, "Resume embedding unavailable; using lexical signals only");
                None
            }
        };
        PreparedCandidate {
            candidate: candidate.clone(),
            resume_embedding,
        }
    }

    /// Composite score in [0, 1] plus a summary explanation. Never fails.
    pub fn score(&self, job: &JobProfile, candidate: &CandidateProfile) -> (f64, ScoreExplanation) {
        self.score_prepared(job, &self.prepare(candidate))
    }

    pub fn score_prepared(
        &self,
        job: &JobProfile,
        prepared: &PreparedCandidate,
    ) -> (f64, ScoreExplanation) {
        let signals = self.signals(job, prepared);
        let composite = signals.composite();
        let explanation = ScoreExplanation {
            embedding_similarity: signals.embedding_similarity,
            matched_skills: signals.skills.matched.clone(),
            skill_score: signals.skill_score,
            experience_score: signals.experience_score,
            reasons: signals.reasons(),
        };
        (composite, explanation)
    }

    /// Same computation as `score`, keeping per-skill and per-component detail.
    pub fn explain(&self, job: &JobProfile, candidate: &CandidateProfile) -> ExplainabilityReport {
        self.explain_prepared(job, &self.prepare(candidate))
    }

    pub fn explain_prepared(
        &self,
        job: &JobProfile,
        prepared: &PreparedCandidate,
    ) -> ExplainabilityReport {
        let signals = self.signals(job, prepared);
        let composite_score = signals.composite();
        let reasons = signals.reasons();
        ExplainabilityReport {
            composite_score,
            components: ScoreComponents {
                embedding: ComponentScore::new(signals.embedding_similarity, EMBEDDING_WEIGHT),
                skills: ComponentScore::new(signals.skill_score, SKILL_WEIGHT),
                experience: ComponentScore::new(signals.experience_score, EXPERIENCE_WEIGHT),
            },
            matched_skills: signals.skills.matched,
            per_skill: signals.skills.per_skill,
            settings: ReportSettings {
                skill_similarity_threshold: signals.threshold,
            },
            reasons,
        }
    }

    fn signals(&self, job: &JobProfile, prepared: &PreparedCandidate) -> Signals {
        let resume_text = prepared.candidate.resume_text.as_str();
        let resume_embedding = prepared.resume_embedding.as_deref();

        let embedding_similarity = match resume_embedding {
            Some(resume_vec) => match self.provider.embed(&job.description) {
                Ok(job_vec) => cosine_similarity(&job_vec, resume_vec) as f64,
                Err(e) => {
                    self.provider
                        .report_fault(&e, "Job description embedding unavailable");
                    0.0
                }
            },
            None => 0.0,
        };

        let threshold = self.matcher.threshold();
        let ctx = ResumeContext::new(resume_text, resume_embedding, &self.provider, threshold);
        let skills = self.matcher.match_with_context(
            &job.required_skills,
            &ctx,
            job.skill_embeddings.as_deref(),
        );

        let has_required_skills = !job.required_skills.is_empty();
        let skill_score = if has_required_skills {
            skills.matched.len() as f64 / job.required_skills.len().max(1) as f64
        } else {
            0.0
        };

        let experience_score = experience_score(job.min_experience_years, resume_text);

        debug!(
            embedding_similarity,
            skill_score,
            experience_score,
            threshold,
            matched = skills.matched.len(),
            required = job.required_skills.len(),
            "Computed match signals"
        );

        Signals {
            embedding_similarity,
            skills,
            skill_score,
            experience_score,
            threshold,
            has_required_skills,
            requires_experience: job.min_experience_years > 0,
        }
    }
}

/// Normalizes a stored score of unknown scale into [0, 1].
///
/// Legacy rows hold either a fraction (0.0886) or a percentage (8.86);
/// values above 1 are treated as percentages. Missing or NaN yields 0.0.
pub fn normalize_stored_score(score: Option<f64>) -> f64 {
    let Some(value) = score.filter(|v| !v.is_nan()) else {
        return 0.0;
    };
    if value > 1.0 {
        (value / 100.0).clamp(0.0, 1.0)
    } else {
        value.clamp(0.0, 1.0)
    }
}
