//! Skill Matcher: decides, per required skill, whether a resume covers it.
//!
//! Strategies run in a fixed order and the first success wins:
//! 1. `semantic_precomputed`: job-level precomputed skill vector vs resume vector
//! 2. `semantic_on_the_fly`: skill embedded now vs resume vector
//! 3. `substring`: normalized skill inside normalized resume
//! 4. `tokens_all`: every skill token is a resume token
//!
//! Semantic strategies step aside when no resume embedding is available, so a
//! provider fault degrades to the lexical strategies without raising.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::embedding::EmbeddingProvider;
use crate::matching::normalize::normalize;
use crate::matching::similarity::cosine_similarity;
use crate::settings::ThresholdSource;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    SemanticPrecomputed,
    SemanticOnTheFly,
    Substring,
    TokensAll,
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::SemanticPrecomputed => "semantic_precomputed",
            MatchMethod::SemanticOnTheFly => "semantic_on_the_fly",
            MatchMethod::Substring => "substring",
            MatchMethod::TokensAll => "tokens_all",
            MatchMethod::None => "none",
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            MatchMethod::SemanticPrecomputed | MatchMethod::SemanticOnTheFly
        )
    }
}

/// Per-skill decision, kept for the explainability report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatchDetail {
    pub skill: String,
    pub matched: bool,
    pub method: MatchMethod,
    /// Best semantic similarity observed (clamped to [0, 1]); `None` if no
    /// semantic comparison ran.
    pub similarity: Option<f64>,
    /// Normalized tokens found in the resume, recorded even when unmatched.
    pub tokens_matched: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillMatchOutcome {
    /// Matched skills as written in the job, in job order.
    pub matched: Vec<String>,
    pub per_skill: Vec<SkillMatchDetail>,
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy seam
// ────────────────────────────────────────────────────────────────────────────

/// Everything about the resume that strategies share. Built once per call.
pub struct ResumeContext<'a> {
    pub normalized: String,
    pub tokens: HashSet<String>,
    /// `None` when the embedding provider faulted.
    pub embedding: Option<&'a [f32]>,
    pub provider: &'a EmbeddingProvider,
    pub threshold: f64,
}

impl<'a> ResumeContext<'a> {
    pub fn new(
        resume_text: &str,
        embedding: Option<&'a [f32]>,
        provider: &'a EmbeddingProvider,
        threshold: f64,
    ) -> Self {
        let normalized = normalize(resume_text);
        let tokens = normalized.split_whitespace().map(str::to_string).collect();
        Self {
            normalized,
            tokens,
            embedding,
            provider,
            threshold,
        }
    }
}

/// One required skill as seen by the strategies.
pub struct SkillQuery<'a> {
    /// As written in the job, surrounding whitespace included.
    pub skill: &'a str,
    pub normalized: String,
    /// Aligned precomputed embedding, if one exists at this index.
    pub precomputed: Option<&'a [f32]>,
}

/// What a strategy learned about a skill.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub similarity: Option<f64>,
    pub tokens: BTreeSet<String>,
}

pub enum Attempt {
    Matched(Evidence),
    /// Ran but did not match; evidence is still kept for explanation.
    Missed(Evidence),
    /// Preconditions absent (no vector, provider fault).
    NotApplicable,
}

pub trait MatchStrategy: Send + Sync {
    fn method(&self) -> MatchMethod;
    fn attempt(&self, skill: &SkillQuery<'_>, ctx: &ResumeContext<'_>) -> Attempt;
}

fn semantic_attempt(skill_vec: &[f32], ctx: &ResumeContext<'_>) -> Attempt {
    let Some(resume_vec) = ctx.embedding else {
        return Attempt::NotApplicable;
    };
    let similarity = cosine_similarity(skill_vec, resume_vec) as f64;
    let evidence = Evidence {
        similarity: Some(similarity),
        tokens: BTreeSet::new(),
    };
    if similarity >= ctx.threshold {
        Attempt::Matched(evidence)
    } else {
        Attempt::Missed(evidence)
    }
}

pub struct PrecomputedEmbeddingStrategy;

impl MatchStrategy for PrecomputedEmbeddingStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::SemanticPrecomputed
    }

    fn attempt(&self, skill: &SkillQuery<'_>, ctx: &ResumeContext<'_>) -> Attempt {
        match skill.precomputed {
            Some(vector) => semantic_attempt(vector, ctx),
            None => Attempt::NotApplicable,
        }
    }
}

pub struct OnTheFlyEmbeddingStrategy;

impl MatchStrategy for OnTheFlyEmbeddingStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::SemanticOnTheFly
    }

    fn attempt(&self, skill: &SkillQuery<'_>, ctx: &ResumeContext<'_>) -> Attempt {
        if ctx.embedding.is_none() {
            return Attempt::NotApplicable;
        }
        match ctx.provider.embed(skill.skill) {
            Ok(vector) => semantic_attempt(&vector, ctx),
            Err(e) => {
                debug!(skill = %skill.skill, error = %e, "On-the-fly skill embedding unavailable");
                Attempt::NotApplicable
            }
        }
    }
}

pub struct SubstringStrategy;

impl MatchStrategy for SubstringStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::Substring
    }

    fn attempt(&self, skill: &SkillQuery<'_>, ctx: &ResumeContext<'_>) -> Attempt {
        if skill.normalized.is_empty() {
            return Attempt::NotApplicable;
        }
        if ctx.normalized.contains(&skill.normalized) {
            Attempt::Matched(Evidence {
                similarity: None,
                tokens: BTreeSet::from([skill.normalized.clone()]),
            })
        } else {
            Attempt::Missed(Evidence::default())
        }
    }
}

pub struct AllTokensStrategy;

impl MatchStrategy for AllTokensStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::TokensAll
    }

    fn attempt(&self, skill: &SkillQuery<'_>, ctx: &ResumeContext<'_>) -> Attempt {
        let skill_tokens: Vec<&str> = skill.normalized.split_whitespace().collect();
        if skill_tokens.is_empty() {
            return Attempt::NotApplicable;
        }
        let found: BTreeSet<String> = skill_tokens
            .iter()
            .filter(|t| ctx.tokens.contains(**t))
            .map(|t| t.to_string())
            .collect();
        let all_found = skill_tokens.iter().all(|t| ctx.tokens.contains(*t));
        let evidence = Evidence {
            similarity: None,
            tokens: found,
        };
        if all_found {
            Attempt::Matched(evidence)
        } else {
            Attempt::Missed(evidence)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SkillMatcher
// ────────────────────────────────────────────────────────────────────────────

/// Runs the ordered strategies over every required skill.
#[derive(Clone)]
pub struct SkillMatcher {
    provider: Arc<EmbeddingProvider>,
    settings: Arc<dyn ThresholdSource>,
    strategies: Arc<[Box<dyn MatchStrategy>]>,
}

impl SkillMatcher {
    pub fn new(provider: Arc<EmbeddingProvider>, settings: Arc<dyn ThresholdSource>) -> Self {
        let strategies: Vec<Box<dyn MatchStrategy>> = vec![
            Box::new(PrecomputedEmbeddingStrategy),
            Box::new(OnTheFlyEmbeddingStrategy),
            Box::new(SubstringStrategy),
            Box::new(AllTokensStrategy),
        ];
        Self {
            provider,
            settings,
            strategies: strategies.into(),
        }
    }

    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Current threshold from the settings collaborator.
    pub fn threshold(&self) -> f64 {
        self.settings.skill_threshold()
    }

    /// Matches `required_skills` against `resume_text`, embedding the resume once.
    pub fn match_skills(
        &self,
        required_skills: &[String],
        resume_text: &str,
        skill_embeddings: Option<&[Vec<f32>]>,
    ) -> SkillMatchOutcome {
        if required_skills.is_empty() {
            return SkillMatchOutcome::default();
        }
        let resume_embedding = self.provider.embed(resume_text).ok();
        let ctx = ResumeContext::new(
            resume_text,
            resume_embedding.as_deref(),
            &self.provider,
            self.threshold(),
        );
        self.match_with_context(required_skills, &ctx, skill_embeddings)
    }

    /// Matches against a prepared context; the scorer shares its resume vector this way.
    pub fn match_with_context(
        &self,
        required_skills: &[String],
        ctx: &ResumeContext<'_>,
        skill_embeddings: Option<&[Vec<f32>]>,
    ) -> SkillMatchOutcome {
        let mut outcome = SkillMatchOutcome::default();

        for (index, skill) in required_skills.iter().enumerate() {
            if skill.trim().is_empty() {
                continue;
            }
            let query = SkillQuery {
                skill: skill.as_str(),
                normalized: normalize(skill),
                precomputed: skill_embeddings
                    .and_then(|all| all.get(index))
                    .map(Vec::as_slice),
            };

            let detail = self.decide(&query, ctx);
            debug!(
                skill = %detail.skill,
                matched = detail.matched,
                method = detail.method.as_str(),
                similarity = ?detail.similarity,
                "Skill decision"
            );
            if detail.matched {
                outcome.matched.push(detail.skill.clone());
            }
            outcome.per_skill.push(detail);
        }

        outcome
    }

    fn decide(&self, query: &SkillQuery<'_>, ctx: &ResumeContext<'_>) -> SkillMatchDetail {
        let mut best_similarity: Option<f64> = None;
        let mut partial_tokens = BTreeSet::new();

        for strategy in self.strategies.iter() {
            let (matched, evidence) = match strategy.attempt(query, ctx) {
                Attempt::Matched(evidence) => (true, evidence),
                Attempt::Missed(evidence) => (false, evidence),
                Attempt::NotApplicable => continue,
            };

            if let Some(sim) = evidence.similarity {
                best_similarity = Some(best_similarity.map_or(sim, |b| b.max(sim)));
            }

            if matched {
                return SkillMatchDetail {
                    skill: query.skill.to_string(),
                    matched: true,
                    method: strategy.method(),
                    similarity: best_similarity.map(|s| s.clamp(0.0, 1.0)),
                    tokens_matched: evidence.tokens,
                };
            }
            if evidence.tokens.len() > partial_tokens.len() {
                partial_tokens = evidence.tokens;
            }
        }

        SkillMatchDetail {
            skill: query.skill.to_string(),
            matched: false,
            method: MatchMethod::None,
            similarity: best_similarity.map(|s| s.clamp(0.0, 1.0)),
            tokens_matched: partial_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EmbeddingError;
    use crate::matching::embedding::Embedder;
    use crate::settings::FixedThreshold;

    /// Axis-per-keyword embedder: each listed keyword present in the text
    /// lights up its own dimension.
    struct KeywordEmbedder {
        keywords: Vec<&'static str>,
    }

    impl Embedder for KeywordEmbedder {
        fn name(&self) -> &str {
            "keyword"
        }

        fn dimension(&self) -> usize {
            self.keywords.len()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let text = normalize(text);
            Ok(self
                .keywords
                .iter()
                .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    fn lexical_matcher() -> SkillMatcher {
        SkillMatcher::new(
            Arc::new(EmbeddingProvider::unavailable()),
            Arc::new(FixedThreshold::default()),
        )
    }

    fn keyword_matcher(threshold: f64) -> SkillMatcher {
        SkillMatcher::new(
            Arc::new(EmbeddingProvider::with_embedder(KeywordEmbedder {
                keywords: vec!["rust", "kubernetes"],
            })),
            Arc::new(FixedThreshold(threshold)),
        )
    }

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_requirements_yield_empty_outcome() {
        let outcome = lexical_matcher().match_skills(&[], "Rust developer", None);
        assert!(outcome.matched.is_empty());
        assert!(outcome.per_skill.is_empty());
    }

    #[test]
    fn test_punctuation_insensitive_substring() {
        let outcome =
            lexical_matcher().match_skills(&skills(&["Node.js"]), "experience with node js", None);
        assert_eq!(outcome.matched, vec!["Node.js"]);
        assert_eq!(outcome.per_skill[0].method, MatchMethod::Substring);
        assert!(outcome.per_skill[0].tokens_matched.contains("node js"));
        assert_eq!(outcome.per_skill[0].similarity, None);
    }

    #[test]
    fn test_all_tokens_in_any_order() {
        let outcome = lexical_matcher().match_skills(
            &skills(&["Machine Learning"]),
            "Learning systems and machine vision",
            None,
        );
        assert_eq!(outcome.per_skill[0].method, MatchMethod::TokensAll);
        assert!(outcome.per_skill[0].matched);
    }

    #[test]
    fn test_partial_tokens_recorded_when_unmatched() {
        let outcome = lexical_matcher().match_skills(
            &skills(&["Spring Boot"]),
            "Java and Spring MVC",
            None,
        );
        let detail = &outcome.per_skill[0];
        assert!(!detail.matched);
        assert_eq!(detail.method, MatchMethod::None);
        assert_eq!(
            detail.tokens_matched,
            BTreeSet::from(["spring".to_string()])
        );
        assert!(outcome.matched.is_empty());
    }

    #[test]
    fn test_blank_skills_are_skipped() {
        let outcome = lexical_matcher().match_skills(
            &skills(&["", "  ", "SQL"]),
            "Wrote SQL daily",
            None,
        );
        assert_eq!(outcome.per_skill.len(), 1);
        assert_eq!(outcome.matched, vec!["SQL"]);
    }

    #[test]
    fn test_skill_reported_as_written() {
        let outcome = lexical_matcher().match_skills(
            &skills(&[" Docker ", "Kubernetes\n"]),
            "docker and kubernetes",
            None,
        );
        assert_eq!(outcome.matched, vec![" Docker ", "Kubernetes\n"]);
        assert_eq!(outcome.per_skill[0].skill, " Docker ");
        assert_eq!(outcome.per_skill[0].method, MatchMethod::Substring);
    }

    #[test]
    fn test_matched_preserves_job_order() {
        let outcome = lexical_matcher().match_skills(
            &skills(&["Docker", "Go", "AWS"]),
            "aws, docker and go",
            None,
        );
        assert_eq!(outcome.matched, vec!["Docker", "Go", "AWS"]);
    }

    #[test]
    fn test_precomputed_embedding_match() {
        let matcher = keyword_matcher(0.62);
        let precomputed = vec![vec![1.0, 0.0]];
        let outcome = matcher.match_skills(
            &skills(&["Systems language"]),
            "I write Rust",
            Some(&precomputed),
        );
        let detail = &outcome.per_skill[0];
        assert!(detail.matched);
        assert_eq!(detail.method, MatchMethod::SemanticPrecomputed);
        assert_eq!(detail.similarity, Some(1.0));
    }

    #[test]
    fn test_on_the_fly_used_when_precomputed_missing() {
        let matcher = keyword_matcher(0.62);
        let outcome = matcher.match_skills(&skills(&["Kubernetes"]), "kubernetes operator", None);
        assert_eq!(outcome.per_skill[0].method, MatchMethod::SemanticOnTheFly);
    }

    #[test]
    fn test_short_precomputed_list_falls_back_on_the_fly() {
        let matcher = keyword_matcher(0.62);
        let precomputed = vec![vec![1.0, 0.0]];
        let outcome = matcher.match_skills(
            &skills(&["Rust", "Kubernetes"]),
            "rust on kubernetes",
            Some(&precomputed),
        );
        assert_eq!(outcome.per_skill[0].method, MatchMethod::SemanticPrecomputed);
        assert_eq!(outcome.per_skill[1].method, MatchMethod::SemanticOnTheFly);
    }

    #[test]
    fn test_below_threshold_falls_through_to_substring() {
        // Resume has both keywords → cos([0,1],[1,1]) ≈ 0.707 < 0.9
        let matcher = keyword_matcher(0.9);
        let precomputed = vec![vec![0.0, 1.0]];
        let outcome = matcher.match_skills(
            &skills(&["Kubernetes"]),
            "rust and kubernetes",
            Some(&precomputed),
        );
        let detail = &outcome.per_skill[0];
        assert!(detail.matched);
        assert_eq!(detail.method, MatchMethod::Substring);
        let sim = detail.similarity.unwrap();
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_misaligned_embedding_dimension_is_ignored() {
        let matcher = keyword_matcher(0.62);
        let precomputed = vec![vec![1.0, 0.0, 0.0]];
        let outcome = matcher.match_skills(&skills(&["Rust"]), "rust", Some(&precomputed));
        // mismatch scores 0.0, then the on-the-fly vector matches
        assert_eq!(outcome.per_skill[0].method, MatchMethod::SemanticOnTheFly);
    }

    #[test]
    fn test_unmatched_skill_reports_semantic_similarity() {
        let matcher = keyword_matcher(0.62);
        let outcome = matcher.match_skills(&skills(&["Haskell"]), "rust", None);
        let detail = &outcome.per_skill[0];
        assert!(!detail.matched);
        assert_eq!(detail.similarity, Some(0.0));
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(MatchMethod::SemanticOnTheFly.as_str(), "semantic_on_the_fly");
        assert_eq!(
            serde_json::to_string(&MatchMethod::TokensAll).unwrap(),
            r#""tokens_all""#
        );
        assert!(MatchMethod::SemanticPrecomputed.is_semantic());
        assert!(!MatchMethod::Substring.is_semantic());
    }
}
