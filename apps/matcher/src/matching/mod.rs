// Matching engine: normalization, embeddings, skill matching, experience,
// composite scoring and explainability.
// Callers hand in plain records (`JobProfile`, `CandidateProfile`) and get a
// score plus an explanation back; nothing here touches storage or the network.

pub mod embedding;
pub mod experience;
pub mod highlights;
#[cfg(feature = "fastembed")]
pub mod minilm;
pub mod normalize;
pub mod scorer;
pub mod similarity;
pub mod skills;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::matching::embedding::EmbeddingProvider;

/// Key under which precomputed skill vectors live in a job document.
pub const SKILL_EMBEDDINGS_KEY: &str = "skill_embeddings";

/// Job side of a comparison.
///
/// Deserialization is permissive: missing fields default, `null` skills become
/// empty strings (positions are kept so `skill_embeddings` stay aligned), and
/// the nested `{"requirements": {"required_skills", "min_experience"}}` shape
/// used by job records is accepted as well as the flat one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawJob")]
pub struct JobProfile {
    pub description: String,
    pub required_skills: Vec<String>,
    /// 0 means unconstrained.
    pub min_experience_years: u32,
    /// Positionally aligned with `required_skills`; may be shorter or longer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_embeddings: Option<Vec<Vec<f32>>>,
}

/// Candidate side of a comparison: the resume's extracted plain text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub resume_text: String,
}

/// Precomputes skill embeddings for a raw job document and stores them under
/// `skill_embeddings`, leaving every other key exactly as written.
///
/// Returns the number of stored vectors, or `None` when the backend is
/// unavailable; stale vectors are removed in that case since they may no longer
/// line up with the skills.
pub fn store_skill_embeddings(
    job: &mut Value,
    provider: &EmbeddingProvider,
) -> Result<Option<usize>, serde_json::Error> {
    let profile: JobProfile = serde_json::from_value(job.clone())?;
    let embeddings = provider.precompute_skill_embeddings(&profile.required_skills);
    let stored = embeddings.as_ref().map(Vec::len);

    if let Value::Object(map) = job {
        match embeddings {
            Some(vectors) => {
                map.insert(SKILL_EMBEDDINGS_KEY.to_string(), serde_json::to_value(vectors)?);
            }
            None => {
                map.remove(SKILL_EMBEDDINGS_KEY);
            }
        }
    }
    Ok(stored)
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawRequirements {
    #[serde(deserialize_with = "permissive_skills")]
    required_skills: Vec<String>,
    #[serde(alias = "min_experience", deserialize_with = "permissive_years")]
    min_experience_years: u32,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawJob {
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    #[serde(deserialize_with = "permissive_skills")]
    required_skills: Vec<String>,
    #[serde(alias = "min_experience", deserialize_with = "permissive_years")]
    min_experience_years: u32,
    skill_embeddings: Option<Vec<Vec<f32>>>,
    requirements: Option<RawRequirements>,
}

impl From<RawJob> for JobProfile {
    fn from(raw: RawJob) -> Self {
        let nested = raw.requirements.unwrap_or_default();
        JobProfile {
            description: raw.description,
            required_skills: if raw.required_skills.is_empty() {
                nested.required_skills
            } else {
                raw.required_skills
            },
            min_experience_years: if raw.min_experience_years == 0 {
                nested.min_experience_years
            } else {
                raw.min_experience_years
            },
            skill_embeddings: raw.skill_embeddings,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn permissive_skills<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let skills = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(skills.into_iter().map(Option::unwrap_or_default).collect())
}

/// Non-negative whole years; negatives, nulls and garbage become 0.
fn permissive_years<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let years = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(match years {
        Some(y) if y.is_finite() && y > 0.0 => y.floor().min(u32::MAX as f64) as u32,
        _ => 0,
    })
}
