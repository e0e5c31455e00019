//! Evidence highlights: which resume sentences back each skill decision.
//!
//! Feeds the recruiter-facing explanation view; a pure function over the
//! report's per-skill detail and the resume text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::matching::normalize::normalize;
use crate::matching::skills::{MatchMethod, SkillMatchDetail};

static RE_SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?]+)\s+|\s*\n\s*").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillHighlight {
    pub skill: String,
    pub method: MatchMethod,
    pub sentences: Vec<String>,
}

/// Splits after `.`, `!`, `?` (when followed by whitespace) and at newlines.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for caps in RE_SENTENCE_BREAK.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let end = caps.get(1).map_or(whole.start(), |p| p.end());
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = whole.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// For each skill, the resume sentences containing the skill phrase or any of
/// its matched tokens. Skills without a supporting sentence are left out.
pub fn highlight_evidence(resume_text: &str, per_skill: &[SkillMatchDetail]) -> Vec<SkillHighlight> {
    let sentences: Vec<(&str, String)> = split_sentences(resume_text)
        .into_iter()
        .map(|s| (s, normalize(s)))
        .collect();

    per_skill
        .iter()
        .filter_map(|detail| {
            let mut needles: Vec<String> = detail
                .tokens_matched
                .iter()
                .map(|t| normalize(t))
                .collect();
            needles.push(normalize(&detail.skill));
            needles.retain(|n| !n.is_empty());

            let hits: Vec<String> = sentences
                .iter()
                .filter(|(_, norm)| needles.iter().any(|n| norm.contains(n.as_str())))
                .map(|(raw, _)| raw.to_string())
                .collect();

            (!hits.is_empty()).then(|| SkillHighlight {
                skill: detail.skill.clone(),
                method: detail.method,
                sentences: hits,
            })
        })
        .collect()
}
