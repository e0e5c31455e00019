//! Experience Estimator: approximate years of experience from free text.
//!
//! Heuristic, first match wins:
//! 1. "4 years", "10+ years"
//! 2. year ranges such as "2018-2021" (years starting with 20)
//! 3. spelled-out "one" … "ten" followed by "year(s)"
//!
//! Nothing found means 0 years.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_NUMERIC_YEARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2})\s*\+?\s*years?").unwrap());

static RE_YEAR_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20[0-9]{2})\s*[-–—]\s*(20[0-9]{2})").unwrap());

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

/// Checked in numeric order, not text order: "five years … two years" yields 2.
static RE_WORD_YEARS: Lazy<Vec<(Regex, u32)>> = Lazy::new(|| {
    NUMBER_WORDS
        .iter()
        .map(|(word, value)| {
            (
                Regex::new(&format!(r"\b{word}\s+years?\b")).unwrap(),
                *value,
            )
        })
        .collect()
});

/// Which heuristic produced the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearsSource {
    Numeric,
    YearRange,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearsEstimate {
    pub years: u32,
    pub source: YearsSource,
}

/// Extracts the first years-of-experience signal, or `None` if no pattern matches.
pub fn estimate_years(resume_text: &str) -> Option<YearsEstimate> {
    let text = resume_text.to_lowercase();

    if let Some(years) = RE_NUMERIC_YEARS
        .captures(&text)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        return Some(YearsEstimate {
            years,
            source: YearsSource::Numeric,
        });
    }

    if let Some(caps) = RE_YEAR_RANGE.captures(&text) {
        if let (Ok(start), Ok(end)) = (caps[1].parse::<i64>(), caps[2].parse::<i64>()) {
            return Some(YearsEstimate {
                years: (end - start).max(0) as u32,
                source: YearsSource::YearRange,
            });
        }
    }

    RE_WORD_YEARS
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, years)| YearsEstimate {
            years: *years,
            source: YearsSource::Word,
        })
}

/// Experience score in [0, 1].
///
/// An unconstrained job (`min_years_required == 0`) always scores 1.0. A
/// constrained job with no detectable experience scores 0.0.
pub fn experience_score(min_years_required: u32, resume_text: &str) -> f64 {
    if min_years_required == 0 {
        return 1.0;
    }
    let years = estimate_years(resume_text).map(|e| e.years).unwrap_or(0);
    (years as f64 / min_years_required as f64).min(1.0)
}
