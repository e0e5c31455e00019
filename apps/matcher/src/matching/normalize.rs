//! Text normalization for lexical comparison.
//!
//! Skill phrases and resume bodies go through the same function so that
//! substring and token checks are case- and punctuation-insensitive
//! ("Node.js" and "node js" both become `node js`).

use once_cell::sync::Lazy;
use regex::Regex;

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\W_]+").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lower-cases, turns every run of non-word characters (and underscores) into a
/// single space, collapses whitespace and trims. Empty input yields `""`.
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let lowered = text.to_lowercase();
    let spaced = RE_NON_WORD.replace_all(&lowered, " ");
    RE_SPACES.replace_all(&spaced, " ").trim().to_string()
}

/// Whitespace tokens of the normalized text.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_collapses_to_single_space() {
        assert_eq!(normalize("Node.js"), "node js");
        assert_eq!(normalize("node js"), "node js");
        assert_eq!(normalize("C++ / C#"), "c c");
    }

    #[test]
    fn test_underscores_are_separators() {
        assert_eq!(normalize("snake_case__name"), "snake case name");
    }

    #[test]
    fn test_whitespace_is_collapsed_and_trimmed() {
        assert_eq!(normalize("  React,\n\tDocker  "), "react docker");
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n"), "");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_unicode_letters_survive() {
        assert_eq!(normalize("Café-Bar"), "café bar");
    }

    #[test]
    fn test_tokens_split_normalized_text() {
        assert_eq!(tokens("Spring-Boot, SQL"), vec!["spring", "boot", "sql"]);
        assert!(tokens("").is_empty());
    }
}
