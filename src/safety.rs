//! Text sanitizer: redacts denylisted words before text leaves for the
//! summarizer.
//!
//! Matching is case-insensitive and anchored on word boundaries, so
//! "Sussex" or "hateful" pass through untouched while "SEX!" does not.

use regex::{NoExpand, Regex};

/// Token substituted for every redacted word.
pub const REDACTION_PLACEHOLDER: &str = "[redacted]";

/// Terms most likely to trip a hosted model's safety filter.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "sex",
    "nude",
    "naked",
    "sensual",
    "explicit",
    "violence",
    "hate",
    "racist",
    "torture",
];

/// Deterministic whole-word redactor.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    pattern: Option<Regex>,
}

impl Sanitizer {
    /// Create a sanitizer using [`DEFAULT_DENYLIST`].
    pub fn new() -> Self {
        Self::with_terms(DEFAULT_DENYLIST.iter().copied())
    }

    /// Create a sanitizer for a custom term list. Terms are matched literally.
    pub fn with_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Self {
        let alternation = terms
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");

        if alternation.is_empty() {
            return Self { pattern: None };
        }

        let pattern = match Regex::new(&format!(r"(?i)\b(?:{alternation})\b")) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Sanitizer pattern failed to compile, redaction disabled: {e}");
                None
            }
        };

        Self { pattern }
    }

    /// Replace every denylisted whole word with [`REDACTION_PLACEHOLDER`].
    pub fn sanitize(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => re
                .replace_all(text, NoExpand(REDACTION_PLACEHOLDER))
                .into_owned(),
            None => text.to_string(),
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}
