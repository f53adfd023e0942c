//! Suggestion metadata produced by the suggestion engine.

use serde::{Deserialize, Serialize};

/// A single completion candidate.
///
/// The core emits text-only suggestions; platform adapters that support rich
/// completion attach a tooltip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suggestion {
    /// The text to insert when the suggestion is accepted.
    pub text: String,
    /// Optional hover/tooltip text supplied by adapters.
    pub tooltip: Option<String>,
}

impl Suggestion {
    /// Text-only suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tooltip: None,
        }
    }

    /// Suggestion carrying tooltip text.
    pub fn with_tooltip(text: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tooltip: Some(tooltip.into()),
        }
    }

    /// Convert an iterator of strings into text-only suggestions.
    pub fn all(texts: impl IntoIterator<Item = impl Into<String>>) -> Vec<Suggestion> {
        texts.into_iter().map(Suggestion::new).collect()
    }
}

/// Remove duplicate suggestion texts while preserving first-seen order.
pub fn dedupe_suggestions(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = std::collections::HashSet::new();
    suggestions
        .into_iter()
        .filter(|suggestion| seen.insert(suggestion.text.clone()))
        .collect()
}
