// ============================================================
// Layer 3 — Label Vocabulary
// ============================================================
// The ordered list of emotion names a model is trained against.
// Position i is bound to output logit i, so the order must be
// identical at training and serving time. The vocabulary is
// stored inside every checkpoint and compared when the
// checkpoint is loaded.
//
// One label is designated "neutral"; it is the fallback label
// reported when no face is found in an image.

use crate::error::{EmotionError, Result};

/// Eight-class vocabulary the training corpus is named with.
pub const STANDARD_LABELS: [&str; 8] = [
    "anger", "contempt", "disgust", "fear",
    "happy", "neutral", "sad", "surprised",
];

pub const STANDARD_NEUTRAL: &str = "neutral";

/// Only built through `new` or `standard`, so the invariants
/// above always hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    names:   Vec<String>,
    neutral: usize,
}

impl LabelVocabulary {
    /// Build a vocabulary from an ordered list of names.
    ///
    /// Names are lower-cased so lookups are case-insensitive.
    /// Fails if fewer than two names are given, a name repeats,
    /// or `neutral` is not one of the names.
    pub fn new<S: AsRef<str>>(names: &[S], neutral: &str) -> Result<Self> {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .collect();

        if names.len() < 2 {
            return Err(EmotionError::configuration(format!(
                "label vocabulary needs at least 2 labels, got {}",
                names.len()
            )));
        }
        if let Some(empty) = names.iter().position(|n| n.is_empty()) {
            return Err(EmotionError::configuration(format!(
                "label vocabulary entry {empty} is empty"
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(EmotionError::configuration(format!(
                    "label '{name}' appears more than once in the vocabulary"
                )));
            }
        }

        let neutral_name = neutral.trim().to_lowercase();
        let neutral = names
            .iter()
            .position(|n| *n == neutral_name)
            .ok_or_else(|| {
                EmotionError::configuration(format!(
                    "neutral label '{neutral_name}' is not in the vocabulary [{}]",
                    names.join(", ")
                ))
            })?;

        Ok(Self { names, neutral })
    }

    /// The eight-class vocabulary with "neutral" as the fallback.
    pub fn standard() -> Self {
        Self {
            names:   STANDARD_LABELS.iter().map(|s| s.to_string()).collect(),
            neutral: 5,
        }
    }

    /// Index of `name`, matched case-insensitively.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.names.iter().position(|n| *n == name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn neutral_label(&self) -> &str {
        &self.names[self.neutral]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
