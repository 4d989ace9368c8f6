// ============================================================
// Layer 3 — Prediction
// ============================================================
// The outcome of classifying one uploaded image.
//
// "No face" is not an error. Depending on NoFacePolicy it is
// either folded into the neutral label with confidence 0.0
// (Fallback) or reported as its own outcome (NoFaceDetected).

use serde::{Deserialize, Serialize};

use crate::domain::bbox::BoundingBox;
use crate::error::{EmotionError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Prediction {
    Classified {
        label:      String,
        confidence: f32,
        face:       BoundingBox,
    },
    Fallback {
        label: String,
    },
    NoFaceDetected,
}

impl Prediction {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Classified { label, .. } | Self::Fallback { label } => Some(label),
            Self::NoFaceDetected => None,
        }
    }

    /// Softmax probability of the predicted label, in [0, 1].
    pub fn confidence(&self) -> f32 {
        match self {
            Self::Classified { confidence, .. } => *confidence,
            _ => 0.0,
        }
    }

    pub fn face_detected(&self) -> bool {
        matches!(self, Self::Classified { .. })
    }
}

/// What `predict` reports when the localizer finds no face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoFacePolicy {
    /// Report the neutral label with confidence 0.0.
    #[default]
    Neutral,
    /// Report `Prediction::NoFaceDetected`.
    Report,
}

impl std::str::FromStr for NoFacePolicy {
    type Err = EmotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "report"  => Ok(Self::Report),
            other => Err(EmotionError::configuration(format!(
                "unknown no-face policy '{other}' (expected 'neutral' or 'report')"
            ))),
        }
    }
}
