// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One labelled training image: where it lives on disk and the
// vocabulary index it was assigned at corpus-scan time.
//
// The label is fixed when the corpus is scanned and never
// changes afterwards. Two samples may share a path; each is
// still an independent sample.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Image file on disk
    pub image_path: PathBuf,

    /// Index into the LabelVocabulary the corpus was scanned with
    pub label: usize,
}

impl Sample {
    pub fn new(image_path: impl Into<PathBuf>, label: usize) -> Self {
        Self {
            image_path: image_path.into(),
            label,
        }
    }
}
