// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers. The trainer and the inference service
// only see these traits, so a corpus or detector can be swapped
// without touching the code that drives them.
//
//   SampleSource  ← LabeledImageCorpus
//   FaceLocalizer ← RustfaceLocalizer, FullFrameLocalizer

use image::DynamicImage;

use crate::domain::{bbox::BoundingBox, sample::Sample};

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Anything that yields labelled image samples.
pub trait SampleSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Random access to sample `index`, None when out of range.
    fn sample(&self, index: usize) -> Option<&Sample>;
}

// ─── FaceLocalizer ────────────────────────────────────────────────────────────
/// Finds the primary face in a decoded image.
///
/// Implementations must be usable from several threads at once
/// through a shared reference; any scratch buffers are call-local.
pub trait FaceLocalizer: Send + Sync {
    /// The most prominent face, or None when no face is found.
    /// None is a normal outcome, not an error.
    fn detect(&self, image: &DynamicImage) -> Option<BoundingBox>;
}

