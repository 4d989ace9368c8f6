// ============================================================
// Layer 5 — Face Localizers
// ============================================================
//   RustfaceLocalizer  — SeetaFace funnel cascade (rustface) on
//                        the grayscale image; the default
//   FullFrameLocalizer — the whole image is the face; opt-in for
//                        pre-cropped inputs, matches how training
//                        images are seen (uncropped)
//
// Only one face is classified per image. When the detector finds
// several, the largest box wins and equal areas keep detector
// order (first one returned).

use std::path::Path;

use image::DynamicImage;
use rustface::{Detector, FaceInfo, ImageData, Model};

use crate::domain::{bbox::BoundingBox, traits::FaceLocalizer};
use crate::error::{EmotionError, Result};

/// rustface refuses windows smaller than this.
pub const MIN_FACE_SIZE: u32 = 20;

/// Largest box after clipping to the image; ties keep the earliest.
pub fn select_primary(
    boxes:  impl IntoIterator<Item = BoundingBox>,
    width:  u32,
    height: u32,
) -> Option<BoundingBox> {
    boxes
        .into_iter()
        .filter_map(|b| b.clip(width, height))
        .fold(None, |best: Option<BoundingBox>, b| match best {
            Some(current) if current.area() >= b.area() => Some(current),
            _ => Some(b),
        })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FullFrameLocalizer;

impl FaceLocalizer for FullFrameLocalizer {
    fn detect(&self, image: &DynamicImage) -> Option<BoundingBox> {
        BoundingBox::full(image.width(), image.height()).clip(image.width(), image.height())
    }
}

// ─── Rustface ─────────────────────────────────────────────────────────────────
/// Detector tuning. rustface panics on out-of-range values, so they
/// are checked here before a detector is ever built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Smallest face side in pixels, at least MIN_FACE_SIZE
    pub min_face_size:  u32,
    /// Classifier score a window needs to count as a face
    pub score_thresh:   f64,
    /// Image pyramid step, in (0, 1)
    pub pyramid_scale:  f32,
    /// Sliding window stride in pixels
    pub window_step:    u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self { min_face_size: MIN_FACE_SIZE, score_thresh: 2.0, pyramid_scale: 0.8, window_step: 4 }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_face_size < MIN_FACE_SIZE {
            return Err(EmotionError::configuration(format!(
                "min face size must be at least {MIN_FACE_SIZE}, got {}", self.min_face_size
            )));
        }
        if !(self.score_thresh.is_finite() && self.score_thresh > 0.0) {
            return Err(EmotionError::configuration(format!(
                "detector score threshold must be > 0, got {}", self.score_thresh
            )));
        }
        if !(0.01..=0.99).contains(&self.pyramid_scale) {
            return Err(EmotionError::configuration(format!(
                "pyramid scale must lie in [0.01, 0.99], got {}", self.pyramid_scale
            )));
        }
        if self.window_step == 0 {
            return Err(EmotionError::configuration("window step must be > 0"));
        }
        Ok(())
    }
}

/// Keeps the parsed SeetaFace model and builds a detector per call:
/// rustface detectors carry mutable scratch state and are not Send.
#[derive(Clone)]
pub struct RustfaceLocalizer {
    model:  Model,
    params: DetectorParams,
}

impl std::fmt::Debug for RustfaceLocalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustfaceLocalizer").field("params", &self.params).finish_non_exhaustive()
    }
}

impl RustfaceLocalizer {
    pub fn new(model: Model, params: DetectorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { model, params })
    }

    /// Load a model such as `seeta_fd_frontal_v1.0.bin`.
    pub fn from_file(path: impl AsRef<Path>, params: DetectorParams) -> Result<Self> {
        let path  = path.as_ref();
        let model = rustface::load_model(&path.to_string_lossy()).map_err(|e| {
            EmotionError::configuration(format!("cannot load face detector '{}': {e}", path.display()))
        })?;
        tracing::info!("Loaded face detector '{}' ({:?})", path.display(), params);
        Self::new(model, params)
    }

    fn detector(&self) -> Box<dyn Detector> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.params.min_face_size);
        detector.set_score_thresh(self.params.score_thresh);
        detector.set_pyramid_scale_factor(self.params.pyramid_scale);
        detector.set_slide_window_step(self.params.window_step, self.params.window_step);
        detector
    }
}

fn to_bbox(face: &FaceInfo) -> BoundingBox {
    let r = face.bbox();
    BoundingBox::new(r.x(), r.y(), r.width(), r.height())
}

impl FaceLocalizer for RustfaceLocalizer {
    fn detect(&self, image: &DynamicImage) -> Option<BoundingBox> {
        let (width, height) = (image.width(), image.height());
        // nothing fits, and rustface panics on empty images
        if width.min(height) < self.params.min_face_size {
            return None;
        }

        let gray  = image.to_luma8();
        let faces = self.detector().detect(&ImageData::new(gray.as_raw(), width, height));
        if faces.len() > 1 {
            tracing::debug!("{} faces found, classifying the largest", faces.len());
        }
        select_primary(faces.iter().map(to_bbox), width, height)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const SEETA_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/models/seeta_fd_frontal_v1.0.bin");

    #[test]
    fn largest_box_wins() {
        let boxes = [BoundingBox::new(0, 0, 10, 10), BoundingBox::new(20, 20, 30, 30)];
        assert_eq!(select_primary(boxes, 100, 100), Some(BoundingBox::new(20, 20, 30, 30)));
    }

    #[test]
    fn equal_areas_keep_detector_order() {
        let boxes = [BoundingBox::new(0, 0, 20, 10), BoundingBox::new(50, 50, 10, 20)];
        assert_eq!(select_primary(boxes, 100, 100), Some(BoundingBox::new(0, 0, 20, 10)));
    }

    #[test]
    fn area_is_compared_after_clipping() {
        // mostly outside: clipped to 5x40 = 200 < 15x15 = 225
        let boxes = [BoundingBox::new(95, 0, 40, 40), BoundingBox::new(0, 0, 15, 15)];
        assert_eq!(select_primary(boxes, 100, 100), Some(BoundingBox::new(0, 0, 15, 15)));
        assert_eq!(select_primary([BoundingBox::new(500, 500, 5, 5)], 100, 100), None);
    }

    #[test]
    fn full_frame_covers_the_image() {
        let img = DynamicImage::new_rgb8(64, 48);
        assert_eq!(FullFrameLocalizer.detect(&img), Some(BoundingBox::full(64, 48)));
    }

    #[test]
    fn blank_image_has_no_face() {
        let localizer = RustfaceLocalizer::from_file(SEETA_MODEL, DetectorParams::default()).unwrap();
        let flat      = DynamicImage::ImageLuma8(GrayImage::from_pixel(160, 120, Luma([128])));
        assert_eq!(localizer.detect(&flat), None);
    }

    #[test]
    fn images_smaller_than_a_face_are_skipped() {
        let localizer = RustfaceLocalizer::from_file(SEETA_MODEL, DetectorParams::default()).unwrap();
        assert_eq!(localizer.detect(&DynamicImage::new_luma8(12, 300)), None);
        assert_eq!(localizer.detect(&DynamicImage::new_luma8(0, 0)), None);
    }

    #[test]
    fn missing_model_is_a_configuration_error() {
        let err = RustfaceLocalizer::from_file("no/such/model.bin", DetectorParams::default()).unwrap_err();
        assert!(matches!(err, EmotionError::Configuration(_)));
    }

    #[test]
    fn out_of_range_params_are_rejected() {
        let bad = [
            DetectorParams { min_face_size: 10, ..DetectorParams::default() },
            DetectorParams { score_thresh: 0.0, ..DetectorParams::default() },
            DetectorParams { pyramid_scale: 1.2, ..DetectorParams::default() },
            DetectorParams { window_step: 0, ..DetectorParams::default() },
        ];
        for params in bad {
            assert!(params.validate().is_err(), "{params:?}");
        }
        assert!(DetectorParams::default().validate().is_ok());
    }
}
