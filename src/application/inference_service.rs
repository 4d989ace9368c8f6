// ============================================================
// Layer 2 — Inference Service
// ============================================================
// One synchronous call per uploaded image:
//
//   bytes ─► decode ─► FaceLocalizer ─┬─ face ─► Preprocessor ─► EmotionNet ─► softmax
//                                     └─ none ─► NoFacePolicy
//
// Built once at startup (checkpoint verified, detector loaded)
// and never mutated afterwards; share it behind an Arc.
//
// Errors per call:
//   Input      — the bytes are not a decodable image
//   Inference  — the forward pass produced garbage
// "No face" is not an error.

use std::path::PathBuf;

use crate::data::preprocessor::Preprocessor;
use crate::domain::{
    prediction::{NoFacePolicy, Prediction},
    traits::FaceLocalizer,
    vocabulary::LabelVocabulary,
};
use crate::error::{EmotionError, Result};
use crate::infra::checkpoint::{CheckpointManager, CheckpointMetadata};
use crate::ml::{
    inferencer::Inferencer,
    localizer::{DetectorParams, FullFrameLocalizer, RustfaceLocalizer},
    model::EmotionNet,
    Device, InferBackend,
};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub checkpoint_dir: PathBuf,
    /// Vocabulary the checkpoint must have been trained with
    pub labels:         Vec<String>,
    pub neutral_label:  String,
    pub no_face_policy: NoFacePolicy,
    /// SeetaFace model for rustface; None classifies the full frame
    pub detector:       Option<PathBuf>,
    pub detection:      DetectorParams,
}

pub struct InferenceService {
    inferencer:   Inferencer<InferBackend>,
    localizer:    Box<dyn FaceLocalizer>,
    preprocessor: Preprocessor,
    vocabulary:   LabelVocabulary,
    policy:       NoFacePolicy,
    metadata:     Option<CheckpointMetadata>,
}

impl InferenceService {
    /// Load and verify everything up front. Any error here means the
    /// service must not start.
    pub fn load(cfg: &ServiceConfig) -> Result<Self> {
        let vocabulary = LabelVocabulary::new(cfg.labels.as_slice(), &cfg.neutral_label)?;

        let ckpt = CheckpointManager::open(&cfg.checkpoint_dir);
        let (inferencer, metadata) = Inferencer::from_checkpoint(&ckpt, &vocabulary, Device::default())?;

        let localizer: Box<dyn FaceLocalizer> = match &cfg.detector {
            Some(path) => Box::new(RustfaceLocalizer::from_file(path, cfg.detection)?),
            None => {
                tracing::warn!("Face detection disabled, classifying whole images");
                Box::new(FullFrameLocalizer)
            }
        };

        Ok(Self {
            inferencer,
            localizer,
            preprocessor: Preprocessor::new(),
            vocabulary,
            policy: cfg.no_face_policy,
            metadata: Some(metadata),
        })
    }

    /// Assemble a service from an in-memory model.
    pub fn from_parts(
        model:      EmotionNet<InferBackend>,
        vocabulary: LabelVocabulary,
        localizer:  Box<dyn FaceLocalizer>,
        policy:     NoFacePolicy,
    ) -> Result<Self> {
        if model.num_classes() != vocabulary.len() {
            return Err(EmotionError::mismatch(format!(
                "model has {} outputs for {} labels",
                model.num_classes(),
                vocabulary.len()
            )));
        }
        Ok(Self {
            inferencer: Inferencer::new(model, Device::default()),
            localizer,
            preprocessor: Preprocessor::new(),
            vocabulary,
            policy,
            metadata: None,
        })
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    /// Metadata of the loaded checkpoint, None for `from_parts`.
    pub fn metadata(&self) -> Option<&CheckpointMetadata> {
        self.metadata.as_ref()
    }

    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction> {
        let image = self.preprocessor.decode(image_bytes)?;

        let Some(face) = self.localizer.detect(&image) else {
            tracing::debug!("No face detected, policy {:?}", self.policy);
            return Ok(match self.policy {
                NoFacePolicy::Neutral => Prediction::Fallback {
                    label: self.vocabulary.neutral_label().to_string(),
                },
                NoFacePolicy::Report => Prediction::NoFaceDetected,
            });
        };

        let tensor = self.preprocessor.transform(&image, Some(face));
        let score  = self.inferencer.classify(tensor)?;
        let label  = self
            .vocabulary
            .name(score.index)
            .ok_or_else(|| EmotionError::inference(format!("class index {} has no label", score.index)))?;

        Ok(Prediction::Classified {
            label:      label.to_string(),
            confidence: score.confidence,
            face,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    use crate::domain::bbox::BoundingBox;
    use crate::ml::model::EmotionNetConfig;

    struct NoFace;

    impl FaceLocalizer for NoFace {
        fn detect(&self, _image: &DynamicImage) -> Option<BoundingBox> {
            None
        }
    }

    fn service(localizer: Box<dyn FaceLocalizer>, policy: NoFacePolicy) -> InferenceService {
        let vocabulary = LabelVocabulary::new(&["happy", "neutral", "sad"], "neutral").unwrap();
        let model      = EmotionNetConfig::new(3, vec![4], 8).init(&Device::default());
        InferenceService::from_parts(model, vocabulary, localizer, policy).unwrap()
    }

    fn png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 30, |x, y| Rgb([x as u8 * 8, y as u8 * 8, 77])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn classified_prediction_has_vocabulary_label() {
        let svc = service(Box::new(FullFrameLocalizer), NoFacePolicy::Neutral);
        let p   = svc.predict(&png()).unwrap();
        assert!(p.face_detected());
        assert!(svc.vocabulary().index_of(p.label().unwrap()).is_some());
        assert!((0.0..=1.0).contains(&p.confidence()));
    }

    #[test]
    fn no_face_falls_back_to_neutral() {
        let svc = service(Box::new(NoFace), NoFacePolicy::Neutral);
        let p   = svc.predict(&png()).unwrap();
        assert_eq!(p, Prediction::Fallback { label: "neutral".into() });
        assert_eq!(p.confidence(), 0.0);
    }

    #[test]
    fn no_face_can_be_reported() {
        let svc = service(Box::new(NoFace), NoFacePolicy::Report);
        assert_eq!(svc.predict(&png()).unwrap(), Prediction::NoFaceDetected);
    }

    #[test]
    fn malformed_bytes_are_input_errors() {
        let svc = service(Box::new(FullFrameLocalizer), NoFacePolicy::Neutral);
        let err = svc.predict(b"GIF89a but not really").unwrap_err();
        assert!(matches!(err, EmotionError::Input(_)));
        // the service keeps serving
        assert!(svc.predict(&png()).is_ok());
    }

    #[test]
    fn output_width_must_match_vocabulary() {
        let vocabulary = LabelVocabulary::standard();
        let model      = EmotionNetConfig::new(3, vec![4], 8).init(&Device::default());
        let result = InferenceService::from_parts(model, vocabulary, Box::new(FullFrameLocalizer), NoFacePolicy::Neutral);
        assert!(matches!(result, Err(EmotionError::CheckpointMismatch(_))));
    }
}
