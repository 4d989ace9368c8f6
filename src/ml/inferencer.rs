// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Holds one loaded EmotionNet on the inference backend and runs
// single-image forward passes:
//
//   FaceTensor → [1, 3, S, S] → logits → softmax → (argmax, p)
//
// burn modules are Send but not Sync, so the model sits behind a
// Mutex. Each call clones it under the lock (parameters are
// reference counted) and runs the forward pass outside the lock;
// concurrent callers never wait on each other's computation.

use std::sync::Mutex;

use burn::{prelude::*, tensor::activation::softmax};

use crate::data::{batcher::stack_images, preprocessor::FaceTensor};
use crate::domain::vocabulary::LabelVocabulary;
use crate::error::{EmotionError, Result};
use crate::infra::checkpoint::{CheckpointManager, CheckpointMetadata};
use crate::ml::model::EmotionNet;

/// Winning class index and its softmax probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScore {
    pub index:      usize,
    pub confidence: f32,
}

pub struct Inferencer<B: Backend> {
    model:  Mutex<EmotionNet<B>>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: EmotionNet<B>, device: B::Device) -> Self {
        Self { model: Mutex::new(model), device }
    }

    /// Load and verify the checkpoint in `ckpt` against `expected`.
    pub fn from_checkpoint(
        ckpt:     &CheckpointManager,
        expected: &LabelVocabulary,
        device:   B::Device,
    ) -> Result<(Self, CheckpointMetadata)> {
        let (model, meta) = ckpt.load::<B>(expected, &device)?;
        Ok((Self::new(model, device), meta))
    }

    pub fn classify(&self, face: FaceTensor) -> Result<ClassScore> {
        let model = self
            .model
            .lock()
            .map_err(|_| EmotionError::inference("model lock poisoned by an earlier panic"))?
            .clone();

        let images = stack_images::<B>(vec![face], &self.device);
        let logits = model.forward(images);
        top_class(logits)
    }
}

/// Softmax over the single row of `logits` and pick the best class.
/// Ties resolve to the lowest index.
pub fn top_class<B: Backend>(logits: Tensor<B, 2>) -> Result<ClassScore> {
    let [rows, classes] = logits.dims();
    if rows != 1 || classes == 0 {
        return Err(EmotionError::inference(format!(
            "expected logits of shape [1, n], got [{rows}, {classes}]"
        )));
    }

    let probs: Vec<f32> = softmax(logits, 1)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| EmotionError::inference(format!("cannot read probabilities: {e:?}")))?;

    if probs.iter().any(|p| !p.is_finite()) {
        return Err(EmotionError::inference("forward pass produced non-finite probabilities"));
    }

    let (index, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

    tracing::debug!("Softmax {:?} → class {} ({:.4})", probs, index, confidence);
    Ok(ClassScore { index, confidence: confidence.clamp(0.0, 1.0) })
}
