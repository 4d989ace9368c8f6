// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn model code lives here, next to the face detector
// that runs in front of it at inference time.
//
//   model.rs      — EmotionNet: conv stages + fully-connected head
//   trainer.rs    — epoch loop, validation, best-only checkpointing
//   inferencer.rs — loaded model → (class index, softmax confidence)
//   localizer.rs  — rustface detector, full-frame fallback, face selection
//
// Backends: NdArray on the CPU by default, Wgpu with the `wgpu`
// feature. Training wraps the backend in Autodiff; validation and
// inference use the plain backend, so dropout is inert there.

/// CNN emotion classifier
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Checkpoint-backed forward pass for single images
pub mod inferencer;

/// Face localizers
pub mod localizer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub type Device = <InferBackend as burn::tensor::backend::Backend>::Device;
