#![recursion_limit = "256"]

// ============================================================
// face_emotion — facial emotion classification
// ============================================================
// Layers, outermost first:
//
//   1. cli          clap subcommands (train, predict, inspect, serve)
//   2. application  TrainUseCase, InferenceService, axum routes
//   3. domain       samples, vocabulary, predictions, traits
//   4. data         corpus scan, split, preprocessing, batching
//   5. ml           EmotionNet, trainer, inferencer, face detection
//   6. infra        checkpoints and metrics on disk
//
// The two library entry points are `train` and
// `InferenceService::predict`.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;

pub use application::inference_service::{InferenceService, ServiceConfig};
pub use application::train_use_case::{TrainConfig, TrainUseCase};
pub use domain::prediction::{NoFacePolicy, Prediction};
pub use domain::vocabulary::LabelVocabulary;
pub use error::{EmotionError, Result};
pub use ml::trainer::TrainingReport;

/// Train on `config.dataset_dir` and leave the best checkpoint in
/// `config.checkpoint_dir`.
pub fn train(config: &TrainConfig) -> Result<TrainingReport> {
    TrainUseCase::new(config.clone()).execute()
}
