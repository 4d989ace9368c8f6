// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the config            (Layer 2)
//   Step 2: Scan and label the corpus      (Layer 4 - data)
//   Step 3: Split train/validation         (Layer 4 - data)
//   Step 4: Build datasets                 (Layer 4 - data)
//   Step 5: Prepare checkpoint + metrics   (Layer 6 - infra)
//   Step 6: Run training loop              (Layer 5 - ml)
//
// Any failure in steps 1–5 aborts before the first epoch, so a
// bad config never leaves a partial checkpoint behind.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::{
    corpus::LabeledImageCorpus,
    dataset::SampleDataset,
    preprocessor::{CHANNELS, INPUT_SIZE},
    splitter::split_train_val,
};
use crate::domain::vocabulary::LabelVocabulary;
use crate::error::{EmotionError, Result};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    model::EmotionNetConfig,
    trainer::{run_training, TrainingReport},
    Device, TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every value is explicit; defaults live only in the CLI layer.
// Saved next to the checkpoint as train_config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_dir:    PathBuf,
    pub checkpoint_dir: PathBuf,
    pub batch_size:     usize,
    /// Fraction of samples used for training, in (0, 1)
    pub split_ratio:    f64,
    pub epochs:         usize,
    pub learning_rate:  f64,
    pub seed:           u64,
    /// Ordered vocabulary; position i is model output i
    pub labels:         Vec<String>,
    pub neutral_label:  String,
    pub conv_channels:  Vec<usize>,
    pub hidden_size:    usize,
    pub dropout:        f64,
}

impl TrainConfig {
    /// Reject anything that would fail later, before touching the disk.
    pub fn validate(&self) -> Result<()> {
        if self.dataset_dir.as_os_str().is_empty() {
            return Err(EmotionError::configuration("dataset directory is empty"));
        }
        if self.checkpoint_dir.as_os_str().is_empty() {
            return Err(EmotionError::configuration("checkpoint directory is empty"));
        }
        if self.batch_size == 0 {
            return Err(EmotionError::configuration("batch size must be at least 1"));
        }
        if self.epochs == 0 {
            return Err(EmotionError::configuration("epochs must be at least 1"));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(EmotionError::configuration(format!(
                "split ratio must be strictly between 0 and 1, got {}",
                self.split_ratio
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(EmotionError::configuration(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let vocabulary = self.vocabulary()?;
        self.model_config(vocabulary.len()).validate()
    }

    pub fn vocabulary(&self) -> Result<LabelVocabulary> {
        LabelVocabulary::new(self.labels.as_slice(), &self.neutral_label)
    }

    pub fn model_config(&self, num_classes: usize) -> EmotionNetConfig {
        EmotionNetConfig::new(num_classes, self.conv_channels.clone(), self.hidden_size)
            .with_dropout(self.dropout)
            .with_input_size(INPUT_SIZE)
            .with_in_channels(CHANNELS)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        let vocabulary = cfg.vocabulary()?;

        // ── Step 2: Scan corpus ───────────────────────────────────────────────
        let corpus = LabeledImageCorpus::scan(&cfg.dataset_dir, &vocabulary)?;
        let counts = corpus.class_counts(&vocabulary);
        tracing::info!("Found {} labelled samples", corpus.samples().len());
        for (name, count) in vocabulary.names().iter().zip(&counts) {
            tracing::info!("  {:<10} {}", name, count);
        }

        // ── Step 3: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) =
            split_train_val(corpus.samples().to_vec(), cfg.split_ratio, cfg.seed)?;
        tracing::info!(
            "Split: {} train, {} validation (seed {})",
            train_samples.len(),
            val_samples.len(),
            cfg.seed
        );

        // ── Step 4: Burn datasets ─────────────────────────────────────────────
        let train_dataset = SampleDataset::new(train_samples);
        let val_dataset   = SampleDataset::new(val_samples);

        // ── Step 5: Checkpoint dir, config, metrics ───────────────────────────
        let ckpt_manager = CheckpointManager::create(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::create(&cfg.checkpoint_dir)?;

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        let device = Device::default();
        tracing::info!("Training on device {:?}", device);
        run_training::<TrainBackend>(
            cfg,
            &vocabulary,
            train_dataset,
            val_dataset,
            &ckpt_manager,
            &metrics,
            &device,
        )
    }
}
