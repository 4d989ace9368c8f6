// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the best model of a training run and restores it for
// inference.
//
// Files in the checkpoint directory:
//
//   checkpoints/
//     model.mpk.gz        ← named MessagePack of every parameter
//     checkpoint.json     ← architecture, labels, normalisation,
//                           epoch and validation accuracy
//     train_config.json   ← the TrainConfig of the run
//     metrics.csv         ← written by MetricsLogger
//
// Both checkpoint files are written under a temporary name and
// renamed into place, metadata last, so a reader never sees a
// half-written file.
//
// Loading checks the metadata against what this build expects
// BEFORE the weights are touched. Any disagreement is a
// CheckpointMismatch, raised at load time rather than as a shape
// error on the first request.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, RecorderError},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::preprocessor::{CHANNELS, INPUT_SIZE, MEAN, STD};
use crate::domain::vocabulary::LabelVocabulary;
use crate::error::{EmotionError, Result};
use crate::ml::model::{EmotionNet, EmotionNetConfig};

/// Tag written into every checkpoint; bump when EmotionNet's layout changes.
pub const ARCHITECTURE: &str = "emotion-cnn-v1";

const MODEL_STEM:     &str = "model";
const MODEL_TMP_STEM: &str = "model_tmp";
const MODEL_EXT:      &str = "mpk.gz";
const METADATA_FILE:  &str = "checkpoint.json";
const CONFIG_FILE:    &str = "train_config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Everything needed to rebuild and validate a saved model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub architecture:  String,
    pub model:         EmotionNetConfig,
    pub labels:        Vec<String>,
    pub neutral_label: String,
    pub input_size:    usize,
    pub mean:          [f32; 3],
    pub std:           [f32; 3],
    pub epoch:         usize,
    /// Percentage in [0, 100]
    pub val_accuracy:  f64,
    pub num_params:    usize,
}

impl CheckpointMetadata {
    pub fn new(
        model:        EmotionNetConfig,
        vocabulary:   &LabelVocabulary,
        epoch:        usize,
        val_accuracy: f64,
        num_params:   usize,
    ) -> Self {
        Self {
            architecture:  ARCHITECTURE.to_string(),
            model,
            labels:        vocabulary.names().to_vec(),
            neutral_label: vocabulary.neutral_label().to_string(),
            input_size:    INPUT_SIZE,
            mean:          MEAN,
            std:           STD,
            epoch,
            val_accuracy,
            num_params,
        }
    }

    /// Vocabulary the checkpoint was trained against.
    pub fn vocabulary(&self) -> Result<LabelVocabulary> {
        LabelVocabulary::new(self.labels.as_slice(), &self.neutral_label)
            .map_err(|e| EmotionError::mismatch(format!("stored vocabulary is invalid: {e}")))
    }

    /// Checks that do not need the weights.
    pub fn verify(&self, expected: &LabelVocabulary) -> Result<()> {
        if self.architecture != ARCHITECTURE {
            return Err(EmotionError::mismatch(format!(
                "checkpoint architecture '{}' but this build expects '{ARCHITECTURE}'",
                self.architecture
            )));
        }
        if self.labels != expected.names() {
            return Err(EmotionError::mismatch(format!(
                "checkpoint labels {:?} differ from expected {:?}",
                self.labels,
                expected.names()
            )));
        }
        if self.neutral_label != expected.neutral_label() {
            return Err(EmotionError::mismatch(format!(
                "checkpoint neutral label '{}' differs from expected '{}'",
                self.neutral_label,
                expected.neutral_label()
            )));
        }
        if self.input_size != INPUT_SIZE
            || self.model.input_size != INPUT_SIZE
            || self.model.in_channels != CHANNELS
        {
            return Err(EmotionError::mismatch(format!(
                "checkpoint expects {}x{}x{} input, this build produces {CHANNELS}x{INPUT_SIZE}x{INPUT_SIZE}",
                self.model.in_channels, self.input_size, self.input_size
            )));
        }
        if self.mean != MEAN || self.std != STD {
            return Err(EmotionError::mismatch(
                "checkpoint was trained with different normalisation constants",
            ));
        }
        if self.model.num_classes != self.labels.len() {
            return Err(EmotionError::mismatch(format!(
                "model has {} outputs for {} labels",
                self.model.num_classes,
                self.labels.len()
            )));
        }
        self.model
            .validate()
            .map_err(|e| EmotionError::mismatch(format!("stored model config: {e}")))
    }
}

/// Manages saving and loading of the best checkpoint in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Manager for an existing checkpoint directory (inference side).
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Manager for a training run; creates the directory like `mkdir -p`.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            EmotionError::configuration(format!(
                "cannot create checkpoint directory '{}': {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{MODEL_STEM}.{MODEL_EXT}"))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.metadata_path().is_file()
    }

    /// Write weights and metadata to temp files, then rename the
    /// weights and, last, the metadata into place.
    pub fn save<B: Backend>(&self, model: EmotionNet<B>, meta: &CheckpointMetadata) -> Result<()> {
        let json = serde_json::to_string_pretty(meta)
            .map_err(|e| EmotionError::Checkpoint(format!("cannot serialise metadata: {e}")))?;

        // ── Temp files ────────────────────────────────────────────────────────
        // The recorder appends the extension itself.
        model
            .save_file(self.dir.join(MODEL_TMP_STEM), &CheckpointRecorder::new())
            .map_err(|e| EmotionError::Checkpoint(format!("cannot write model weights: {e}")))?;
        let meta_tmp = write_tmp(&self.metadata_path(), &json)?;

        // ── Commit: weights, then metadata ────────────────────────────────────
        fs::rename(
            self.dir.join(format!("{MODEL_TMP_STEM}.{MODEL_EXT}")),
            self.model_path(),
        )?;
        fs::rename(&meta_tmp, self.metadata_path())?;

        tracing::debug!(
            "Saved checkpoint: epoch {} val_accuracy={:.2}% → '{}'",
            meta.epoch,
            meta.val_accuracy,
            self.dir.display()
        );
        Ok(())
    }

    pub fn load_metadata(&self) -> Result<CheckpointMetadata> {
        let path = self.metadata_path();
        let json = fs::read_to_string(&path).map_err(|e| {
            EmotionError::Checkpoint(format!(
                "cannot read '{}' ({e}). Have you run 'train' first?",
                path.display()
            ))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            EmotionError::mismatch(format!("'{}' is not a checkpoint of this model: {e}", path.display()))
        })
    }

    /// Verify the metadata against `expected`, then load the weights.
    pub fn load<B: Backend>(
        &self,
        expected: &LabelVocabulary,
        device:   &B::Device,
    ) -> Result<(EmotionNet<B>, CheckpointMetadata)> {
        let meta = self.load_metadata()?;
        meta.verify(expected)?;

        let fresh: EmotionNet<B> = meta.model.init(device);
        if fresh.num_params() != meta.num_params {
            return Err(EmotionError::mismatch(format!(
                "checkpoint records {} parameters, the model built from its config has {}",
                meta.num_params,
                fresh.num_params()
            )));
        }

        let model = fresh
            .load_file(self.dir.join(MODEL_STEM), &CheckpointRecorder::new(), device)
            .map_err(|e| match e {
                RecorderError::FileNotFound(msg) => {
                    EmotionError::Checkpoint(format!("model weights not found: {msg}"))
                }
                other => EmotionError::mismatch(format!("cannot load model weights: {other}")),
            })?;

        if model.num_params() != meta.num_params || model.feature_width != meta.model.feature_width() {
            return Err(EmotionError::mismatch("loaded weights do not fit the recorded architecture"));
        }

        tracing::info!(
            "Loaded checkpoint from epoch {} (val_accuracy={:.2}%, {} parameters)",
            meta.epoch,
            meta.val_accuracy,
            meta.num_params
        );
        Ok((model, meta))
    }

    /// Save the run's TrainConfig as pretty JSON next to the weights.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)
            .map_err(|e| EmotionError::Checkpoint(format!("cannot serialise config: {e}")))?;
        write_atomic(&path, &json)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json)
            .map_err(|e| EmotionError::Checkpoint(format!("cannot parse '{}': {e}", path.display())))
    }
}

/// Write `contents` next to `path` as `<path>.tmp`.
fn write_tmp(path: &Path, contents: &str) -> Result<PathBuf> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    Ok(tmp)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = write_tmp(path, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
