// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using burn's DataLoader and Adam.
//
// Per epoch the trainer walks a small state machine:
//
//   Idle ─► Training(e) ─► Validating(e) ─┬─► Checkpointing(e) ─► Idle
//                                         └────────────────────► Idle
//   Idle (after the last epoch) ─► Done
//
// Key burn points:
//   - Training runs on B (Autodiff<…>) for gradients
//   - model.valid() moves the model to B::InnerBackend; dropout
//     is inert there, so validation is deterministic
//   - argmax(1) returns [batch, 1]; flatten before .equal()
//
// Only a strictly better validation accuracy writes a checkpoint,
// so the weights on disk are always the best epoch seen so far.

use std::{path::PathBuf, sync::Arc};

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{EmotionBatcher, LoadedBatch},
    dataset::SampleDataset,
};
use crate::domain::{sample::Sample, vocabulary::LabelVocabulary};
use crate::error::{EmotionError, Result};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMetadata},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::EmotionNet;

// ─── State machine ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    /// Between epochs; `completed` epochs are finished.
    Idle { completed: usize },
    Training(usize),
    Validating(usize),
    Checkpointing(usize),
    Done,
}

impl TrainerState {
    pub fn start() -> Self {
        Self::Idle { completed: 0 }
    }

    /// State after the current phase finishes. `improved` is only
    /// consulted when leaving Validating.
    pub fn next(self, improved: bool, epochs: usize) -> Self {
        match self {
            Self::Idle { completed } if completed >= epochs => Self::Done,
            Self::Idle { completed }       => Self::Training(completed + 1),
            Self::Training(e)              => Self::Validating(e),
            Self::Validating(e) if improved => Self::Checkpointing(e),
            Self::Validating(e)            => Self::Idle { completed: e },
            Self::Checkpointing(e)         => Self::Idle { completed: e },
            Self::Done                     => Self::Done,
        }
    }
}

// ─── Best accuracy ────────────────────────────────────────────────────────────
/// Tracks the best validation accuracy of a run. Starts empty, so
/// the first observation always counts as an improvement.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestAccuracy {
    best: Option<(usize, f64)>,
}

impl BestAccuracy {
    /// Record `accuracy` for `epoch`; true when it strictly beats the best.
    pub fn observe(&mut self, epoch: usize, accuracy: f64) -> bool {
        let improved = self.best.map_or(true, |(_, best)| accuracy > best);
        if improved {
            self.best = Some((epoch, accuracy));
        }
        improved
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.best.map(|(_, a)| a)
    }

    pub fn epoch(&self) -> Option<usize> {
        self.best.map(|(e, _)| e)
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub epochs:         Vec<EpochMetrics>,
    pub best_epoch:     usize,
    /// Percentage in [0, 100]
    pub best_accuracy:  f64,
    pub checkpoint_dir: PathBuf,
}

/// Validation result of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub correct:  usize,
    pub total:    usize,
    pub skipped:  usize,
}

impl Evaluation {
    /// 100 * correct / total, 0.0 when nothing could be evaluated.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.total as f64
        }
    }
}

// ─── Training ─────────────────────────────────────────────────────────────────
pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    vocabulary:    &LabelVocabulary,
    train_dataset: SampleDataset,
    val_dataset:   SampleDataset,
    ckpt:          &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        &B::Device,
) -> Result<TrainingReport> {
    // ── Build model ───────────────────────────────────────────────────────────
    B::seed(device, cfg.seed);
    let model_cfg = cfg.model_config(vocabulary.len());
    model_cfg.validate()?;
    let mut model: EmotionNet<B> = model_cfg.init(device);
    tracing::info!(
        "Model ready: {} conv stages {:?}, feature width {}, {} parameters",
        model_cfg.conv_channels.len(),
        model_cfg.conv_channels,
        model.feature_width,
        model.num_params()
    );

    let mut optim = AdamConfig::new().init::<B, EmotionNet<B>>();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::<B, Sample, LoadedBatch<B>>::new(EmotionBatcher::new())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .set_device(device.clone())
        .build(train_dataset);

    let val_loader =
        DataLoaderBuilder::<B::InnerBackend, Sample, LoadedBatch<B::InnerBackend>>::new(EmotionBatcher::new())
            .batch_size(cfg.batch_size)
            .set_device(device.clone())
            .build(val_dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut state    = TrainerState::start();
    let mut best     = BestAccuracy::default();
    let mut history  = Vec::with_capacity(cfg.epochs);
    let mut improved = false;

    let mut train_loss    = f64::NAN;
    let mut train_skipped = 0usize;
    let mut evaluation    = Evaluation { correct: 0, total: 0, skipped: 0 };
    let mut snapshot: Option<EmotionNet<B::InnerBackend>> = None;

    loop {
        state = state.next(improved, cfg.epochs);
        tracing::debug!("Trainer state → {:?}", state);

        match state {
            TrainerState::Training(epoch) => {
                let (trained, loss, skipped) =
                    train_epoch(model, &mut optim, &train_loader, cfg.learning_rate, epoch)?;
                model         = trained;
                train_loss    = loss;
                train_skipped = skipped;
            }

            TrainerState::Validating(epoch) => {
                let model_valid = model.valid();
                evaluation = evaluate(&model_valid, &val_loader);
                if evaluation.total == 0 {
                    tracing::warn!(
                        "Epoch {epoch}: no validation sample could be decoded, accuracy reported as 0.0"
                    );
                }
                improved = best.observe(epoch, evaluation.accuracy());
                snapshot = improved.then_some(model_valid);
            }

            TrainerState::Checkpointing(epoch) => {
                if let Some(best_model) = snapshot.take() {
                    let meta = CheckpointMetadata::new(
                        model_cfg.clone(),
                        vocabulary,
                        epoch,
                        evaluation.accuracy(),
                        best_model.num_params(),
                    );
                    ckpt.save(best_model, &meta)?;
                    tracing::info!(
                        "New best val_accuracy={:.2}% at epoch {}, checkpoint written",
                        evaluation.accuracy(),
                        epoch
                    );
                }
            }

            TrainerState::Idle { completed: epoch } => {
                let skipped = train_skipped + evaluation.skipped;
                if skipped > 0 {
                    tracing::warn!("Epoch {epoch}: {skipped} sample(s) failed to decode and were skipped");
                }
                let row = EpochMetrics::new(epoch, train_loss, evaluation.accuracy(), skipped, improved);
                tracing::info!(
                    "Epoch {:>3}/{} | train_loss={:.4} | val_accuracy={:.2}% | skipped={} | checkpoint={}",
                    epoch, cfg.epochs, row.train_loss, row.val_accuracy, row.skipped_samples, row.checkpointed,
                );
                metrics.log(&row)?;
                history.push(row);
                improved = false;
            }

            TrainerState::Done => break,
        }
    }

    let (best_epoch, best_accuracy) = best
        .epoch()
        .zip(best.accuracy())
        .ok_or_else(|| EmotionError::configuration("training finished without running an epoch"))?;

    tracing::info!(
        "Training complete: best val_accuracy={:.2}% at epoch {}",
        best_accuracy,
        best_epoch
    );
    Ok(TrainingReport {
        epochs: history,
        best_epoch,
        best_accuracy,
        checkpoint_dir: ckpt.dir().to_path_buf(),
    })
}

/// One pass over the training partition. Returns the updated model,
/// the mean batch loss and the number of undecodable samples.
fn train_epoch<B, O>(
    mut model: EmotionNet<B>,
    optim:     &mut O,
    loader:    &Arc<dyn DataLoader<B, LoadedBatch<B>>>,
    lr:        f64,
    epoch:     usize,
) -> Result<(EmotionNet<B>, f64, usize)>
where
    B: AutodiffBackend,
    O: Optimizer<EmotionNet<B>, B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut skipped  = 0usize;

    for loaded in loader.iter() {
        skipped += loaded.skipped;
        let Some(batch) = loaded.batch else {
            tracing::debug!("Epoch {epoch}: batch had no decodable samples");
            continue;
        };

        let (loss, _) = model.forward_loss(batch.images, batch.targets);
        let loss_val  = loss.clone().into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            return Err(EmotionError::training(format!(
                "training loss became {loss_val} in epoch {epoch}; try a lower learning rate"
            )));
        }
        loss_sum += loss_val;
        batches  += 1;

        // Backward pass + Adam update
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);
    }

    let mean = if batches > 0 {
        loss_sum / batches as f64
    } else {
        tracing::warn!("Epoch {epoch}: no training batch could be built");
        f64::NAN
    };
    Ok((model, mean, skipped))
}

/// Accuracy of `model` over the validation partition.
pub fn evaluate<B: Backend>(
    model:  &EmotionNet<B>,
    loader: &Arc<dyn DataLoader<B, LoadedBatch<B>>>,
) -> Evaluation {
    let mut eval = Evaluation { correct: 0, total: 0, skipped: 0 };

    for loaded in loader.iter() {
        eval.skipped += loaded.skipped;
        let Some(batch) = loaded.batch else { continue };

        let logits = model.forward(batch.images);
        eval.total += batch.targets.dims()[0];

        // argmax(1) is [batch, 1]; flatten to [batch] before comparing
        let correct: i64 = logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        eval.correct += correct as usize;
    }
    eval
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_walks_every_epoch() {
        // epoch 1 improves, epoch 2 does not
        let mut s = TrainerState::start();
        let mut seen = Vec::new();
        for improved in [false, false, true, false, false, false, false, false] {
            s = s.next(improved, 2);
            seen.push(s);
            if s == TrainerState::Done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                TrainerState::Training(1),
                TrainerState::Validating(1),
                TrainerState::Checkpointing(1),
                TrainerState::Idle { completed: 1 },
                TrainerState::Training(2),
                TrainerState::Validating(2),
                TrainerState::Idle { completed: 2 },
                TrainerState::Done,
            ]
        );
    }

    #[test]
    fn zero_epochs_is_done_immediately() {
        assert_eq!(TrainerState::start().next(false, 0), TrainerState::Done);
    }

    #[test]
    fn first_epoch_always_improves() {
        let mut best = BestAccuracy::default();
        assert!(best.observe(1, 0.0));
        assert_eq!(best.epoch(), Some(1));
    }

    #[test]
    fn saved_accuracy_is_the_running_maximum() {
        let accuracies = [40.0, 55.0, 55.0, 30.0, 70.0, 65.0];
        let mut best   = BestAccuracy::default();
        let mut saved  = Vec::new();
        for (i, &a) in accuracies.iter().enumerate() {
            if best.observe(i + 1, a) {
                saved.push(a);
            }
        }
        // ties and regressions never overwrite
        assert_eq!(saved, vec![40.0, 55.0, 70.0]);
        assert_eq!(best.accuracy(), Some(70.0));
        assert_eq!(best.epoch(), Some(5));
    }

    #[test]
    fn accuracy_of_nothing_is_zero() {
        let e = Evaluation { correct: 0, total: 0, skipped: 4 };
        assert_eq!(e.accuracy(), 0.0);
        let e = Evaluation { correct: 3, total: 4, skipped: 0 };
        assert_eq!(e.accuracy(), 75.0);
    }
}
