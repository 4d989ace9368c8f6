// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands:
//   train    fit a classifier on <dataset>/<label>/*.png|jpg
//   predict  classify one image file
//   inspect  print a checkpoint's metadata and layer shapes
//   serve    HTTP front end over the same predict path
//
// This is the only place defaults live. The application layer
// receives fully populated configs.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::inference_service::ServiceConfig;
use crate::application::train_use_case::TrainConfig;
use crate::domain::prediction::NoFacePolicy;
use crate::domain::vocabulary::STANDARD_LABELS;
use crate::ml::localizer::DetectorParams;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the emotion classifier on a labelled image directory
    Train(TrainArgs),

    /// Classify the face in one image file
    Predict(PredictArgs),

    /// Show what a checkpoint contains
    Inspect(InspectArgs),

    /// Serve POST /predict-emotion over HTTP
    Serve(ServeArgs),
}

/// Label vocabulary shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct VocabularyArgs {
    /// Ordered class names; position i is model output i
    #[arg(long, value_delimiter = ',', default_values_t = STANDARD_LABELS.map(String::from))]
    pub labels: Vec<String>,

    /// Label reported when no face is found
    #[arg(long, default_value = "neutral")]
    pub neutral_label: String,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// One sub-directory per label, named after the label
    #[arg(long, default_value = "data/faces")]
    pub dataset_dir: PathBuf,

    /// Where the best checkpoint, config and metrics.csv are written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[command(flatten)]
    pub vocabulary: VocabularyArgs,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Fraction of samples used for training; the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub split_ratio: f64,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Seeds the split, the shuffle order and weight init
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output channels of each conv block, e.g. 32,64
    #[arg(long, value_delimiter = ',', default_values_t = [32usize, 64])]
    pub conv_channels: Vec<usize>,

    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_dir:    a.dataset_dir,
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            split_ratio:    a.split_ratio,
            epochs:         a.epochs,
            learning_rate:  a.lr,
            seed:           a.seed,
            labels:         a.vocabulary.labels,
            neutral_label:  a.vocabulary.neutral_label,
            conv_channels:  a.conv_channels,
            hidden_size:    a.hidden_size,
            dropout:        a.dropout,
        }
    }
}

/// Everything needed to load an InferenceService.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[command(flatten)]
    pub vocabulary: VocabularyArgs,

    /// SeetaFace detection model used by rustface
    #[arg(long, default_value = "models/seeta_fd_frontal_v1.0.bin")]
    pub detector: PathBuf,

    /// Skip face detection and classify the whole image
    #[arg(long)]
    pub full_frame: bool,

    /// What to report when no face is found: neutral | report
    #[arg(long, default_value = "neutral")]
    pub no_face: NoFacePolicy,

    /// Smallest face side in pixels (at least 20)
    #[arg(long, default_value_t = 20)]
    pub min_face_size: u32,

    /// Detector score a window needs to count as a face
    #[arg(long, default_value_t = 2.0)]
    pub score_thresh: f64,

    #[arg(long, default_value_t = 0.8)]
    pub pyramid_scale: f32,

    #[arg(long, default_value_t = 4)]
    pub window_step: u32,
}

impl From<ModelArgs> for ServiceConfig {
    fn from(a: ModelArgs) -> Self {
        ServiceConfig {
            checkpoint_dir: a.checkpoint_dir,
            labels:         a.vocabulary.labels,
            neutral_label:  a.vocabulary.neutral_label,
            no_face_policy: a.no_face,
            detector:       (!a.full_frame).then_some(a.detector),
            detection:      DetectorParams {
                min_face_size: a.min_face_size,
                score_thresh:  a.score_thresh,
                pyramid_scale: a.pyramid_scale,
                window_step:   a.window_step,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify
    pub image: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Print the full prediction as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    #[command(flatten)]
    pub model: ModelArgs,
}
