// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to the
// application layer. The only layer that prints to stdout.
//
//   train    → TrainUseCase
//   predict  → InferenceService::predict
//   inspect  → CheckpointManager (metadata + weights)
//   serve    → InferenceService behind axum

pub mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, InspectArgs, PredictArgs, ServeArgs, TrainArgs};

use crate::application::{
    inference_service::{InferenceService, ServiceConfig},
    train_use_case::TrainUseCase,
    web,
};
use crate::domain::prediction::Prediction;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::EmotionNet, Device, InferBackend};

#[derive(Parser, Debug)]
#[command(
    name = "face-emotion",
    version,
    about = "Train a CNN facial-emotion classifier, then classify faces from files or over HTTP."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Inspect(args) => run_inspect(args),
            Commands::Serve(args)   => run_serve(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on images in: {}", args.dataset_dir.display());

    let report = TrainUseCase::new(args.into())
        .execute()
        .context("training failed")?;

    println!(
        "Training complete. Best validation accuracy {:.2}% at epoch {}; checkpoint in {}",
        report.best_accuracy,
        report.best_epoch,
        report.checkpoint_dir.display()
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("cannot read image '{}'", args.image.display()))?;

    let cfg: ServiceConfig = args.model.into();
    let service = InferenceService::load(&cfg).context("cannot load the classifier")?;
    let prediction = service
        .predict(&bytes)
        .with_context(|| format!("cannot classify '{}'", args.image.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
        return Ok(());
    }
    match prediction {
        Prediction::Classified { label, confidence, face } => println!(
            "{label} ({:.1}%) face at ({}, {}) {}x{}",
            confidence * 100.0,
            face.x,
            face.y,
            face.width,
            face.height
        ),
        Prediction::Fallback { label } => println!("{label} (no face detected)"),
        Prediction::NoFaceDetected => println!("no face detected"),
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let ckpt = CheckpointManager::open(&args.checkpoint_dir);
    let meta = ckpt.load_metadata().context("cannot read checkpoint metadata")?;
    let vocabulary = meta.vocabulary()?;
    let (model, meta): (EmotionNet<InferBackend>, _) = ckpt
        .load(&vocabulary, &Device::default())
        .context("cannot load checkpoint weights")?;

    println!("Checkpoint:     {}", ckpt.model_path().display());
    println!("Architecture:   {}", meta.architecture);
    println!("Epoch:          {}", meta.epoch);
    println!("Val accuracy:   {:.2}%", meta.val_accuracy);
    println!("Parameters:     {}", meta.num_params);
    println!("Input:          {0}x{1}x{1}", meta.model.in_channels, meta.input_size);
    println!("Normalisation:  mean {:?} std {:?}", meta.mean, meta.std);
    println!("Labels:         {} (neutral: {})", meta.labels.join(", "), meta.neutral_label);
    println!();
    for layer in model.layer_shapes() {
        println!("  {:<28} {:?}", layer.name, layer.shape);
    }

    if let Ok(cfg) = ckpt.load_config() {
        println!();
        println!("Trained on {} ({} epochs, lr {}, seed {})", cfg.dataset_dir.display(), cfg.epochs, cfg.learning_rate, cfg.seed);
    }
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let cfg: ServiceConfig = args.model.into();
    let service = Arc::new(InferenceService::load(&cfg).context("cannot load the classifier")?);

    let runtime = tokio::runtime::Runtime::new().context("cannot start the async runtime")?;
    runtime
        .block_on(web::serve(args.addr, service))
        .with_context(|| format!("server on {} failed", args.addr))
}
