#![recursion_limit = "256"]

use anyhow::Result;
use clap::Parser;
use face_emotion::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG wins; otherwise this crate at info, dependencies quiet
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("face_emotion=info")),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
