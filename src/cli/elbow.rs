//! CLI entry-point for the elbow diagnostic.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args as ClapArgs;
use promptore::{
    config::Settings,
    nlp::embeddings::load_embedder,
    pipeline::{ClusteringMode, Pipeline, PipelineOptions, PipelineOutcome},
};
use tracing::instrument;

use super::{print_json, require_document};

/// Args for the `elbow` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub document: Option<PathBuf>,
    /// Checkpoint directory with model.onnx and tokenizer.json.
    #[arg(long)]
    pub model: Option<PathBuf>,
    /// Exclusive upper bound of the k range.
    #[arg(long, default_value_t = 10)]
    pub max_k: usize,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let path = require_document(&args.document)?;
    let embedder = load_embedder(&settings, args.model.as_deref(), settings.family)?;
    let options = PipelineOptions {
        clustering: ClusteringMode::ElbowThenPrompt(args.max_k),
        ..PipelineOptions::from_settings(&settings)
    };
    match Pipeline::new(embedder, options).run(Some(path))? {
        PipelineOutcome::AwaitingK { elbow, .. } => print_json(&elbow),
        PipelineOutcome::Clustered(_) => bail!("elbow run produced a clustering"),
    }
}
