//! CLI entry-point for a single-model clustering run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args as ClapArgs;
use promptore::{
    config::Settings,
    nlp::embeddings::load_embedder,
    pipeline::{ClusteringMode, OutputShape, Pipeline, PipelineOptions, PipelineOutcome, DEFAULT_CLUSTERS},
};
use tracing::{info, instrument};

use super::require_document;

/// Args for the `run` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub document: Option<PathBuf>,
    /// Checkpoint directory with model.onnx and tokenizer.json.
    #[arg(long)]
    pub model: Option<PathBuf>,
    /// Number of relation clusters.
    #[arg(long, default_value_t = DEFAULT_CLUSTERS)]
    pub clusters: usize,
    /// Keep the mask embedding column in the CSV.
    #[arg(long)]
    pub with_embeddings: bool,
    /// Also write the prompt set to this JSON file.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
    /// Result CSV; defaults to `<family>_clustering.csv` under the outputs dir.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let path = require_document(&args.document)?;
    let embedder = load_embedder(&settings, args.model.as_deref(), settings.family)?;
    let options = PipelineOptions {
        clustering: ClusteringMode::FixedK(args.clusters),
        output: if args.with_embeddings {
            OutputShape::WithEmbeddings
        } else {
            OutputShape::WithoutEmbeddings
        },
        snapshot: args.snapshot.clone(),
        ..PipelineOptions::from_settings(&settings)
    };
    let table = match Pipeline::new(embedder, options).run(Some(path))? {
        PipelineOutcome::Clustered(table) => table,
        PipelineOutcome::AwaitingK { .. } => bail!("fixed-k run stopped at the elbow"),
    };

    let output = args
        .output
        .unwrap_or_else(|| settings.join_output(format!("{}_clustering.csv", settings.family)));
    table
        .write_csv(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(rows = table.len(), path = %output.display(), "run complete");
    println!("{}", output.display());
    Ok(())
}
