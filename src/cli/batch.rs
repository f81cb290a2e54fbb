//! CLI entry-point for multi-model batch runs.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args as ClapArgs;
use promptore::{
    config::Settings,
    pipeline::{
        batch::{self, BatchJob},
        OutputShape, PipelineOptions,
    },
    ModelFamily,
};
use tracing::instrument;

use super::{print_json, require_document};

/// Args for the `batch` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub document: Option<PathBuf>,
    /// Directory whose subdirectories are model checkpoints.
    #[arg(long)]
    pub models_dir: PathBuf,
    /// Where `<model>_clustering.csv` files go; defaults to the outputs dir.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Clusters per model; 6 for RoBERTa checkpoints, 4 otherwise.
    #[arg(long)]
    pub clusters: Option<usize>,
    #[arg(long)]
    pub with_embeddings: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let document = require_document(&args.document)?.to_path_buf();
    let clusters = args.clusters.unwrap_or(match settings.family {
        ModelFamily::Roberta => 6,
        ModelFamily::Bert => 4,
    });
    let options = PipelineOptions {
        output: if args.with_embeddings {
            OutputShape::WithEmbeddings
        } else {
            OutputShape::WithoutEmbeddings
        },
        ..PipelineOptions::from_settings(&settings)
    };
    let job = BatchJob {
        document: Some(document),
        models_dir: args.models_dir.clone(),
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| settings.outputs_dir.clone()),
        family: settings.family,
        clusters,
        options,
    };

    let summary = batch::run_models(&settings, job).await?;
    print_json(&summary)?;
    if summary.completed.is_empty() && !summary.failed.is_empty() {
        bail!("all {} model runs failed", summary.failed.len());
    }
    Ok(())
}
