//! CLI entry-point for document segmentation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use promptore::{config::Settings, data::tei::TeiDocument, nlp, Segmenter, SegmenterConfig};
use tracing::instrument;

use super::{print_json, require_document};

/// Args for the `segment` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// TEI document to segment.
    #[arg(long)]
    pub document: Option<PathBuf>,
    /// Print only the number of phrases per entity count.
    #[arg(long)]
    pub counts: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let path = require_document(&args.document)?;
    let document =
        TeiDocument::open(path).with_context(|| format!("loading {}", path.display()))?;
    let segmenter = Segmenter::new(SegmenterConfig::tei(settings.tei_namespace.clone()));
    let bucket = nlp::phrase_buckets(&document, &segmenter);
    if args.counts {
        print_json(&bucket.counts())
    } else {
        print_json(&bucket)
    }
}
