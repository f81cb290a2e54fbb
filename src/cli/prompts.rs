//! CLI entry-point for prompt generation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, ValueEnum};
use promptore::{
    config::Settings,
    data::tei::TeiDocument,
    nlp::templates,
    pipeline::{self, PipelineOptions},
    ExtractionMode, PromptOreError,
};
use tracing::{info, instrument};

use super::{print_json, require_document};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    /// Every template for entity counts 1 to 3.
    Full,
    /// A single template for one entity count.
    Single,
}

/// Args for the `prompts` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// TEI document to read.
    #[arg(long)]
    pub document: Option<PathBuf>,
    #[arg(long, default_value = "full", value_enum)]
    pub mode: Mode,
    /// Template id for single mode, e.g. prompt_0_ent_2.
    #[arg(long)]
    pub template: Option<String>,
    /// Entity count for single mode; defaults to the template's own count.
    #[arg(long)]
    pub entities: Option<usize>,
    /// Write the prompt set to this JSON file as well.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl Args {
    fn extraction(&self) -> Result<ExtractionMode> {
        Ok(match self.mode {
            Mode::Full => ExtractionMode::Full,
            Mode::Single => {
                let template = self
                    .template
                    .clone()
                    .ok_or(PromptOreError::InputRequired("template id"))?;
                let entity_count = self
                    .entities
                    .or_else(|| templates::entity_count_of(&template))
                    .ok_or_else(|| {
                        PromptOreError::Configuration(format!("unknown template {template:?}"))
                    })?;
                ExtractionMode::single(template, entity_count)
            }
        })
    }
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let path = require_document(&args.document)?;
    let extraction = args.extraction()?;
    let document =
        TeiDocument::open(path).with_context(|| format!("loading {}", path.display()))?;

    let options = PipelineOptions {
        extraction,
        snapshot: args.snapshot.clone(),
        ..PipelineOptions::from_settings(&settings)
    };
    let bundle = pipeline::build_prompts(&document, settings.family, &options)
        .context("generating prompts")?;
    info!(
        templates = bundle.prompts.len(),
        prompts = bundle.prompts.total_prompts(),
        "prompt set ready"
    );
    print_json(&bundle.prompts)
}
