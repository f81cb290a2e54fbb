//! Command-line interface wiring for promptore.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use promptore::{config::Settings, ModelFamily, PromptOreError};

pub mod batch;
pub mod elbow;
pub mod prompts;
pub mod run;
pub mod segment;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Unsupervised relation extraction with masked-language-model prompts",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Commands,
}

/// Flags that override `.env` settings for every sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Overrides {
    /// Model family the prompts are written for (bert or roberta).
    #[arg(long, global = true)]
    pub family: Option<ModelFamily>,
    /// Prompts per forward pass.
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,
    /// Seed for k-means.
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

impl Overrides {
    fn apply(self, mut settings: Settings) -> Result<Settings> {
        if let Some(family) = self.family {
            settings.family = family;
        }
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                return Err(PromptOreError::Configuration("--batch-size must be positive".into()).into());
            }
            settings.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        Ok(settings)
    }
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        let settings = self.overrides.apply(settings)?;
        match self.command {
            Commands::Segment(args) => segment::run(args, settings).await,
            Commands::Prompts(args) => prompts::run(args, settings).await,
            Commands::Elbow(args) => elbow::run(args, settings).await,
            Commands::Run(args) => run::run(args, settings).await,
            Commands::Batch(args) => batch::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Segment a TEI document and print phrases grouped by entity count.
    Segment(segment::Args),
    /// Generate the prompt set for a document.
    Prompts(prompts::Args),
    /// Print within-cluster sum of squares for a range of k.
    Elbow(elbow::Args),
    /// Embed, cluster and write the result table for one model.
    Run(run::Args),
    /// Run every checkpoint in a models directory.
    Batch(batch::Args),
}

/// The document argument every sub-command needs.
pub(crate) fn require_document(path: &Option<PathBuf>) -> Result<&Path> {
    Ok(path
        .as_deref()
        .ok_or(PromptOreError::InputRequired("document path"))?)
}

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
