//! Runtime configuration utilities for promptore.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

use crate::{
    data::tei::TEI_NAMESPACE,
    error::{PromptOreError, Result},
    nlp::family::{ModelFamily, ModelSize},
};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for snapshots and result tables.
    pub outputs_dir: PathBuf,
    /// Prompts per masked-LM forward pass.
    pub batch_size: usize,
    /// Seed for k-means initialisation.
    pub seed: u64,
    /// Token candidates kept per mask.
    pub top_k: usize,
    pub family: ModelFamily,
    pub size: ModelSize,
    /// Width of the hashing fallback embeddings.
    pub embedding_dim: usize,
    pub tei_namespace: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            outputs_dir: PathBuf::from("./outputs"),
            batch_size: 32,
            seed: 42,
            top_k: 9,
            family: ModelFamily::Bert,
            size: ModelSize::Base,
            embedding_dim: 256,
            tei_namespace: TEI_NAMESPACE.to_string(),
        }
    }
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.outputs_dir);
        let tei_namespace = env::var("TEI_NAMESPACE").unwrap_or(defaults.tei_namespace);

        let settings = Self {
            outputs_dir,
            batch_size: env_or("BATCH_SIZE", defaults.batch_size)?,
            seed: env_or("RANDOM_SEED", defaults.seed)?,
            top_k: env_or("TOP_K_CANDIDATES", defaults.top_k)?,
            family: env_or("MODEL_FAMILY", defaults.family)?,
            size: env_or("MODEL_SIZE", defaults.size)?,
            embedding_dim: env_or("EMBEDDING_DIM", defaults.embedding_dim)?,
            tei_namespace,
        };
        if settings.batch_size == 0 {
            return Err(PromptOreError::config("BATCH_SIZE must be positive"));
        }
        if settings.embedding_dim == 0 {
            return Err(PromptOreError::config("EMBEDDING_DIM must be positive"));
        }
        Ok(settings)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

/// Parse an environment variable, falling back when it is unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| PromptOreError::config(format!("invalid {key}={raw:?}: {err}"))),
        Err(_) => Ok(default),
    }
}
