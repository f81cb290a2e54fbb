//! Running one document against every checkpoint in a models directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{error, info, instrument};
use walkdir::WalkDir;

use crate::{
    config::Settings,
    error::Result,
    nlp::{embeddings::load_embedder, family::ModelFamily},
};

use super::{build_prompts, open_document, Pipeline, PipelineOptions, PromptBundle};

/// Directory names under the models directory that are never checkpoints.
pub const IGNORED_MODEL_DIRS: [&str; 2] = ["__pycache__", "__results__files"];

/// Checkpoint directories directly under `models_dir`, sorted by name.
pub fn discover_models(models_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut models = Vec::new();
    for entry in WalkDir::new(models_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let ignored = IGNORED_MODEL_DIRS
            .iter()
            .any(|dir| entry.file_name() == std::ffi::OsStr::new(dir));
        if ignored {
            continue;
        }
        models.push(entry.into_path());
    }
    Ok(models)
}

/// File name of a model's result table.
pub fn result_file_name(model_dir: &Path) -> String {
    format!("{}_clustering.csv", model_name(model_dir))
}

fn model_name(model_dir: &Path) -> String {
    model_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| model_dir.display().to_string())
}

/// Inputs of a multi-model run. Every model is clustered with `clusters`.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub document: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub output_dir: PathBuf,
    pub family: ModelFamily,
    pub clusters: usize,
    pub options: PipelineOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelFailure {
    pub model: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Result tables written, one per successful model.
    pub completed: Vec<PathBuf>,
    pub failed: Vec<ModelFailure>,
}

/// Run every discovered model in turn. A failing model is logged and skipped.
#[instrument(skip(settings, job), fields(models_dir = %job.models_dir.display()))]
pub async fn run_models(settings: &Settings, job: BatchJob) -> Result<BatchSummary> {
    let document = open_document(job.document.as_deref())?;
    let models = discover_models(&job.models_dir)?;
    fs::create_dir_all(&job.output_dir)?;
    info!(models = models.len(), "starting batch");

    // Prompts only depend on the family, so they are built once for all models.
    let bundle = build_prompts(&document, job.family, &job.options)?;

    let mut summary = BatchSummary::default();
    for model_dir in models {
        let name = model_name(&model_dir);
        let destination = job.output_dir.join(result_file_name(&model_dir));
        let task = {
            let settings = settings.clone();
            let bundle = bundle.clone();
            let job = job.clone();
            let destination = destination.clone();
            tokio::task::spawn_blocking(move || {
                run_model(&settings, &model_dir, bundle, &job, &destination)
            })
        };
        let outcome = match task.await {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(join) => Err(join.to_string()),
        };
        match outcome {
            Ok(rows) => {
                info!(model = %name, rows, path = %destination.display(), "model finished");
                summary.completed.push(destination);
            }
            Err(message) => {
                error!(model = %name, error = %message, "model run failed; continuing");
                summary.failed.push(ModelFailure {
                    model: name,
                    error: message,
                });
            }
        }
    }

    info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        "batch finished"
    );
    Ok(summary)
}

fn run_model(
    settings: &Settings,
    model_dir: &Path,
    bundle: PromptBundle,
    job: &BatchJob,
    destination: &Path,
) -> Result<usize> {
    let embedder = load_embedder(settings, Some(model_dir), job.family)?;
    let pipeline = Pipeline::new(embedder, job.options.clone());
    let run = pipeline.embed(bundle)?;
    let table = run.cluster_with_k(job.clusters, job.options.output)?;
    table.write_csv(destination)?;
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_skips_files_and_ignored_dirs() {
        let root = tempfile::tempdir().unwrap();
        for dir in ["roberta-base", "__pycache__", "beto", "__results__files"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("notes.txt"), "x").unwrap();

        let models = discover_models(root.path()).unwrap();
        let names: Vec<String> = models.iter().map(|m| model_name(m)).collect();
        assert_eq!(names, vec!["beto", "roberta-base"]);
        assert_eq!(result_file_name(&models[0]), "beto_clustering.csv");
    }
}
