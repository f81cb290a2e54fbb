//! Document to result table orchestration.
//!
//! Runs are two-phase: [`Pipeline::prepare`] segments, prompts and embeds once,
//! then the caller either clusters with a known k or inspects the elbow curve
//! and picks one.

pub mod batch;
pub mod results;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::Settings,
    data::tei::TeiDocument,
    error::{PromptOreError, Result},
    nlp::{
        self,
        classify::PhraseBucket,
        cluster::{self, ElbowPoint},
        embeddings::{MaskEmbedder, MaskPrediction},
        family::ModelFamily,
        prompts::{ExtractionMode, PromptEngine, PromptSet},
        segment::{Segmenter, SegmenterConfig},
    },
};

use self::results::ResultTable;

/// Cluster count used when none is given.
pub const DEFAULT_CLUSTERS: usize = 4;

/// How the number of clusters is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusteringMode {
    FixedK(usize),
    /// Report WCSS for k in `1..max_k` and let the caller choose.
    ElbowThenPrompt(usize),
}

/// Whether result rows carry the mask embedding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputShape {
    WithEmbeddings,
    #[default]
    WithoutEmbeddings,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub extraction: ExtractionMode,
    pub clustering: ClusteringMode,
    pub output: OutputShape,
    pub batch_size: usize,
    pub seed: u64,
    /// Where to persist the prompt set, if anywhere.
    pub snapshot: Option<PathBuf>,
    pub segmenter: SegmenterConfig,
}

impl PipelineOptions {
    /// Full extraction, fixed default k, no embeddings in the output.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            extraction: ExtractionMode::Full,
            clustering: ClusteringMode::FixedK(DEFAULT_CLUSTERS),
            output: OutputShape::default(),
            batch_size: settings.batch_size,
            seed: settings.seed,
            snapshot: None,
            segmenter: SegmenterConfig::tei(settings.tei_namespace.clone()),
        }
    }
}

/// Phrase buckets together with the prompts generated from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBundle {
    pub bucket: PhraseBucket,
    pub prompts: PromptSet,
}

/// Segment, classify and expand a document, writing the snapshot when configured.
pub fn build_prompts(
    document: &TeiDocument,
    family: ModelFamily,
    options: &PipelineOptions,
) -> Result<PromptBundle> {
    let segmenter = Segmenter::new(options.segmenter.clone());
    let bucket = nlp::phrase_buckets(document, &segmenter);
    let prompts = PromptEngine::new(family).generate(&bucket, &options.extraction)?;
    if let Some(path) = &options.snapshot {
        prompts.save(path)?;
        info!(path = %path.display(), "wrote prompt snapshot");
    }
    Ok(PromptBundle { bucket, prompts })
}

/// Open the document a run needs, reporting an absent path before any work.
pub fn open_document(path: Option<&Path>) -> Result<TeiDocument> {
    let path = path.ok_or(PromptOreError::InputRequired("document path"))?;
    TeiDocument::open(path)
}

/// Output of the embedding phase, ready for clustering.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub bucket: PhraseBucket,
    pub prompts: PromptSet,
    pub predictions: Vec<MaskPrediction>,
    seed: u64,
}

impl PreparedRun {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    fn embeddings(&self) -> Vec<Vec<f32>> {
        self.predictions
            .iter()
            .map(|prediction| prediction.embedding.clone())
            .collect()
    }

    pub fn elbow_curve(&self, max_k: usize) -> Result<Vec<ElbowPoint>> {
        cluster::elbow_curve(&self.embeddings(), max_k, self.seed)
    }

    pub fn cluster_with_k(&self, k: usize, shape: OutputShape) -> Result<ResultTable> {
        let labels = cluster::cluster_with_k(&self.embeddings(), k, self.seed)?;
        info!(k, masks = labels.len(), "clustered mask embeddings");
        Ok(ResultTable::from_predictions(&self.predictions, &labels, shape))
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Clustered(ResultTable),
    /// Elbow diagnostics computed; call [`PreparedRun::cluster_with_k`] with the chosen k.
    AwaitingK {
        run: PreparedRun,
        elbow: Vec<ElbowPoint>,
    },
}

pub struct Pipeline {
    embedder: Arc<dyn MaskEmbedder>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(embedder: Arc<dyn MaskEmbedder>, options: PipelineOptions) -> Self {
        Self { embedder, options }
    }

    pub fn family(&self) -> ModelFamily {
        self.embedder.family()
    }

    /// Parse the document, build prompts and embed them in one batched call.
    pub fn prepare(&self, document_path: Option<&Path>) -> Result<PreparedRun> {
        let document = open_document(document_path)?;
        let bundle = build_prompts(&document, self.family(), &self.options)?;
        self.embed(bundle)
    }

    pub fn embed(&self, bundle: PromptBundle) -> Result<PreparedRun> {
        let flattened = bundle.prompts.flatten();
        let predictions = self.embedder.embed(&flattened, self.options.batch_size)?;
        if predictions.len() != flattened.len() {
            return Err(PromptOreError::Embedding(format!(
                "embedder returned {} predictions for {} prompts",
                predictions.len(),
                flattened.len()
            )));
        }
        info!(prompts = flattened.len(), family = %self.family(), "embedded prompts");
        Ok(PreparedRun {
            bucket: bundle.bucket,
            prompts: bundle.prompts,
            predictions,
            seed: self.options.seed,
        })
    }

    /// Run end to end. Fixed k yields the table; elbow mode stops after diagnostics.
    pub fn run(&self, document_path: Option<&Path>) -> Result<PipelineOutcome> {
        let run = self.prepare(document_path)?;
        match self.options.clustering {
            ClusteringMode::FixedK(k) => {
                let table = run.cluster_with_k(k, self.options.output)?;
                Ok(PipelineOutcome::Clustered(table))
            }
            ClusteringMode::ElbowThenPrompt(max_k) => {
                let elbow = run.elbow_curve(max_k)?;
                Ok(PipelineOutcome::AwaitingK { run, elbow })
            }
        }
    }
}
