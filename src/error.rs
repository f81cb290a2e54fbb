//! Error taxonomy for the prompt extraction pipeline.

use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, PromptOreError>;

/// Failures surfaced by segmentation, prompt generation, embedding and clustering.
///
/// None of these are retried: every stage is deterministic, so the caller decides
/// whether a failure aborts one model run or the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum PromptOreError {
    /// A required argument was absent.
    #[error("missing required input: {0}")]
    InputRequired(&'static str),

    /// The input document could not be turned into an element tree.
    #[error("failed to parse document{}: {message}", display_path(.path))]
    DocumentParse {
        path: Option<PathBuf>,
        message: String,
    },

    /// A template needs more entity names than the phrase provided.
    #[error("template {template} needs {required} entities but phrase has {found}: {phrase:?}")]
    TemplateCountUnsupported {
        template: &'static str,
        required: usize,
        found: usize,
        phrase: String,
    },

    /// Unsupported mode, model family, model size or numeric setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The mask embedder failed to load or run.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// k-means could not be fitted.
    #[error("clustering error: {0}")]
    Clustering(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl PromptOreError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::DocumentParse {
            path: None,
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Attach the originating path to a parse error.
    pub(crate) fn with_path(self, source: impl Into<PathBuf>) -> Self {
        match self {
            Self::DocumentParse { path: None, message } => Self::DocumentParse {
                path: Some(source.into()),
                message,
            },
            other => other,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

impl From<quick_xml::Error> for PromptOreError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse(err.to_string())
    }
}
