//! PromptORE: unsupervised relation extraction from TEI documents.
//!
//! Phrases with marked entities are expanded into Spanish masked-LM prompts,
//! the mask representations are embedded, and k-means groups them into
//! relation types.

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;
pub mod pipeline;

pub use error::{PromptOreError, Result};
pub use nlp::{
    classify::{classify, PhraseBucket},
    family::{ModelFamily, ModelSize},
    prompts::{ExtractionMode, PromptEngine, PromptSet},
    segment::{segment, Segmenter, SegmenterConfig},
};
