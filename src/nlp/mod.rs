//! Text side of the pipeline: segmentation, bucketing, prompting, embeddings and clustering.

pub mod classify;
pub mod cluster;
pub mod embeddings;
pub mod family;
pub mod markers;
#[cfg(feature = "onx")]
pub mod onnx;
pub mod prompts;
pub mod segment;
pub mod templates;

use tracing::info;

use crate::data::tei::TeiDocument;

use self::{classify::PhraseBucket, segment::Segmenter};

/// Segment a document and bucket its phrases by entity count.
pub fn phrase_buckets(document: &TeiDocument, segmenter: &Segmenter) -> PhraseBucket {
    let candidates = segmenter.segment(document);
    let bucket = classify::classify(&candidates);
    info!(
        candidates = candidates.len(),
        counts = ?bucket.counts(),
        "classified phrases"
    );
    bucket
}
