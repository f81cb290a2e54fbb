//! Mask-position embeddings for prompts.
//!
//! The ONNX masked-LM backend sits behind the `onx` feature; without it (or
//! without a checkpoint directory) a deterministic hashing embedder keeps the
//! pipeline runnable end to end.

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    config::Settings,
    error::{PromptOreError, Result},
    nlp::family::ModelFamily,
};

/// What the embedder produced for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskPrediction {
    /// Top-k tokens for the mask, best first.
    pub candidates: Vec<String>,
    /// Prompt without special tokens, mask filled by the best candidate when there is one.
    pub predicted_phrase: String,
    pub embedding: Vec<f32>,
}

/// Maps prompts to the representation of their mask token.
pub trait MaskEmbedder: Send + Sync {
    fn family(&self) -> ModelFamily;

    /// One prediction per prompt, in input order.
    fn embed(&self, prompts: &[String], batch_size: usize) -> Result<Vec<MaskPrediction>>;
}

/// Signed feature hashing of the words around the mask.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    family: ModelFamily,
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(family: ModelFamily, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PromptOreError::config("embedding dimension must be positive"));
        }
        Ok(Self { family, dim })
    }

    fn vectorise(&self, text: &str) -> Vec<f32> {
        let mask = self.family.mask_token();
        let mut vector = vec![0.0f32; self.dim];
        for raw in text.split_whitespace() {
            if raw.contains(mask) {
                continue;
            }
            let word = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            let hash = word_hash(&word);
            let slot = (hash % self.dim as u64) as usize;
            vector[slot] += if hash >> 63 == 0 { 1.0 } else { -1.0 };
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl MaskEmbedder for HashingEmbedder {
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn embed(&self, prompts: &[String], batch_size: usize) -> Result<Vec<MaskPrediction>> {
        check_batch_size(batch_size)?;
        Ok(prompts
            .iter()
            .map(|prompt| {
                let phrase = self.family.unwrap_prompt(prompt);
                MaskPrediction {
                    candidates: Vec::new(),
                    embedding: self.vectorise(&phrase),
                    predicted_phrase: phrase,
                }
            })
            .collect())
    }
}

/// First eight bytes of the word's SHA-256, stable across builds and platforms.
fn word_hash(word: &str) -> u64 {
    let digest = Sha256::digest(word.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Fit token ids into `max_len` while keeping the mask.
///
/// Overlong sequences keep their first token and drop context from the left,
/// so the mask and the trailing end token survive. When the mask sits further
/// left than that window, the window starts at the mask instead. Returns the
/// ids with the position of the last mask, or `None` when there is no mask.
pub fn fit_sequence(ids: &[u32], mask_id: u32, max_len: usize) -> Option<(Vec<u32>, usize)> {
    let mask = ids.iter().rposition(|id| *id == mask_id)?;
    if ids.len() <= max_len {
        return Some((ids.to_vec(), mask));
    }
    if max_len < 2 {
        return (max_len == 1).then(|| (vec![mask_id], 0));
    }
    let start = (ids.len() - (max_len - 1)).min(mask).max(1);
    let mut fitted = Vec::with_capacity(max_len);
    fitted.push(ids[0]);
    fitted.extend_from_slice(&ids[start..(start + max_len - 1).min(ids.len())]);
    Some((fitted, 1 + mask - start))
}

pub(crate) fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(PromptOreError::config("batch size must be positive"));
    }
    Ok(())
}

/// Pick the embedder for a run: the ONNX masked-LM when compiled in and a
/// checkpoint directory is given, otherwise the hashing fallback.
pub fn load_embedder(
    settings: &Settings,
    model_dir: Option<&Path>,
    family: ModelFamily,
) -> Result<Arc<dyn MaskEmbedder>> {
    match model_dir {
        #[cfg(feature = "onx")]
        Some(dir) => {
            let embedder = crate::nlp::onnx::OnnxMaskEmbedder::load(dir, family, settings.top_k)?;
            info!(model = %dir.display(), %family, "loaded onnx masked-lm");
            Ok(Arc::new(embedder) as Arc<dyn MaskEmbedder>)
        }
        #[cfg(not(feature = "onx"))]
        Some(dir) => {
            tracing::warn!(
                model = %dir.display(),
                "built without the onx feature; using hashing embeddings"
            );
            hashing(settings, family)
        }
        None => {
            info!(
                %family,
                expected = %family.default_model(settings.size),
                "no model checkpoint given; using hashing embeddings"
            );
            hashing(settings, family)
        }
    }
}

fn hashing(settings: &Settings, family: ModelFamily) -> Result<Arc<dyn MaskEmbedder>> {
    Ok(Arc::new(HashingEmbedder::new(family, settings.embedding_dim)?) as Arc<dyn MaskEmbedder>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_token_does_not_contribute() {
        let embedder = HashingEmbedder::new(ModelFamily::Bert, 1024).unwrap();
        let with_mask = embedder.vectorise("Ana [MASK] Luis.");
        let without = embedder.vectorise("ana luis");
        assert_eq!(with_mask, without);
        let norm: f32 = with_mask.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn word_hash_is_pinned() {
        // SHA-256("ana") starts with 24 d4 ...
        assert_eq!(word_hash("ana").to_le_bytes()[..2], [0x24, 0xd4]);
        assert_ne!(word_hash("ana"), word_hash("luis"));
    }

    #[test]
    fn short_sequences_are_untouched() {
        let (ids, mask) = fit_sequence(&[0, 5, 6, 9, 2], 9, 8).unwrap();
        assert_eq!(ids, vec![0, 5, 6, 9, 2]);
        assert_eq!(mask, 3);
    }

    #[test]
    fn long_sequences_drop_leading_context() {
        let mut ids = vec![0];
        ids.extend(10..610);
        ids.extend([9, 7, 2]);
        let (fitted, mask) = fit_sequence(&ids, 9, 512).unwrap();
        assert_eq!(fitted.len(), 512);
        assert_eq!(fitted[0], 0);
        assert_eq!(fitted[mask], 9);
        assert_eq!(fitted[510..], [7, 2]);
    }

    #[test]
    fn early_mask_anchors_the_window() {
        let mut ids = vec![0, 5, 9];
        ids.extend(10..20);
        let (fitted, mask) = fit_sequence(&ids, 9, 4).unwrap();
        assert_eq!(fitted, vec![0, 9, 10, 11]);
        assert_eq!(mask, 1);
    }

    #[test]
    fn missing_mask_is_reported() {
        assert_eq!(fit_sequence(&[0, 5, 2], 9, 8), None);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            HashingEmbedder::new(ModelFamily::Bert, 0),
            Err(PromptOreError::Configuration(_))
        ));
    }
}
