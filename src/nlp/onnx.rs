//! ONNX Runtime masked-LM embedder.
//!
//! Expects a checkpoint directory holding `model.onnx` (masked-LM head, logits
//! output first) and `tokenizer.json`.

use std::{path::Path, sync::Mutex};

use ndarray::{s, Array2, CowArray, IxDyn};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use tokenizers::Tokenizer;
use tracing::{debug, warn};

use crate::{
    error::{PromptOreError, Result},
    nlp::{
        embeddings::{check_batch_size, fit_sequence, MaskEmbedder, MaskPrediction},
        family::ModelFamily,
    },
};

/// Longest sequence the Spanish checkpoints accept.
const MAX_SEQUENCE_LEN: usize = 512;

pub struct OnnxMaskEmbedder {
    family: ModelFamily,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    mask_id: u32,
    pad_id: u32,
    top_k: usize,
}

fn embedding_err(err: impl std::fmt::Display) -> PromptOreError {
    PromptOreError::Embedding(err.to_string())
}

impl OnnxMaskEmbedder {
    pub fn load(dir: &Path, family: ModelFamily, top_k: usize) -> Result<Self> {
        let environment = Environment::builder()
            .with_name("promptore")
            .build()
            .map_err(embedding_err)?
            .into_arc();
        let session = SessionBuilder::new(&environment)
            .map_err(embedding_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(embedding_err)?
            .with_model_from_file(dir.join("model.onnx"))
            .map_err(embedding_err)?;
        let tokenizer = Tokenizer::from_file(dir.join("tokenizer.json")).map_err(embedding_err)?;

        let mask_id = tokenizer.token_to_id(family.mask_token()).ok_or_else(|| {
            PromptOreError::Embedding(format!(
                "tokenizer has no {} token",
                family.mask_token()
            ))
        })?;
        let pad_id = tokenizer.token_to_id(family.pad_token()).unwrap_or(0);
        debug!(
            inputs = ?session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            mask_id,
            pad_id,
            "onnx session ready"
        );

        Ok(Self {
            family,
            session: Mutex::new(session),
            tokenizer,
            mask_id,
            pad_id,
            top_k,
        })
    }

    fn embed_batch(&self, prompts: &[String]) -> Result<Vec<MaskPrediction>> {
        let encodings = self
            .tokenizer
            .encode_batch(prompts.to_vec(), false)
            .map_err(embedding_err)?;
        let mut rows = Vec::with_capacity(encodings.len());
        let mut mask_positions = Vec::with_capacity(encodings.len());
        for (prompt, encoding) in prompts.iter().zip(&encodings) {
            let ids = encoding.get_ids();
            let (fitted, position) = fit_sequence(ids, self.mask_id, MAX_SEQUENCE_LEN)
                .ok_or_else(|| {
                    PromptOreError::Embedding(format!(
                        "mask token missing after tokenization: {prompt:?}"
                    ))
                })?;
            if fitted.len() < ids.len() {
                warn!(tokens = ids.len(), kept = fitted.len(), "truncated long prompt context");
            }
            rows.push(fitted);
            mask_positions.push(position);
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut input_ids = Array2::<i64>::from_elem((rows.len(), width), i64::from(self.pad_id));
        let mut attention = Array2::<i64>::zeros((rows.len(), width));
        for (row, ids) in rows.iter().enumerate() {
            for (col, id) in ids.iter().enumerate() {
                input_ids[[row, col]] = i64::from(*id);
                attention[[row, col]] = 1;
            }
        }
        let token_types = Array2::<i64>::zeros((rows.len(), width));

        let session = self
            .session
            .lock()
            .map_err(|_| PromptOreError::Embedding("onnx session lock poisoned".into()))?;
        let arrays = session
            .inputs
            .iter()
            .map(|input| match input.name.as_str() {
                "input_ids" => Ok(CowArray::from(input_ids.view().into_dyn())),
                "attention_mask" => Ok(CowArray::from(attention.view().into_dyn())),
                "token_type_ids" => Ok(CowArray::from(token_types.view().into_dyn())),
                other => Err(PromptOreError::Embedding(format!(
                    "unexpected model input {other:?}"
                ))),
            })
            .collect::<Result<Vec<CowArray<'_, i64, IxDyn>>>>()?;
        let values = arrays
            .iter()
            .map(|array| Value::from_array(session.allocator(), array))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(embedding_err)?;
        let outputs = session.run(values).map_err(embedding_err)?;
        let logits = outputs
            .first()
            .ok_or_else(|| PromptOreError::Embedding("model returned no outputs".into()))?
            .try_extract::<f32>()
            .map_err(embedding_err)?;
        let logits = logits.view();
        if logits.ndim() != 3 {
            return Err(PromptOreError::Embedding(format!(
                "expected [batch, sequence, vocab] logits, got shape {:?}",
                logits.shape()
            )));
        }

        prompts
            .iter()
            .zip(mask_positions)
            .enumerate()
            .map(|(row, (prompt, position))| {
                let embedding: Vec<f32> = logits.slice(s![row, position, ..]).iter().copied().collect();
                let candidates = self.top_tokens(&embedding);
                let unwrapped = self.family.unwrap_prompt(prompt);
                let predicted_phrase = match candidates.first() {
                    Some(best) => unwrapped.replacen(self.family.mask_token(), best, 1),
                    None => unwrapped,
                };
                Ok(MaskPrediction {
                    candidates,
                    predicted_phrase,
                    embedding,
                })
            })
            .collect()
    }

    fn top_tokens(&self, logits: &[f32]) -> Vec<String> {
        let mut ranked: Vec<usize> = (0..logits.len()).collect();
        ranked.sort_by(|a, b| logits[*b].total_cmp(&logits[*a]));
        ranked
            .into_iter()
            .take(self.top_k)
            .filter_map(|id| self.tokenizer.id_to_token(id as u32))
            .map(|token| token.trim_start_matches('\u{120}').to_string())
            .collect()
    }
}

impl MaskEmbedder for OnnxMaskEmbedder {
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn embed(&self, prompts: &[String], batch_size: usize) -> Result<Vec<MaskPrediction>> {
        check_batch_size(batch_size)?;
        let mut predictions = Vec::with_capacity(prompts.len());
        for (index, batch) in prompts.chunks(batch_size).enumerate() {
            predictions.extend(self.embed_batch(batch)?);
            debug!(batch = index, done = predictions.len(), total = prompts.len(), "embedded batch");
        }
        Ok(predictions)
    }
}
