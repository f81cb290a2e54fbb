//! Per-mask result rows and their CSV rendering.

use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::Result, nlp::embeddings::MaskPrediction};

use super::OutputShape;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub predicted_token_candidates: Vec<String>,
    pub predicted_phrase: String,
    pub mask_embedding: Option<Vec<f32>>,
    pub predicted_label: usize,
}

/// One row per mask instance, in prompt order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    shape: OutputShape,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Zip predictions with their labels. Embeddings are kept only for
    /// [`OutputShape::WithEmbeddings`].
    pub fn from_predictions(
        predictions: &[MaskPrediction],
        labels: &[usize],
        shape: OutputShape,
    ) -> Self {
        let rows = predictions
            .iter()
            .zip(labels)
            .map(|(prediction, &label)| ResultRow {
                predicted_token_candidates: prediction.candidates.clone(),
                predicted_phrase: prediction.predicted_phrase.clone(),
                mask_embedding: match shape {
                    OutputShape::WithEmbeddings => Some(prediction.embedding.clone()),
                    OutputShape::WithoutEmbeddings => None,
                },
                predicted_label: label,
            })
            .collect();
        Self { shape, rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> Vec<&'static str> {
        match self.shape {
            OutputShape::WithEmbeddings => vec![
                "predicted_token_candidates",
                "predicted_phrase",
                "mask_embedding",
                "predicted_label",
            ],
            OutputShape::WithoutEmbeddings => vec![
                "predicted_token_candidates",
                "predicted_phrase",
                "predicted_label",
            ],
        }
    }

    /// Write the table as CSV; list-valued columns are JSON-encoded.
    pub fn to_writer<W: Write>(&self, sink: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(self.headers())?;
        for row in &self.rows {
            let mut record = vec![
                serde_json::to_string(&row.predicted_token_candidates)?,
                row.predicted_phrase.clone(),
            ];
            if self.shape == OutputShape::WithEmbeddings {
                record.push(serde_json::to_string(
                    row.mask_embedding.as_deref().unwrap_or_default(),
                )?);
            }
            record.push(row.predicted_label.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.to_writer(fs::File::create(path)?)?;
        info!(rows = self.len(), path = %path.display(), "wrote clustering results");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(phrase: &str) -> MaskPrediction {
        MaskPrediction {
            candidates: vec!["hijo".into(), "padre".into()],
            predicted_phrase: phrase.into(),
            embedding: vec![0.5, -0.25],
        }
    }

    #[test]
    fn embeddings_column_follows_shape() {
        let predictions = [prediction("Ana hijo Luis.")];
        let mut with = Vec::new();
        ResultTable::from_predictions(&predictions, &[1], OutputShape::WithEmbeddings)
            .to_writer(&mut with)
            .unwrap();
        assert_eq!(
            String::from_utf8(with).unwrap(),
            "predicted_token_candidates,predicted_phrase,mask_embedding,predicted_label\n\
             \"[\"\"hijo\"\",\"\"padre\"\"]\",Ana hijo Luis.,\"[0.5,-0.25]\",1\n"
        );

        let mut without = Vec::new();
        ResultTable::from_predictions(&predictions, &[0], OutputShape::WithoutEmbeddings)
            .to_writer(&mut without)
            .unwrap();
        assert_eq!(
            String::from_utf8(without).unwrap(),
            "predicted_token_candidates,predicted_phrase,predicted_label\n\
             \"[\"\"hijo\"\",\"\"padre\"\"]\",Ana hijo Luis.,0\n"
        );
    }
}
