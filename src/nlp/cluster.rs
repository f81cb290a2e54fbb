//! Seeded k-means over mask embeddings and the elbow diagnostic.

use linfa::{
    traits::{Fit, Predict},
    DatasetBase,
};
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PromptOreError, Result};

/// Independent k-means++ initialisations per fit; the best inertia wins.
pub const KMEANS_RUNS: usize = 10;

/// Within-cluster sum of squares for one k.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub wcss: f64,
}

/// Cluster label per embedding, in input order.
pub fn cluster_with_k(embeddings: &[Vec<f32>], k: usize, seed: u64) -> Result<Vec<usize>> {
    if embeddings.is_empty() {
        return Ok(Vec::new());
    }
    let records = to_records(embeddings)?;
    check_k(k, records.nrows())?;
    let (labels, wcss) = fit(&records, k, seed)?;
    debug!(k, wcss, points = records.nrows(), "k-means fitted");
    Ok(labels)
}

/// WCSS for every k in `1..max_k`, capped at the number of embeddings.
pub fn elbow_curve(embeddings: &[Vec<f32>], max_k: usize, seed: u64) -> Result<Vec<ElbowPoint>> {
    if embeddings.is_empty() {
        return Ok(Vec::new());
    }
    let records = to_records(embeddings)?;
    let upper = max_k.min(records.nrows() + 1);
    (1..upper)
        .map(|k| {
            let (_, wcss) = fit(&records, k, seed)?;
            Ok(ElbowPoint { k, wcss })
        })
        .collect()
}

fn check_k(k: usize, n: usize) -> Result<()> {
    if k == 0 || k > n {
        return Err(PromptOreError::config(format!(
            "cluster count must be between 1 and {n}, got {k}"
        )));
    }
    Ok(())
}

fn to_records(embeddings: &[Vec<f32>]) -> Result<Array2<f64>> {
    let dim = embeddings[0].len();
    if dim == 0 {
        return Err(PromptOreError::config("embeddings are empty vectors"));
    }
    if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
        return Err(PromptOreError::config(format!(
            "embedding {bad} has {} dimensions, expected {dim}",
            embeddings[bad].len()
        )));
    }
    let flat: Vec<f64> = embeddings.iter().flatten().map(|v| f64::from(*v)).collect();
    Array2::from_shape_vec((embeddings.len(), dim), flat)
        .map_err(|err| PromptOreError::Clustering(err.to_string()))
}

fn fit(records: &Array2<f64>, k: usize, seed: u64) -> Result<(Vec<usize>, f64)> {
    let rng = StdRng::seed_from_u64(seed);
    let dataset = DatasetBase::from(records.clone());
    let model = KMeans::params_with_rng(k, rng)
        .n_runs(KMEANS_RUNS)
        .fit(&dataset)
        .map_err(|err| PromptOreError::Clustering(err.to_string()))?;
    let labels: Array1<usize> = model.predict(records);
    let centroids = model.centroids();
    let wcss = records
        .rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(row, &label)| {
            row.iter()
                .zip(centroids.row(label).iter())
                .map(|(x, c)| (x - c).powi(2))
                .sum::<f64>()
        })
        .sum::<f64>();
    Ok((labels.to_vec(), wcss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_k_and_ragged_input() {
        let points = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert!(matches!(
            cluster_with_k(&points, 0, 42),
            Err(PromptOreError::Configuration(_))
        ));
        assert!(matches!(
            cluster_with_k(&points, 3, 42),
            Err(PromptOreError::Configuration(_))
        ));
        let ragged = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(
            cluster_with_k(&ragged, 1, 42),
            Err(PromptOreError::Configuration(_))
        ));
    }

    #[test]
    fn empty_input_has_no_labels() {
        assert!(cluster_with_k(&[], 3, 42).unwrap().is_empty());
        assert!(elbow_curve(&[], 5, 42).unwrap().is_empty());
    }
}
