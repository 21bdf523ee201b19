// K-means clustering (k-means++ initialisation) via linfa-clustering.

use anyhow::Result;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use tracing::debug;

use super::traits::DocumentClusterer;

#[derive(Debug, Clone)]
pub struct KMeansClusterer {
    pub k: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
}

impl Default for KMeansClusterer {
    fn default() -> Self {
        Self {
            k: 10,
            max_iterations: 100,
            tolerance: 1e-4,
        }
    }
}

impl KMeansClusterer {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Fit the model and return labels together with the centroids.
    pub fn fit(&self, vectors: &Array2<f64>) -> Result<KMeansFit> {
        let n_samples = vectors.nrows();
        if n_samples == 0 {
            anyhow::bail!("Cannot cluster an empty set of documents");
        }
        if self.k == 0 || self.k > n_samples {
            anyhow::bail!(
                "Invalid cluster count {}: use k between 1 and the number of documents ({})",
                self.k,
                n_samples
            );
        }

        let dataset = DatasetBase::from(vectors.clone());
        let model = KMeans::params(self.k)
            .max_n_iterations(self.max_iterations)
            .tolerance(self.tolerance)
            .fit(&dataset)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to cluster {} documents into {} clusters: {}",
                    n_samples,
                    self.k,
                    e
                )
            })?;

        let mut assignments = Array1::<usize>::zeros(n_samples);
        model.predict_inplace(vectors, &mut assignments);

        debug!(k = self.k, documents = n_samples, "K-means converged");

        Ok(KMeansFit {
            labels: assignments.to_vec(),
            centroids: model.centroids().clone(),
        })
    }
}

impl DocumentClusterer for KMeansClusterer {
    fn cluster(&self, vectors: &Array2<f64>) -> Result<Vec<Option<usize>>> {
        let fit = self.fit(vectors)?;
        Ok(fit.labels.into_iter().map(Some).collect())
    }
}

/// Labels and centroids of a fitted k-means model.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    /// `k x dim` centroid matrix.
    pub centroids: Array2<f64>,
}

impl KMeansFit {
    /// Mean squared Euclidean distance from each point to its centroid.
    pub fn avg_within_ss(&self, vectors: &Array2<f64>) -> f64 {
        let n = vectors.nrows();
        if n == 0 {
            return 0.0;
        }
        let total: f64 = vectors
            .outer_iter()
            .zip(&self.labels)
            .map(|(row, &label)| {
                let centroid = self.centroids.row(label);
                row.iter()
                    .zip(centroid.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
            })
            .sum();
        total / n as f64
    }
}
