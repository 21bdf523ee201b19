// Dense cosine-similarity index over the LSI projections of the corpus.

use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::lsi::LsiModel;
use crate::corpus::Corpus;

/// Norms below this are treated as zero vectors.
const EPSILON: f64 = 1e-12;

/// One L2-normalised topic vector per document, indexed by document id.
///
/// Documents whose projection is the zero vector keep a zero row and have
/// similarity 0 with everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityIndex {
    dim: usize,
    rows: Vec<Vec<f64>>,
}

impl SimilarityIndex {
    pub fn build(lsi: &LsiModel, corpus: &Corpus) -> Self {
        let rows = corpus
            .vectors()
            .iter()
            .map(|v| normalize(lsi.project(v)))
            .collect();
        Self {
            dim: lsi.num_topics(),
            rows,
        }
    }

    pub fn from_rows(dim: usize, rows: Vec<Vec<f64>>) -> Self {
        let rows = rows.into_iter().map(normalize).collect();
        Self { dim, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, doc_id: usize) -> Option<&[f64]> {
        self.rows.get(doc_id).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Cosine similarity of `query` (any scale) against every document.
    pub fn similarities(&self, query: &[f64]) -> Vec<f64> {
        let q = normalize(query.to_vec());
        self.rows.iter().map(|row| dot(row, &q)).collect()
    }

    /// The index as an `n_docs x dim` matrix, for the clustering crates.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let flat: Vec<f64> = self.rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.rows.len(), self.dim), flat)
            .context("Similarity index rows have inconsistent dimensions")
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scale to unit length; near-zero vectors come back as all zeros.
pub fn normalize(mut v: Vec<f64>) -> Vec<f64> {
    let norm = l2_norm(&v);
    if norm < EPSILON {
        v.iter_mut().for_each(|x| *x = 0.0);
    } else {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}
