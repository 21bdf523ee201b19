// TF-IDF weighting of bag-of-words vectors.
//
//   weight(t, d) = count(t, d) * log2(N / df(t))
//
// followed by L2 normalization of each document vector. Terms that occur in
// every document get an IDF of zero and drop out of the vector entirely.

use serde::{Deserialize, Serialize};

use super::dictionary::Dictionary;

/// Sparse vector: `(token id, weight)` pairs sorted by token id.
pub type SparseVector = Vec<(usize, f64)>;

/// Weights below this magnitude are treated as zero.
const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfidfModel {
    idfs: Vec<f64>,
    num_docs: usize,
}

impl TfidfModel {
    /// Compute the IDF of every token in the dictionary.
    pub fn fit(dictionary: &Dictionary) -> Self {
        let num_docs = dictionary.num_docs();
        let idfs = (0..dictionary.len())
            .map(|id| inverse_document_frequency(num_docs, dictionary.df(id)))
            .collect();
        Self { idfs, num_docs }
    }

    pub fn idf(&self, id: usize) -> f64 {
        self.idfs.get(id).copied().unwrap_or(0.0)
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Weight and normalize a bag-of-words vector.
    pub fn transform(&self, bow: &[(usize, u32)]) -> SparseVector {
        let weighted: SparseVector = bow
            .iter()
            .map(|&(id, count)| (id, count as f64 * self.idf(id)))
            .collect();

        let norm = l2_norm(&weighted);
        if norm < EPSILON {
            return Vec::new();
        }

        weighted
            .into_iter()
            .map(|(id, w)| (id, w / norm))
            .filter(|(_, w)| w.abs() >= EPSILON)
            .collect()
    }
}

fn inverse_document_frequency(num_docs: usize, df: usize) -> f64 {
    if df == 0 || num_docs == 0 {
        0.0
    } else {
        (num_docs as f64 / df as f64).log2()
    }
}

/// Euclidean length of a sparse vector.
pub fn l2_norm(vector: &[(usize, f64)]) -> f64 {
    vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
}
