// Latent semantic indexing via truncated SVD.
//
// The TF-IDF corpus is a sparse terms x documents matrix A = U S V^T.
// Only the k largest singular triplets are needed, so they are found with a
// randomized range finder: a random sketch Y = A W (with a few power
// iterations) is orthonormalised into Q, and the small matrix B = Q^T A is
// factored exactly with nalgebra. U_k = Q U_B. A is never materialised;
// every product with it walks the sparse document vectors.
//
// Each term gets a k-dimensional loading (a row of U_k), and any TF-IDF
// vector q projects into topic space as U_k^T q. Projections are not scaled
// by the singular values. Directions whose singular value is negligible
// relative to the largest are discarded.

use std::cmp::Ordering;

use anyhow::{Context, Result};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::tfidf::SparseVector;
use crate::corpus::Corpus;

/// Extra sketch columns beyond the requested topics.
const OVERSAMPLES: usize = 20;
/// Power iterations sharpening the sketch towards the top singular vectors.
const POWER_ITERATIONS: usize = 2;
/// Singular values below this fraction of the largest are dropped.
const RELATIVE_CUTOFF: f64 = 1e-10;
const SEED: u64 = 0x5eed_1a51;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsiModel {
    num_topics: usize,
    /// Singular values of the kept topics, largest first.
    singular_values: Vec<f64>,
    /// `term_topics[term][topic]`: the rows of U_k.
    term_topics: Vec<Vec<f64>>,
}

impl LsiModel {
    /// Factor the corpus and keep up to `num_topics` topics.
    ///
    /// The number of topics actually kept is bounded by the vocabulary size,
    /// the number of documents and the rank of the TF-IDF matrix.
    pub fn train(corpus: &Corpus, num_topics: usize) -> Result<Self> {
        if num_topics == 0 {
            anyhow::bail!("LSI needs at least one topic");
        }

        let num_terms = corpus.vocab_size();
        let num_docs = corpus.len();
        if num_terms == 0 || num_docs == 0 {
            anyhow::bail!(
                "Cannot train LSI on an empty corpus ({num_docs} documents, {num_terms} terms)"
            );
        }

        let docs = corpus.vectors();
        let max_rank = num_terms.min(num_docs);
        let k = num_topics.min(max_rank);
        let sketch = (k + OVERSAMPLES).min(max_rank);

        info!(
            terms = num_terms,
            documents = num_docs,
            requested_topics = num_topics,
            sketch,
            "Computing truncated SVD of the TF-IDF matrix"
        );

        let mut rng = StdRng::seed_from_u64(SEED);
        let omega = DMatrix::<f64>::from_fn(num_docs, sketch, |_, _| rng.random_range(-1.0..1.0));

        let mut q = orthonormalize(times_a(docs, num_terms, &omega));
        for _ in 0..POWER_ITERATIONS {
            let z = orthonormalize(times_a_transpose(docs, &q));
            q = orthonormalize(times_a(docs, num_terms, &z));
        }

        // B = Q^T A, sketch x docs.
        let b = times_a_transpose(docs, &q).transpose();
        let svd = b.svd(true, false);
        let u_b = svd.u.context("SVD did not produce left singular vectors")?;
        let sigma = svd.singular_values;
        let u = &q * u_b;

        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&a, &b| sigma[b].partial_cmp(&sigma[a]).unwrap_or(Ordering::Equal));

        let largest = order.first().map(|&j| sigma[j]).unwrap_or(0.0);
        if largest <= 0.0 {
            anyhow::bail!("TF-IDF matrix is all zero; no topics can be trained");
        }
        let significant = order
            .iter()
            .take_while(|&&j| sigma[j] > largest * RELATIVE_CUTOFF)
            .count();
        if significant < order.len() {
            debug!(
                dropped = order.len() - significant,
                "Discarding negligible singular values"
            );
        }
        order.truncate(significant.min(k));

        let singular_values: Vec<f64> = order.iter().map(|&j| sigma[j]).collect();
        let term_topics: Vec<Vec<f64>> = (0..num_terms)
            .map(|term| order.iter().map(|&j| u[(term, j)]).collect())
            .collect();

        if order.len() < num_topics {
            info!(
                requested = num_topics,
                kept = order.len(),
                "Fewer topics than requested (limited by corpus size)"
            );
        }

        Ok(Self {
            num_topics: order.len(),
            singular_values,
            term_topics,
        })
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn num_terms(&self) -> usize {
        self.term_topics.len()
    }

    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Topic loadings of a single term.
    pub fn term_vector(&self, term: usize) -> Option<&[f64]> {
        self.term_topics.get(term).map(Vec::as_slice)
    }

    /// Project a sparse TF-IDF vector into topic space (U_k^T q).
    pub fn project(&self, tfidf: &[(usize, f64)]) -> Vec<f64> {
        let mut topics = vec![0.0; self.num_topics];
        for &(term, weight) in tfidf {
            if let Some(loadings) = self.term_vector(term) {
                for (t, &l) in topics.iter_mut().zip(loadings) {
                    *t += weight * l;
                }
            }
        }
        topics
    }

    /// The `n` terms with the largest absolute loading on `topic`.
    pub fn topic_terms(&self, topic: usize, n: usize) -> Vec<(usize, f64)> {
        if topic >= self.num_topics {
            return Vec::new();
        }
        let mut terms: Vec<(usize, f64)> = self
            .term_topics
            .iter()
            .enumerate()
            .map(|(term, loadings)| (term, loadings[topic]))
            .collect();
        terms.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0)));
        terms.truncate(n);
        terms
    }
}

/// A M for a dense `docs x c` matrix M, where A's columns are `docs`.
fn times_a(docs: &[SparseVector], num_terms: usize, m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::<f64>::zeros(num_terms, m.ncols());
    for (doc, vector) in docs.iter().enumerate() {
        for &(term, weight) in vector {
            for c in 0..m.ncols() {
                out[(term, c)] += weight * m[(doc, c)];
            }
        }
    }
    out
}

/// A^T M for a dense `terms x c` matrix M.
fn times_a_transpose(docs: &[SparseVector], m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::<f64>::zeros(docs.len(), m.ncols());
    for (doc, vector) in docs.iter().enumerate() {
        for &(term, weight) in vector {
            for c in 0..m.ncols() {
                out[(doc, c)] += weight * m[(term, c)];
            }
        }
    }
    out
}

/// Orthonormal basis for the column space (thin Q of a QR factorisation).
fn orthonormalize(m: DMatrix<f64>) -> DMatrix<f64> {
    m.qr().q()
}
