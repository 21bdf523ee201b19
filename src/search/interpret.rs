// Word-level breakdown of a similarity score.
//
// The LSI projection is linear, so the cosine similarity of two vectors
// decomposes exactly into per-word terms. For x = U_k^T a and y = U_k^T b:
//
//   sim = x_hat . y_hat = sum_i  a_i * (U_i . y_hat) / |x|
//
// Each summand is the contribution of word i of `a` to the match. The same
// decomposition run from the other side gives the contributions of `b`.

use serde::Serialize;

use super::index::{dot, l2_norm, normalize};
use super::similarity::SimSearch;

/// Projections shorter than this are treated as zero.
const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordContribution {
    pub word: String,
    /// The word's TF-IDF weight in its own vector.
    pub weight: f64,
    /// The word's share of the total similarity.
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchInterpretation {
    pub similarity: f64,
    /// Words of the first vector, largest contribution first.
    pub input_words: Vec<WordContribution>,
    /// Words of the second vector, largest contribution first.
    pub match_words: Vec<WordContribution>,
}

impl SimSearch {
    /// Explain why two TF-IDF vectors are similar in LSI space.
    ///
    /// Only words contributing more than `min_contribution` are listed; pass
    /// `f64::NEG_INFINITY` to see every word.
    pub fn interpret_match(
        &self,
        vec1: &[(usize, f64)],
        vec2: &[(usize, f64)],
        min_contribution: f64,
    ) -> MatchInterpretation {
        let x = self.lsi().project(vec1);
        let y = self.lsi().project(vec2);
        let x_norm = l2_norm(&x);
        let y_norm = l2_norm(&y);

        if x_norm < EPSILON || y_norm < EPSILON {
            return MatchInterpretation {
                similarity: 0.0,
                input_words: Vec::new(),
                match_words: Vec::new(),
            };
        }

        let x_hat = normalize(x);
        let y_hat = normalize(y);

        MatchInterpretation {
            similarity: dot(&x_hat, &y_hat),
            input_words: self.contributions(vec1, &y_hat, x_norm, min_contribution),
            match_words: self.contributions(vec2, &x_hat, y_norm, min_contribution),
        }
    }

    fn contributions(
        &self,
        vector: &[(usize, f64)],
        other_hat: &[f64],
        norm: f64,
        min_contribution: f64,
    ) -> Vec<WordContribution> {
        let dictionary = self.corpus().dictionary();

        let mut words: Vec<WordContribution> = vector
            .iter()
            .filter_map(|&(term, weight)| {
                let loadings = self.lsi().term_vector(term)?;
                let word = dictionary.token(term)?;
                Some(WordContribution {
                    word: word.to_string(),
                    weight,
                    contribution: weight * dot(loadings, other_hat) / norm,
                })
            })
            .filter(|w| w.contribution > min_contribution)
            .collect();

        words.sort_by(|a, b| {
            b.contribution
                .total_cmp(&a.contribution)
                .then_with(|| a.word.cmp(&b.word))
        });
        words
    }
}
