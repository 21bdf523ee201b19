// Density-based clustering (DBSCAN) via linfa-clustering.
//
// `eps` is given as a cosine distance (1 - cosine similarity). On unit
// vectors the squared Euclidean distance is 2 * (1 - cos), so the Euclidean
// tolerance handed to linfa is sqrt(2 * eps).
//
// A zero row (a document with no surviving terms) is at cosine distance 1
// from everything, including other zero rows, so it is always noise. Those
// rows never reach linfa, where they would sit at Euclidean distance 0 from
// each other.

use anyhow::Result;
use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use ndarray::{Array2, Axis};
use tracing::debug;

use super::traits::DocumentClusterer;

const ZERO_ROW_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct DbscanClusterer {
    /// Neighbourhood radius as a cosine distance, in (0, 2].
    pub eps: f64,
    /// Minimum neighbourhood size for a core point.
    pub min_samples: usize,
}

impl DbscanClusterer {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    pub fn euclidean_tolerance(&self) -> f64 {
        (2.0 * self.eps).sqrt()
    }
}

impl DocumentClusterer for DbscanClusterer {
    fn cluster(&self, vectors: &Array2<f64>) -> Result<Vec<Option<usize>>> {
        if !(self.eps > 0.0 && self.eps <= 2.0) {
            anyhow::bail!("eps must be a cosine distance in (0, 2], got {}", self.eps);
        }
        if self.min_samples < 2 {
            anyhow::bail!("min_samples must be at least 2, got {}", self.min_samples);
        }

        let nonzero: Vec<usize> = vectors
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|x| x.abs() > ZERO_ROW_EPSILON))
            .map(|(i, _)| i)
            .collect();

        let mut labels = vec![None; vectors.nrows()];
        if !nonzero.is_empty() {
            let rows = vectors.select(Axis(0), &nonzero);
            let found = Dbscan::params(self.min_samples)
                .tolerance(self.euclidean_tolerance())
                .transform(&rows)
                .map_err(|e| anyhow::anyhow!("DBSCAN failed: {}", e))?;
            for (&doc, label) in nonzero.iter().zip(found.iter()) {
                labels[doc] = *label;
            }
        }

        let noise = labels.iter().filter(|l| l.is_none()).count();
        debug!(
            eps = self.eps,
            min_samples = self.min_samples,
            zero_rows = vectors.nrows() - nonzero.len(),
            noise,
            "DBSCAN finished"
        );

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_tolerance_translation() {
        let db = DbscanClusterer::new(0.5, 3);
        assert!((db.euclidean_tolerance() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dense_groups_and_noise() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let data = array![
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, s, s],
        ];
        let labels = DbscanClusterer::new(0.05, 2).cluster(&data).unwrap();
        assert!(labels[0].is_some());
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert!(labels[3].is_some());
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(labels[6], None);
    }

    #[test]
    fn test_zero_rows_are_noise() {
        let data = array![
            [1.0, 0.0],
            [1.0, 0.0],
            [0.0, 0.0],
            [0.0, 0.0],
            [0.0, 0.0],
        ];
        let labels = DbscanClusterer::new(0.3, 2).cluster(&data).unwrap();
        assert!(labels[0].is_some());
        assert_eq!(labels[0], labels[1]);
        assert_eq!(&labels[2..], &[None, None, None]);

        let all_zero = Array2::<f64>::zeros((3, 2));
        let labels = DbscanClusterer::new(0.3, 2).cluster(&all_zero).unwrap();
        assert!(labels.iter().all(Option::is_none));
    }

    #[test]
    fn test_invalid_parameters() {
        let data = array![[1.0, 0.0]];
        assert!(DbscanClusterer::new(0.0, 3).cluster(&data).is_err());
        assert!(DbscanClusterer::new(0.3, 1).cluster(&data).is_err());
    }
}
