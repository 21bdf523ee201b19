// Common interface for the clustering algorithms.
//
// Both implementations run on the rows of the similarity index, which are
// unit-length LSI vectors, so Euclidean and cosine geometry agree on order.

use anyhow::Result;
use ndarray::Array2;

/// Assign each row of `vectors` to a cluster.
///
/// `None` marks a noise point that belongs to no cluster.
pub trait DocumentClusterer {
    fn cluster(&self, vectors: &Array2<f64>) -> Result<Vec<Option<usize>>>;
}
