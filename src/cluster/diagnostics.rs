// Parameter tuning aids for clustering.
//
// DBSCAN needs an `eps` and a `min_samples`; k-means needs a k. These helpers
// compute the numbers one would otherwise eyeball on a plot: nearest-neighbour
// distances, neighbour counts within a radius, histograms with cumulative
// percentages, and the "elbow" of the within-cluster error curve.

use anyhow::Result;
use ndarray::Array2;
use tracing::{info, warn};

use super::kmeans::KMeansClusterer;
use crate::search::index::{dot, SimilarityIndex};

/// Cosine distance from each document to its nearest other document.
pub fn nearest_neighbor_distances(index: &SimilarityIndex) -> Result<Vec<f64>> {
    if index.len() < 2 {
        anyhow::bail!("Need at least two documents to measure neighbour distances");
    }

    let rows = index.rows();
    let distances = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            rows.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, other)| 1.0 - dot(row, other))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    Ok(distances)
}

/// For each document, how many documents (itself included) lie within
/// cosine distance `< eps`.
///
/// A document is always at distance 0 from itself, so a zero row still
/// counts one.
pub fn neighbor_counts(index: &SimilarityIndex, eps: f64) -> Vec<usize> {
    let rows = index.rows();
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            rows.iter()
                .enumerate()
                .filter(|&(j, other)| j == i || 1.0 - dot(row, other) < eps)
                .count()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// Percentage of all values that fall at or below this bin's upper edge.
    pub cumulative_percent: f64,
}

/// Equal-width histogram over the range of `values`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let width = span / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let total = values.len() as f64;
    let mut running = 0;
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            running += count;
            HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
                cumulative_percent: running as f64 / total * 100.0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElbowPoint {
    pub k: usize,
    pub avg_within_ss: f64,
}

#[derive(Debug, Clone)]
pub struct ElbowAnalysis {
    pub points: Vec<ElbowPoint>,
    /// The k at the sharpest bend of the curve, if there are enough points.
    pub best_k: Option<usize>,
}

/// Run k-means for each k and locate the elbow of the error curve.
pub fn elbow(vectors: &Array2<f64>, ks: &[usize]) -> Result<ElbowAnalysis> {
    let mut points = Vec::with_capacity(ks.len());

    for &k in ks {
        if k == 0 || k > vectors.nrows() {
            warn!(k, documents = vectors.nrows(), "Skipping k outside 1..=documents");
            continue;
        }
        let fit = KMeansClusterer::new(k).fit(vectors)?;
        let avg_within_ss = fit.avg_within_ss(vectors);
        info!(k, avg_within_ss, "K-means error");
        points.push(ElbowPoint { k, avg_within_ss });
    }

    let best_k = pick_elbow(&points);
    Ok(ElbowAnalysis { points, best_k })
}

/// The point with the largest absolute second difference.
///
/// With points 0..n, first differences sit between points and second
/// differences between those, so second difference `i` belongs to point
/// `i + 1`.
pub fn pick_elbow(points: &[ElbowPoint]) -> Option<usize> {
    if points.len() < 3 {
        return None;
    }

    let x: Vec<f64> = points.iter().map(|p| p.k as f64).collect();
    let y: Vec<f64> = points.iter().map(|p| p.avg_within_ss).collect();

    let dx: Vec<f64> = (0..points.len() - 1)
        .map(|i| (y[i + 1] - y[i]) / (x[i + 1] - x[i]))
        .collect();
    let ddx: Vec<f64> = (0..dx.len() - 1)
        .map(|i| ((dx[i + 1] - dx[i]) / (x[i + 1] - x[i])).abs())
        .collect();

    let (idx, _) = ddx
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))?;
    Some(points[idx + 1].k)
}
