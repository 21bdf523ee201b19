// Document clustering over the LSI similarity index, with clusters labelled
// by their most heavily weighted words.

pub mod dbscan;
pub mod diagnostics;
pub mod kmeans;
pub mod traits;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::search::SimSearch;
use traits::DocumentClusterer;

/// One cluster and the words that characterise it.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    /// `None` for the DBSCAN noise group.
    pub label: Option<usize>,
    pub doc_ids: Vec<usize>,
    pub top_words: Vec<String>,
}

/// Cluster every document in the index and label each cluster.
pub fn cluster_documents(
    search: &SimSearch,
    clusterer: &dyn DocumentClusterer,
    top_n: usize,
) -> Result<Vec<ClusterSummary>> {
    let vectors = search.index().to_array()?;
    let labels = clusterer.cluster(&vectors)?;
    Ok(summarize(&labels, search, top_n))
}

/// Group document ids by label. Clusters come out in label order with the
/// noise group last.
pub fn summarize(
    labels: &[Option<usize>],
    search: &SimSearch,
    top_n: usize,
) -> Vec<ClusterSummary> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut noise = Vec::new();

    for (doc_id, label) in labels.iter().enumerate() {
        match label {
            Some(l) => groups.entry(*l).or_default().push(doc_id),
            None => noise.push(doc_id),
        }
    }

    let mut summaries: Vec<ClusterSummary> = groups
        .into_iter()
        .map(|(label, doc_ids)| ClusterSummary {
            top_words: search.top_words_in_cluster(&doc_ids, top_n),
            label: Some(label),
            doc_ids,
        })
        .collect();

    if !noise.is_empty() {
        summaries.push(ClusterSummary {
            top_words: search.top_words_in_cluster(&noise, top_n),
            label: None,
            doc_ids: noise,
        });
    }

    summaries
}
