// Unit tests for clustering and the parameter tuning diagnostics.
//
// Runs on the LSI index of a corpus with three unrelated subjects, where
// documents about the same subject project onto the same topic direction.

use simsearch::cluster::dbscan::DbscanClusterer;
use simsearch::cluster::diagnostics::{
    elbow, histogram, nearest_neighbor_distances, neighbor_counts,
};
use simsearch::cluster::kmeans::KMeansClusterer;
use simsearch::cluster::traits::DocumentClusterer;
use simsearch::cluster::{cluster_documents, summarize};
use simsearch::corpus::document::Encoding;
use simsearch::corpus::parser::ParseOptions;
use simsearch::corpus::tokenizer::Tokenizer;
use simsearch::corpus::CorpusBuilder;
use simsearch::search::{KeySearch, SimSearch};

fn search() -> SimSearch {
    let mut b = CorpusBuilder::new(
        Tokenizer::new(["the", "and", "as", "at", "on"]),
        ParseOptions::default(),
        Encoding::Utf8,
    )
    .unwrap();

    for text in [
        "the cats purr on the mat",
        "cats purr and cats nap",
        "lazy cats purr",
        "dogs bark at the mailman",
        "dogs bark and dogs fetch and dogs growl",
        "loud dogs bark",
        "stocks rally as markets climb",
        "markets slump and stocks fall",
        "markets and stocks tumble",
    ] {
        b.add_text(text, text, &[]);
    }

    SimSearch::train(KeySearch::new(b.build().unwrap()), 3).unwrap()
}

fn assert_three_subject_groups(labels: &[Option<usize>]) {
    assert_eq!(labels.len(), 9);
    for group in labels.chunks(3) {
        assert!(group[0].is_some());
        assert!(group.iter().all(|l| *l == group[0]));
    }
    assert_ne!(labels[0], labels[3]);
    assert_ne!(labels[3], labels[6]);
    assert_ne!(labels[0], labels[6]);
}

// ============================================================
// Clusterers
// ============================================================

#[test]
fn kmeans_groups_documents_by_subject() {
    let vectors = search().index().to_array().unwrap();
    let labels = KMeansClusterer::new(3).cluster(&vectors).unwrap();
    assert_three_subject_groups(&labels);
}

#[test]
fn dbscan_groups_documents_by_subject() {
    let vectors = search().index().to_array().unwrap();
    let labels = DbscanClusterer::new(0.05, 2).cluster(&vectors).unwrap();
    assert_three_subject_groups(&labels);
}

#[test]
fn dbscan_marks_everything_noise_when_groups_are_too_small() {
    let vectors = search().index().to_array().unwrap();
    let labels = DbscanClusterer::new(0.05, 4).cluster(&vectors).unwrap();
    assert!(labels.iter().all(Option::is_none));
}

#[test]
fn cluster_summaries_are_labelled_with_subject_words() {
    let search = search();
    let clusters = cluster_documents(&search, &KMeansClusterer::new(3), 2).unwrap();

    assert_eq!(clusters.len(), 3);
    assert_eq!(clusters.iter().map(|c| c.doc_ids.len()).sum::<usize>(), 9);

    let cats = clusters
        .iter()
        .find(|c| c.doc_ids.contains(&0))
        .unwrap();
    assert_eq!(cats.doc_ids, vec![0, 1, 2]);
    let mut words = cats.top_words.clone();
    words.sort();
    assert_eq!(words, vec!["cats", "purr"]);
}

#[test]
fn summaries_put_noise_last() {
    let search = search();
    let labels = [None, Some(1), Some(0), None, Some(1), Some(0), None, None, None];
    let clusters = summarize(&labels, &search, 3);

    assert_eq!(clusters.len(), 3);
    assert_eq!(clusters[0].label, Some(0));
    assert_eq!(clusters[0].doc_ids, vec![2, 5]);
    assert_eq!(clusters[1].label, Some(1));
    assert_eq!(clusters[2].label, None);
    assert_eq!(clusters[2].doc_ids, vec![0, 3, 6, 7, 8]);
}

// ============================================================
// Diagnostics
// ============================================================

#[test]
fn same_subject_documents_are_nearest_neighbours() {
    let distances = nearest_neighbor_distances(search().index()).unwrap();
    assert_eq!(distances.len(), 9);
    assert!(distances.iter().all(|d| d.abs() < 1e-6));
}

#[test]
fn neighbour_counts_cover_the_subject_group() {
    let counts = neighbor_counts(search().index(), 0.5);
    assert_eq!(counts, vec![3; 9]);
}

#[test]
fn histogram_of_neighbour_counts_is_cumulative() {
    let counts: Vec<f64> = neighbor_counts(search().index(), 0.5)
        .into_iter()
        .map(|c| c as f64)
        .collect();
    let bins = histogram(&counts, 4);
    assert_eq!(bins.len(), 4);
    assert_eq!(bins[0].count, 9);
    assert!(bins.iter().all(|b| (b.cumulative_percent - 100.0).abs() < 1e-9));
}

#[test]
fn elbow_error_falls_to_zero_at_subject_count() {
    let vectors = search().index().to_array().unwrap();
    let analysis = elbow(&vectors, &[0, 1, 2, 3, 50]).unwrap();

    let ks: Vec<usize> = analysis.points.iter().map(|p| p.k).collect();
    assert_eq!(ks, vec![1, 2, 3]);
    assert!(analysis.points[0].avg_within_ss > analysis.points[1].avg_within_ss);
    assert!(analysis.points[2].avg_within_ss < 1e-9);
    assert!(analysis.best_k.is_some());
}

// ============================================================
// Documents with no surviving terms
// ============================================================

fn search_with_empty_documents() -> SimSearch {
    let mut b = CorpusBuilder::new(
        Tokenizer::new(Vec::<String>::new()),
        ParseOptions::default(),
        Encoding::Utf8,
    )
    .unwrap();
    for text in [
        "cats purr", "cats purr", "cats purr", "dogs bark", "dogs bark", "dogs bark", "alpha",
        "beta", "gamma", "delta",
    ] {
        b.add_text(text, text, &[]);
    }
    SimSearch::train(KeySearch::new(b.build().unwrap()), 2).unwrap()
}

#[test]
fn empty_documents_are_dbscan_noise() {
    let search = search_with_empty_documents();
    let vectors = search.index().to_array().unwrap();
    let labels = DbscanClusterer::new(0.44, 3).cluster(&vectors).unwrap();

    assert!(labels[0].is_some());
    assert!(labels[..3].iter().all(|l| *l == labels[0]));
    assert!(labels[3].is_some());
    assert!(labels[3..6].iter().all(|l| *l == labels[3]));
    assert_ne!(labels[0], labels[3]);
    assert!(labels[6..].iter().all(Option::is_none));

    let clusters = summarize(&labels, &search, 3);
    assert_eq!(clusters.len(), 3);
    assert!(clusters.iter().filter(|c| c.label.is_some()).all(|c| !c.top_words.is_empty()));
    assert_eq!(clusters[2].doc_ids, vec![6, 7, 8, 9]);
}

#[test]
fn empty_documents_count_only_themselves() {
    let search = search_with_empty_documents();
    let counts = neighbor_counts(search.index(), 0.5);
    assert_eq!(counts, vec![3, 3, 3, 3, 3, 3, 1, 1, 1, 1]);

    let distances = nearest_neighbor_distances(search.index()).unwrap();
    assert!(distances[6..].iter().all(|d| (d - 1.0).abs() < 1e-12));
}
