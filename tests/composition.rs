// Composition tests: files on disk -> corpus -> LSI index -> queries.
//
// These tests exercise the data flow between modules end to end, using
// temporary directories for both the source text and the saved index.

use std::fs;
use std::path::Path;

use simsearch::cluster::cluster_documents;
use simsearch::cluster::kmeans::KMeansClusterer;
use simsearch::corpus::document::Encoding;
use simsearch::corpus::parser::ParseOptions;
use simsearch::corpus::tokenizer::Tokenizer;
use simsearch::corpus::CorpusBuilder;
use simsearch::search::index::SimilarityIndex;
use simsearch::search::similarity::INDEX_FILE;
use simsearch::search::{KeySearch, SimSearch};

const ANIMALS: &str = "\
the cats purr on the mat

cats purr and cats nap
lazy cats purr


dogs bark at the mailman
dogs bark and dogs fetch and dogs growl

loud dogs bark
";

const MARKETS: &str = "\
stocks rally as markets climb
markets slump and stocks fall

markets and stocks tumble
";

fn tokenizer() -> Tokenizer {
    Tokenizer::new(["the", "and", "as", "at", "on"])
}

fn write_sources(dir: &Path) {
    fs::write(dir.join("animals.txt"), ANIMALS).unwrap();
    fs::write(dir.join("markets.txt"), MARKETS).unwrap();
    fs::write(dir.join("notes.md"), "cats cats cats").unwrap();
}

fn build(dir: &Path) -> SimSearch {
    let mut builder =
        CorpusBuilder::new(tokenizer(), ParseOptions::paragraphs(), Encoding::Utf8).unwrap();
    assert_eq!(builder.add_directory(dir, false).unwrap(), 6);
    SimSearch::train(KeySearch::new(builder.build().unwrap()), 3).unwrap()
}

// ============================================================
// Chain: directory -> documents -> source display
// ============================================================

#[test]
fn paragraphs_become_documents_with_line_spans() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());
    let corpus = search.corpus();

    assert_eq!(corpus.len(), 6);
    assert_eq!(corpus.title(0), "animals - the cats purr on the mat");
    assert_eq!(corpus.title(1), "animals - cats purr and cats nap");
    assert_eq!(corpus.title(4), "markets - stocks rally as markets climb");

    let spans: Vec<(usize, usize)> = corpus
        .documents()
        .iter()
        .map(|d| {
            let span = d.source.as_ref().unwrap();
            (span.start_line, span.end_line)
        })
        .collect();
    assert_eq!(spans, vec![(1, 1), (3, 4), (7, 8), (10, 10), (1, 2), (4, 4)]);
}

#[test]
fn keyword_hits_read_back_from_source_files() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());
    let keys = search.keys();

    assert_eq!(keys.keyword_search(&["cats"], &[], &[]), vec![0, 1]);

    let source = keys.doc_source(1, 10).unwrap();
    assert_eq!(source.lines, vec!["cats purr and cats nap", "lazy cats purr"]);
    assert!(!source.is_truncated());
    assert_eq!(
        source.location.unwrap().to_string(),
        format!("{} lines 3 - 4", src.path().join("animals.txt").display())
    );

    let truncated = keys.doc_source(1, 1).unwrap();
    assert_eq!(truncated.lines.len(), 1);
    assert_eq!(truncated.total_lines, 2);
}

#[test]
fn changed_source_file_is_reported() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());

    fs::write(src.path().join("animals.txt"), "only one line\n").unwrap();
    let err = search.keys().doc_source(3, 5).unwrap_err();
    assert!(err.to_string().contains("changed"));
}

#[test]
fn undecodable_line_is_named_in_the_error() {
    let src = tempfile::tempdir().unwrap();
    let path = src.path().join("broken.txt");
    fs::write(&path, b"fine first line\nbad \xff\xfe second\n").unwrap();

    let mut builder =
        CorpusBuilder::new(tokenizer(), ParseOptions::paragraphs(), Encoding::Utf8).unwrap();
    let err = builder.add_file(&path).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");

    let mut latin1 =
        CorpusBuilder::new(tokenizer(), ParseOptions::paragraphs(), Encoding::Latin1).unwrap();
    assert_eq!(latin1.add_file(&path).unwrap(), 1);
}

#[test]
fn empty_directory_is_an_error() {
    let src = tempfile::tempdir().unwrap();
    let mut builder =
        CorpusBuilder::new(tokenizer(), ParseOptions::paragraphs(), Encoding::Utf8).unwrap();
    assert!(builder.add_directory(src.path(), false).is_err());
}

// ============================================================
// Chain: index -> save -> load -> queries
// ============================================================

#[test]
fn saved_index_answers_queries_like_the_trained_one() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());

    let index_dir = tempfile::tempdir().unwrap();
    let target = index_dir.path().join("index");
    search.save(&target).unwrap();
    let loaded = SimSearch::load(&target).unwrap();

    assert_eq!(loaded.corpus().len(), search.corpus().len());
    assert_eq!(loaded.corpus().vocab_size(), search.corpus().vocab_size());
    assert_eq!(loaded.lsi().num_topics(), 3);

    let before = search.find_similar_to_doc(2, 5).unwrap();
    let after = loaded.find_similar_to_doc(2, 5).unwrap();
    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].0, 3);
    assert_eq!(after[0].0, 3);
    for (a, b) in before.iter().zip(&after) {
        assert!((a.1 - b.1).abs() < 1e-9);
    }

    let query = loaded
        .find_similar_to_text("Markets and stocks at dawn", 2)
        .unwrap();
    let mut ids: Vec<usize> = query.iter().map(|&(id, _)| id).collect();
    ids.sort();
    assert_eq!(ids, vec![4, 5]);
}

#[test]
fn loading_a_missing_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(SimSearch::load(dir.path()).is_err());
}

#[test]
fn file_query_matches_text_query() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());

    let query_dir = tempfile::tempdir().unwrap();
    let query = query_dir.path().join("query.txt");
    fs::write(&query, "loud dogs\nbark at night\n").unwrap();

    let from_file = search.find_similar_to_file(&query, 3).unwrap();
    let from_text = search
        .find_similar_to_text("loud dogs\nbark at night", 3)
        .unwrap();
    assert_eq!(from_file, from_text);
    assert!(from_file.iter().take(2).all(|&(id, _)| id == 2 || id == 3));
}

#[test]
fn clusters_of_parsed_files_follow_subjects() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());

    let clusters = cluster_documents(&search, &KMeansClusterer::new(3), 3).unwrap();
    let mut groups: Vec<Vec<usize>> = clusters.iter().map(|c| c.doc_ids.clone()).collect();
    groups.sort();
    assert_eq!(groups, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);

    let markets = clusters.iter().find(|c| c.doc_ids == vec![4, 5]).unwrap();
    let mut words = markets.top_words.clone();
    words.sort();
    assert_eq!(words, vec!["markets", "stocks"]);
}

#[test]
fn index_with_wrong_dimension_is_rejected() {
    let src = tempfile::tempdir().unwrap();
    write_sources(src.path());
    let search = build(src.path());

    let index_dir = tempfile::tempdir().unwrap();
    search.save(index_dir.path()).unwrap();

    let rows = vec![vec![1.0]; search.corpus().len()];
    let wrong = SimilarityIndex::from_rows(1, rows);
    fs::write(
        index_dir.path().join(INDEX_FILE),
        serde_json::to_string(&wrong).unwrap(),
    )
    .unwrap();

    let err = SimSearch::load(index_dir.path()).err().unwrap();
    assert!(err.to_string().contains("inconsistent"), "{err}");
}
