// Keyword inclusion/exclusion search, tag lookup, and source display.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::corpus::document::{read_lines, SourceSpan};
use crate::corpus::tfidf::SparseVector;
use crate::corpus::Corpus;

/// Flat keyword and tag queries over a built corpus.
///
/// Keyword matching works on the pruned vocabulary: a word that was a stop
/// word or appeared only once in the collection cannot be searched for.
pub struct KeySearch {
    corpus: Corpus,
}

/// The original text of a document, read back from its source.
#[derive(Debug, Clone)]
pub struct DocSource {
    pub doc_id: usize,
    pub title: String,
    pub location: Option<SourceSpan>,
    pub lines: Vec<String>,
    /// Number of lines in the full document, before truncation.
    pub total_lines: usize,
}

impl DocSource {
    pub fn is_truncated(&self) -> bool {
        self.lines.len() < self.total_lines
    }
}

impl KeySearch {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn into_corpus(self) -> Corpus {
        self.corpus
    }

    pub fn vocab_size(&self) -> usize {
        self.corpus.vocab_size()
    }

    pub fn word_id(&self, word: &str) -> Option<usize> {
        self.corpus.dictionary().token_id(&word.to_lowercase())
    }

    pub fn top_words(&self, n: usize) -> Vec<(String, usize)> {
        self.corpus.top_words(n)
    }

    pub fn docs_for_tag(&self, tag: &str) -> &[usize] {
        self.corpus.docs_for_tag(tag)
    }

    /// Find documents containing every word in `includes` and none of
    /// `excludes`.
    ///
    /// `docs` restricts the search to a candidate set; an empty slice means
    /// the whole corpus. Results are ascending document ids.
    pub fn keyword_search<S: AsRef<str>>(
        &self,
        includes: &[S],
        excludes: &[S],
        docs: &[usize],
    ) -> Vec<usize> {
        let mut include_ids = Vec::with_capacity(includes.len());
        for word in includes {
            match self.word_id(word.as_ref()) {
                Some(id) => include_ids.push(id),
                None => {
                    warn!(word = word.as_ref(), "Search word is not in the vocabulary");
                    return Vec::new();
                }
            }
        }

        let exclude_ids: Vec<usize> = excludes
            .iter()
            .filter_map(|w| self.word_id(w.as_ref()))
            .collect();

        let mut candidates: Vec<usize> = if docs.is_empty() {
            (0..self.corpus.len()).collect()
        } else {
            docs.iter()
                .copied()
                .filter(|&id| id < self.corpus.len())
                .collect()
        };
        candidates.sort_unstable();
        candidates.dedup();

        let results: Vec<usize> = candidates
            .into_iter()
            .filter(|&doc_id| {
                let Some(bow) = self.corpus.bow_for_doc(doc_id) else {
                    return false;
                };
                let contains = |term: &usize| bow.binary_search_by_key(term, |&(id, _)| id).is_ok();
                include_ids.iter().all(contains) && !exclude_ids.iter().any(contains)
            })
            .collect();

        debug!(
            includes = include_ids.len(),
            excludes = exclude_ids.len(),
            results = results.len(),
            "Keyword search"
        );
        results
    }

    pub fn tfidf_for_doc(&self, doc_id: usize) -> Result<&SparseVector> {
        self.corpus
            .tfidf_for_doc(doc_id)
            .with_context(|| format!("No document with id {doc_id} (corpus has {})", self.corpus.len()))
    }

    pub fn tfidf_for_text(&self, text: &str) -> Result<SparseVector> {
        self.corpus.text_to_tfidf(text)
    }

    pub fn tfidf_for_file(&self, path: &Path) -> Result<SparseVector> {
        self.corpus.file_to_tfidf(path)
    }

    /// Read the original lines of a document, keeping at most `max_lines`.
    pub fn doc_source(&self, doc_id: usize, max_lines: usize) -> Result<DocSource> {
        let meta = self
            .corpus
            .document(doc_id)
            .with_context(|| format!("No document with id {doc_id}"))?;

        let lines = match &meta.source {
            Some(span) => {
                let file_lines = read_lines(&span.path, self.corpus.encoding())?;
                if span.end_line > file_lines.len() || span.start_line == 0 {
                    anyhow::bail!(
                        "{} has {} lines but document {} spans lines {} - {}; \
                         the file changed after the index was built",
                        span.path.display(),
                        file_lines.len(),
                        doc_id,
                        span.start_line,
                        span.end_line
                    );
                }
                file_lines[span.start_line - 1..span.end_line].to_vec()
            }
            None => meta.inline_lines.clone(),
        };

        let total_lines = lines.len();
        Ok(DocSource {
            doc_id,
            title: meta.title.clone(),
            location: meta.source.clone(),
            lines: lines.into_iter().take(max_lines).collect(),
            total_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::document::Encoding;
    use crate::corpus::parser::ParseOptions;
    use crate::corpus::tokenizer::Tokenizer;
    use crate::corpus::CorpusBuilder;

    fn search() -> KeySearch {
        let mut b = CorpusBuilder::new(
            Tokenizer::new(["the", "and", "a"]),
            ParseOptions::default(),
            Encoding::Utf8,
        )
        .unwrap();
        b.add_text("zero", "red apple\ngreen pear", &[]);
        b.add_text("one", "red pear", &["fruit"]);
        b.add_text("two", "green apple", &["Fruit"]);
        b.add_text("three", "red green", &[]);
        KeySearch::new(b.build().unwrap())
    }

    #[test]
    fn test_include_all_words() {
        let ks = search();
        assert_eq!(ks.keyword_search(&["red"], &[], &[]), vec![0, 1, 3]);
        assert_eq!(ks.keyword_search(&["red", "pear"], &[], &[]), vec![0, 1]);
    }

    #[test]
    fn test_exclude_words() {
        let ks = search();
        assert_eq!(ks.keyword_search(&["red"], &["green"], &[]), vec![1]);
    }

    #[test]
    fn test_words_are_case_insensitive() {
        let ks = search();
        assert_eq!(ks.keyword_search(&["APPLE"], &[], &[]), vec![0, 2]);
    }

    #[test]
    fn test_restricted_candidates() {
        let ks = search();
        assert_eq!(ks.keyword_search(&["apple"], &[], &[2, 3, 2, 42]), vec![2]);
    }

    #[test]
    fn test_unknown_include_word_matches_nothing() {
        let ks = search();
        assert!(ks.keyword_search(&["red", "banana"], &[], &[]).is_empty());
    }

    #[test]
    fn test_unknown_exclude_word_is_ignored() {
        let ks = search();
        assert_eq!(ks.keyword_search(&["pear"], &["banana"], &[]), vec![0, 1]);
    }

    #[test]
    fn test_inline_doc_source() {
        let ks = search();
        let src = ks.doc_source(0, 1).unwrap();
        assert_eq!(src.title, "zero");
        assert_eq!(src.lines, vec!["red apple"]);
        assert_eq!(src.total_lines, 2);
        assert!(src.is_truncated());
        assert!(src.location.is_none());
        assert!(ks.doc_source(9, 1).is_err());
    }

    #[test]
    fn test_tag_lookup() {
        let ks = search();
        assert_eq!(ks.docs_for_tag("FRUIT"), &[1, 2]);
    }
}
