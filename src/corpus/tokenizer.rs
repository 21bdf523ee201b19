// Word tokenizer with stop-word filtering.
//
// Text is lowercased and segmented on Unicode word boundaries; segments that
// contain no letters or digits (punctuation, whitespace) never become tokens.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into lowercase word tokens, dropping stop words.
///
/// The stop list is stored with the corpus so that queries are tokenized
/// exactly the way the corpus was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tokenizer {
    stop_words: BTreeSet<String>,
}

impl Tokenizer {
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = stop_words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { stop_words }
    }

    /// Tokenizer using the English list from the `stop-words` crate.
    pub fn english() -> Self {
        let stop_words: Vec<String> = get(LANGUAGE::English);
        Self::new(stop_words)
    }

    /// Read a stop list with one word per line.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read stop words from {}", path.display()))?;
        Ok(Self::new(content.lines()))
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn stop_word_count(&self) -> usize {
        self.stop_words.len()
    }

    /// Lowercase, segment into words, and drop stop words. Order is preserved.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        lower
            .unicode_words()
            .filter(|w| !self.is_stop_word(w))
            .map(str::to_string)
            .collect()
    }
}
