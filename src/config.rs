use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::corpus::document::Encoding;
use crate::corpus::tokenizer::Tokenizer;

/// Default number of LSI topics.
pub const DEFAULT_NUM_TOPICS: usize = 100;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Command
/// line flags take precedence over anything set here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding corpus.json, lsi.json and index.json
    pub index_dir: PathBuf,
    /// Stop list with one word per line (built-in English list when unset)
    pub stop_words_file: Option<PathBuf>,
    /// Encoding of the source text files
    pub encoding: Encoding,
    /// Number of LSI topics to train
    pub num_topics: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Every key has a default.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoding = match var("SIMSEARCH_ENCODING") {
            Some(value) => value
                .parse::<Encoding>()
                .context("Invalid SIMSEARCH_ENCODING")?,
            None => Encoding::default(),
        };

        let num_topics = match var("SIMSEARCH_NUM_TOPICS") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("SIMSEARCH_NUM_TOPICS must be a number, got '{value}'"))?,
            None => DEFAULT_NUM_TOPICS,
        };
        if num_topics == 0 {
            anyhow::bail!("SIMSEARCH_NUM_TOPICS must be at least 1");
        }

        Ok(Self {
            index_dir: var("SIMSEARCH_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./simsearch_index")),
            stop_words_file: var("SIMSEARCH_STOP_WORDS")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            encoding,
            num_topics,
        })
    }

    /// Build the tokenizer for this configuration.
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        match &self.stop_words_file {
            Some(path) => Tokenizer::from_file(path),
            None => Ok(Tokenizer::english()),
        }
    }

    /// Check that an index has been built in the configured directory.
    pub fn require_index(&self) -> Result<()> {
        let corpus = self.index_dir.join(crate::corpus::builder::CORPUS_FILE);
        if !corpus.exists() {
            anyhow::bail!(
                "No index found in {}\nRun `simsearch build <dir>` first, or set SIMSEARCH_INDEX_DIR.",
                self.index_dir.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(lookup(&[])).unwrap();
        assert_eq!(config.index_dir, PathBuf::from("./simsearch_index"));
        assert_eq!(config.encoding, Encoding::Utf8);
        assert_eq!(config.num_topics, DEFAULT_NUM_TOPICS);
        assert!(config.stop_words_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(lookup(&[
            ("SIMSEARCH_INDEX_DIR", "/tmp/idx"),
            ("SIMSEARCH_ENCODING", "latin-1"),
            ("SIMSEARCH_NUM_TOPICS", " 250 "),
            ("SIMSEARCH_STOP_WORDS", "stop_words.txt"),
        ]))
        .unwrap();
        assert_eq!(config.index_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(config.encoding, Encoding::Latin1);
        assert_eq!(config.num_topics, 250);
        assert_eq!(config.stop_words_file, Some(PathBuf::from("stop_words.txt")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_vars(lookup(&[("SIMSEARCH_NUM_TOPICS", "many")])).is_err());
        assert!(Config::from_vars(lookup(&[("SIMSEARCH_NUM_TOPICS", "0")])).is_err());
        assert!(Config::from_vars(lookup(&[("SIMSEARCH_ENCODING", "utf-16")])).is_err());
    }
}
