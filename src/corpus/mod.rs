// Corpus construction: tokenizing, vocabulary pruning, and TF-IDF weighting.

pub mod builder;
pub mod dictionary;
pub mod document;
pub mod parser;
pub mod tfidf;
pub mod tokenizer;

pub use builder::{Corpus, CorpusBuilder};
