// Token <-> id mapping with document frequencies.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Bag-of-words vector: `(token id, count)` pairs sorted by token id.
pub type Bow = Vec<(usize, u32)>;

/// The corpus vocabulary.
///
/// Ids are dense and assigned in order of first appearance. `dfs[id]` is the
/// number of documents that contain the token at least once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
    dfs: Vec<usize>,
    num_docs: usize,
}

impl Dictionary {
    pub fn from_documents<S: AsRef<str>>(documents: &[Vec<S>]) -> Self {
        let mut dictionary = Self::default();
        for doc in documents {
            dictionary.add_document(doc);
        }
        dictionary
    }

    /// Register the tokens of one document, growing the vocabulary as needed.
    pub fn add_document<S: AsRef<str>>(&mut self, tokens: &[S]) {
        self.num_docs += 1;
        let mut seen = HashSet::new();

        for token in tokens {
            let token = token.as_ref();
            let id = match self.token2id.get(token) {
                Some(&id) => id,
                None => {
                    let id = self.id2token.len();
                    self.token2id.insert(token.to_string(), id);
                    self.id2token.push(token.to_string());
                    self.dfs.push(0);
                    id
                }
            };
            if seen.insert(id) {
                self.dfs[id] += 1;
            }
        }
    }

    /// Count known tokens. Tokens outside the vocabulary are ignored.
    pub fn doc2bow<S: AsRef<str>>(&self, tokens: &[S]) -> Bow {
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token.as_ref()) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts.into_iter().collect()
    }

    pub fn token_id(&self, token: &str) -> Option<usize> {
        self.token2id.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(String::as_str)
    }

    pub fn df(&self, id: usize) -> usize {
        self.dfs.get(id).copied().unwrap_or(0)
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    /// The `n` tokens with the highest document frequency (ties broken
    /// alphabetically).
    pub fn most_frequent(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(usize, usize)> = self.dfs.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| self.id2token[a.0].cmp(&self.id2token[b.0]))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|(id, df)| (self.id2token[id].clone(), df))
            .collect()
    }
}
