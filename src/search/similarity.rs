// Nearest-neighbour queries in LSI space.
//
// Every query (a corpus document, free text, a file, a set of tagged
// documents) ends up as a TF-IDF vector or an LSI vector that is compared
// against the whole similarity index by cosine similarity.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::index::{l2_norm, SimilarityIndex};
use super::keyword::KeySearch;
use super::lsi::LsiModel;
use crate::corpus::Corpus;

pub const LSI_FILE: &str = "lsi.json";
pub const INDEX_FILE: &str = "index.json";

/// `(document id, cosine similarity)`.
pub type ScoredDoc = (usize, f64);

/// Result of a "more like this tag" query.
#[derive(Debug, Clone)]
pub struct TagMatches {
    pub tag: String,
    /// Documents carrying the tag, used as the query.
    pub inputs: Vec<usize>,
    pub results: Vec<ScoredDoc>,
}

pub struct SimSearch {
    keys: KeySearch,
    lsi: LsiModel,
    index: SimilarityIndex,
}

impl SimSearch {
    /// Train an LSI model with `num_topics` topics and index the corpus.
    pub fn train(keys: KeySearch, num_topics: usize) -> Result<Self> {
        let lsi = LsiModel::train(keys.corpus(), num_topics)?;
        let index = SimilarityIndex::build(&lsi, keys.corpus());
        info!(
            documents = index.len(),
            topics = lsi.num_topics(),
            "Trained LSI model"
        );
        Ok(Self { keys, lsi, index })
    }

    pub fn keys(&self) -> &KeySearch {
        &self.keys
    }

    pub fn corpus(&self) -> &Corpus {
        self.keys.corpus()
    }

    pub fn lsi(&self) -> &LsiModel {
        &self.lsi
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Documents most similar to a TF-IDF vector, best first.
    ///
    /// Documents in `exclude` never appear in the results. A vector with no
    /// component in topic space (e.g. text made only of unknown words) has
    /// nothing to compare against and yields no results.
    pub fn find_similar_to_vector(
        &self,
        tfidf: &[(usize, f64)],
        topn: usize,
        exclude: &[usize],
    ) -> Vec<ScoredDoc> {
        let projected = self.lsi.project(tfidf);
        if l2_norm(&projected) == 0.0 {
            warn!("Query has no weight in topic space; no similar documents");
            return Vec::new();
        }
        let sims = self.index.similarities(&projected);
        rank(sims, topn, |id| exclude.contains(&id))
    }

    /// Documents most similar to corpus document `doc_id`, excluding itself.
    pub fn find_similar_to_doc(&self, doc_id: usize, topn: usize) -> Result<Vec<ScoredDoc>> {
        let tfidf = self.keys.tfidf_for_doc(doc_id)?;
        Ok(self.find_similar_to_vector(tfidf, topn, &[doc_id]))
    }

    /// Parse and weight `text` like the corpus, then search with it.
    pub fn find_similar_to_text(&self, text: &str, topn: usize) -> Result<Vec<ScoredDoc>> {
        let tfidf = self.keys.tfidf_for_text(text)?;
        Ok(self.find_similar_to_vector(&tfidf, topn, &[]))
    }

    /// Use the whole contents of a file as the query.
    pub fn find_similar_to_file(&self, path: &Path, topn: usize) -> Result<Vec<ScoredDoc>> {
        let tfidf = self.keys.tfidf_for_file(path)?;
        Ok(self.find_similar_to_vector(&tfidf, topn, &[]))
    }

    /// Find untagged documents that resemble the ones tagged `tag`.
    ///
    /// Similarities to every tagged document are summed. Documents tagged
    /// `tag` are the query and documents tagged `!tag` are known negatives;
    /// neither appears in the results.
    pub fn find_more_of_tag(&self, tag: &str, topn: usize) -> Result<TagMatches> {
        let tag = tag.to_lowercase();
        let inputs = self.keys.docs_for_tag(&tag).to_vec();
        if inputs.is_empty() {
            anyhow::bail!("No documents are tagged '{tag}'");
        }

        let negatives = self.keys.docs_for_tag(&format!("!{tag}"));
        let excluded: HashSet<usize> = inputs.iter().chain(negatives).copied().collect();

        let mut summed = vec![0.0; self.index.len()];
        for &doc_id in &inputs {
            let Some(row) = self.index.row(doc_id) else {
                continue;
            };
            for (total, sim) in summed.iter_mut().zip(self.index.similarities(row)) {
                *total += sim;
            }
        }

        debug!(
            tag = %tag,
            inputs = inputs.len(),
            negatives = negatives.len(),
            "Searching for more of tag"
        );

        let results = rank(summed, topn, |id| excluded.contains(&id));
        Ok(TagMatches {
            tag,
            inputs,
            results,
        })
    }

    /// Sum the TF-IDF vectors of `doc_ids` and return the `n` heaviest words.
    ///
    /// Used to label clusters of documents.
    pub fn top_words_in_cluster(&self, doc_ids: &[usize], n: usize) -> Vec<String> {
        let corpus = self.corpus();
        let mut totals = vec![0.0; corpus.vocab_size()];
        for &doc_id in doc_ids {
            if let Some(vector) = corpus.tfidf_for_doc(doc_id) {
                for &(term, weight) in vector {
                    totals[term] += weight;
                }
            }
        }

        let mut ranked: Vec<(usize, f64)> = totals
            .into_iter()
            .enumerate()
            .filter(|(_, w)| *w > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(n)
            .filter_map(|(term, _)| corpus.dictionary().token(term).map(str::to_string))
            .collect()
    }

    /// The words that define an LSI topic, with their loadings.
    pub fn topic_words(&self, topic: usize, n: usize) -> Vec<(String, f64)> {
        let dictionary = self.corpus().dictionary();
        self.lsi
            .topic_terms(topic, n)
            .into_iter()
            .filter_map(|(term, loading)| dictionary.token(term).map(|w| (w.to_string(), loading)))
            .collect()
    }

    /// Write the LSI model, the index, and the corpus into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.corpus().save(dir)?;
        write_json(&dir.join(LSI_FILE), &self.lsi)?;
        write_json(&dir.join(INDEX_FILE), &self.index)?;
        info!(dir = %dir.display(), "Saved similarity index");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let corpus = Corpus::load(dir)?;
        let lsi: LsiModel = read_json(&dir.join(LSI_FILE))?;
        let index: SimilarityIndex = read_json(&dir.join(INDEX_FILE))?;

        if index.len() != corpus.len() || lsi.num_terms() != corpus.vocab_size() {
            anyhow::bail!(
                "Index in {} is inconsistent: {} documents / {} terms in the corpus, \
                 {} rows / {} terms in the model. Rebuild the index.",
                dir.display(),
                corpus.len(),
                corpus.vocab_size(),
                index.len(),
                lsi.num_terms()
            );
        }
        if index.dim() != lsi.num_topics() {
            anyhow::bail!(
                "Index in {} is inconsistent: {}-dimensional rows for a {}-topic model. \
                 Rebuild the index.",
                dir.display(),
                index.dim(),
                lsi.num_topics()
            );
        }

        Ok(Self {
            keys: KeySearch::new(corpus),
            lsi,
            index,
        })
    }
}

/// Sort similarities best first (ties by document id) and keep the top `n`
/// documents that are not skipped.
fn rank(sims: Vec<f64>, topn: usize, skip: impl Fn(usize) -> bool) -> Vec<ScoredDoc> {
    let mut scored: Vec<ScoredDoc> = sims
        .into_iter()
        .enumerate()
        .filter(|&(id, _)| !skip(id))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(topn);
    scored
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}
