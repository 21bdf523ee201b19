// CorpusBuilder and the Corpus it produces.
//
// Documents are tokenized as they are added and global token frequencies are
// tallied. `build()` then prunes every token that occurs only once across the
// whole collection, builds the dictionary, and converts each document to
// bag-of-words and TF-IDF vectors.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::dictionary::{Bow, Dictionary};
use super::document::{read_lines, DocumentMeta, Encoding, SourceSpan};
use super::parser::{DocumentSplitter, ParseOptions};
use super::tfidf::{SparseVector, TfidfModel};
use super::tokenizer::Tokenizer;

/// File name of the serialized corpus inside an index directory.
pub const CORPUS_FILE: &str = "corpus.json";

/// Accumulates documents until `build()` turns them into a [`Corpus`].
pub struct CorpusBuilder {
    tokenizer: Tokenizer,
    options: ParseOptions,
    splitter: DocumentSplitter,
    encoding: Encoding,
    documents: Vec<Vec<String>>,
    meta: Vec<DocumentMeta>,
    frequency: HashMap<String, usize>,
    tag_index: BTreeMap<String, Vec<usize>>,
}

impl CorpusBuilder {
    pub fn new(tokenizer: Tokenizer, options: ParseOptions, encoding: Encoding) -> Result<Self> {
        let splitter = options.compile()?;
        Ok(Self {
            tokenizer,
            options,
            splitter,
            encoding,
            documents: Vec::new(),
            meta: Vec::new(),
            frequency: HashMap::new(),
            tag_index: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Add one document and return its id.
    ///
    /// `source` locates the lines on disk; documents added without one keep
    /// their raw lines so they can still be displayed later.
    pub fn add_document<L: AsRef<str>, T: AsRef<str>>(
        &mut self,
        title: &str,
        lines: &[L],
        tags: &[T],
        source: Option<SourceSpan>,
    ) -> usize {
        let id = self.documents.len();

        let mut doc = Vec::new();
        for line in lines {
            let line = self.splitter.substitute(line.as_ref());
            let tokens = self.tokenizer.tokenize(&line);
            for token in &tokens {
                *self.frequency.entry(token.clone()).or_insert(0) += 1;
            }
            doc.extend(tokens);
        }
        self.documents.push(doc);

        let tags: Vec<String> = tags.iter().map(|t| t.as_ref().trim().to_string()).collect();
        for tag in &tags {
            let entries = self.tag_index.entry(tag.to_lowercase()).or_default();
            if entries.last() != Some(&id) {
                entries.push(id);
            }
        }

        let inline_lines = if source.is_none() {
            lines.iter().map(|l| l.as_ref().to_string()).collect()
        } else {
            Vec::new()
        };

        self.meta.push(DocumentMeta {
            id,
            title: title.to_string(),
            tags,
            source,
            inline_lines,
        });

        id
    }

    /// Add an in-memory document, one line per `\n`.
    pub fn add_text(&mut self, title: &str, text: &str, tags: &[&str]) -> usize {
        let lines: Vec<&str> = text.lines().collect();
        self.add_document(title, &lines, tags, None)
    }

    /// Parse a text file into documents. Returns the number of documents added.
    pub fn add_file(&mut self, path: &Path) -> Result<usize> {
        let lines = read_lines(path, self.encoding)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let raw_docs = self.splitter.split(&name, path, &lines);
        let count = raw_docs.len();
        for raw in raw_docs {
            self.add_document::<_, &str>(&raw.title, &raw.lines, &[], Some(raw.source));
        }

        debug!(file = %path.display(), documents = count, "Parsed file");
        Ok(count)
    }

    /// Parse every `.txt` file in a directory, in file-name order.
    pub fn add_directory(&mut self, dir: &Path, recursive: bool) -> Result<usize> {
        let files = text_files(dir, recursive)?;
        if files.is_empty() {
            anyhow::bail!("No .txt files found in {}", dir.display());
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Parsing [{bar:30}] {pos}/{len} ({eta})")
                .context("Invalid progress bar template")?,
        );

        let mut added = 0;
        for file in &files {
            added += self.add_file(file)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            directory = %dir.display(),
            files = files.len(),
            documents = added,
            "Parsed directory"
        );
        Ok(added)
    }

    /// Prune singleton tokens and produce the TF-IDF weighted corpus.
    pub fn build(self) -> Result<Corpus> {
        let CorpusBuilder {
            tokenizer,
            options,
            encoding,
            documents,
            meta,
            frequency,
            tag_index,
            ..
        } = self;

        if documents.is_empty() {
            anyhow::bail!("No documents added, nothing to build");
        }

        let documents: Vec<Vec<String>> = documents
            .into_iter()
            .map(|doc| {
                doc.into_iter()
                    .filter(|token| frequency.get(token).copied().unwrap_or(0) > 1)
                    .collect()
            })
            .collect();

        info!(documents = documents.len(), "Building dictionary");
        let dictionary = Dictionary::from_documents(&documents);
        if dictionary.is_empty() {
            anyhow::bail!(
                "Vocabulary is empty after removing stop words and single-occurrence tokens \
                 ({} documents)",
                documents.len()
            );
        }

        info!(vocabulary = dictionary.len(), "Mapping documents to vector space");
        let bows: Vec<Bow> = documents.iter().map(|d| dictionary.doc2bow(d)).collect();
        let tfidf = TfidfModel::fit(&dictionary);
        let vectors: Vec<SparseVector> = bows.iter().map(|b| tfidf.transform(b)).collect();

        let empty = vectors.iter().filter(|v| v.is_empty()).count();
        if empty > 0 {
            debug!(empty, "Documents with no weighted terms");
        }

        Ok(Corpus {
            dictionary,
            tfidf,
            bows,
            vectors,
            documents: meta,
            tag_index,
            tokenizer,
            options,
            encoding,
            built_at: Utc::now(),
        })
    }
}

fn text_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        let is_txt = entry.path().extension().is_some_and(|ext| ext == "txt");
        if entry.file_type().is_file() && is_txt {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// A built, TF-IDF weighted document collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    dictionary: Dictionary,
    tfidf: TfidfModel,
    bows: Vec<Bow>,
    vectors: Vec<SparseVector>,
    documents: Vec<DocumentMeta>,
    tag_index: BTreeMap<String, Vec<usize>>,
    tokenizer: Tokenizer,
    options: ParseOptions,
    encoding: Encoding,
    built_at: DateTime<Utc>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocab_size(&self) -> usize {
        self.dictionary.len()
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn tfidf_model(&self) -> &TfidfModel {
        &self.tfidf
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn documents(&self) -> &[DocumentMeta] {
        &self.documents
    }

    pub fn document(&self, id: usize) -> Option<&DocumentMeta> {
        self.documents.get(id)
    }

    /// Title of a document, or a placeholder for an unknown id.
    pub fn title(&self, id: usize) -> &str {
        self.documents
            .get(id)
            .map(|d| d.title.as_str())
            .unwrap_or("<unknown document>")
    }

    pub fn vectors(&self) -> &[SparseVector] {
        &self.vectors
    }

    pub fn tfidf_for_doc(&self, id: usize) -> Option<&SparseVector> {
        self.vectors.get(id)
    }

    pub fn bow_for_doc(&self, id: usize) -> Option<&Bow> {
        self.bows.get(id)
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &[usize])> + '_ {
        self.tag_index.iter().map(|(t, ids)| (t.as_str(), ids.as_slice()))
    }

    /// Documents carrying `tag` (case-insensitive).
    pub fn docs_for_tag(&self, tag: &str) -> &[usize] {
        self.tag_index
            .get(&tag.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The `n` words that appear in the most documents.
    pub fn top_words(&self, n: usize) -> Vec<(String, usize)> {
        self.dictionary.most_frequent(n)
    }

    /// Run new text through the same pipeline the corpus was built with.
    pub fn text_to_tfidf(&self, text: &str) -> Result<SparseVector> {
        let splitter = self.options.compile()?;
        let tokens: Vec<String> = text
            .lines()
            .flat_map(|line| self.tokenizer.tokenize(&splitter.substitute(line)))
            .collect();
        let bow = self.dictionary.doc2bow(&tokens);
        Ok(self.tfidf.transform(&bow))
    }

    /// Read a whole file as one document and convert it to TF-IDF.
    pub fn file_to_tfidf(&self, path: &Path) -> Result<SparseVector> {
        let lines = read_lines(path, self.encoding)?;
        self.text_to_tfidf(&lines.join("\n"))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {}", dir.display()))?;
        let path = dir.join(CORPUS_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write corpus to {}", path.display()))?;
        debug!(path = %path.display(), "Saved corpus");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CORPUS_FILE);
        let file =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        let corpus: Corpus = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse corpus from {}", path.display()))?;
        debug!(
            path = %path.display(),
            documents = corpus.len(),
            vocabulary = corpus.vocab_size(),
            "Loaded corpus"
        );
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CorpusBuilder {
        CorpusBuilder::new(
            Tokenizer::new(["the", "and", "a"]),
            ParseOptions::default(),
            Encoding::Utf8,
        )
        .unwrap()
    }

    #[test]
    fn test_singleton_tokens_are_pruned() {
        let mut b = builder();
        b.add_text("one", "apples and pears", &[]);
        b.add_text("two", "apples and plums", &[]);
        let corpus = b.build().unwrap();
        assert_eq!(corpus.vocab_size(), 1);
        assert!(corpus.dictionary().token_id("apples").is_some());
        assert!(corpus.dictionary().token_id("pears").is_none());
    }

    #[test]
    fn test_repeated_token_within_one_document_survives() {
        let mut b = builder();
        b.add_text("one", "echo echo", &[]);
        b.add_text("two", "silence", &[]);
        let corpus = b.build().unwrap();
        assert_eq!(corpus.vocab_size(), 1);
        assert_eq!(corpus.bow_for_doc(0).unwrap(), &vec![(0, 2)]);
        assert!(corpus.bow_for_doc(1).unwrap().is_empty());
    }

    #[test]
    fn test_tags_are_indexed_lowercase() {
        let mut b = builder();
        b.add_text("one", "river stone", &["Nature", "nature"]);
        b.add_text("two", "river stone", &["NATURE", "!City"]);
        let corpus = b.build().unwrap();
        assert_eq!(corpus.docs_for_tag("nature"), &[0, 1]);
        assert_eq!(corpus.docs_for_tag("!city"), &[1]);
        assert!(corpus.docs_for_tag("ocean").is_empty());
        assert_eq!(corpus.document(0).unwrap().tags, vec!["Nature", "nature"]);
    }

    #[test]
    fn test_build_empty_fails() {
        assert!(builder().build().is_err());
    }

    #[test]
    fn test_build_without_vocabulary_fails() {
        let mut b = builder();
        b.add_text("one", "unique words only", &[]);
        assert!(b.build().is_err());
    }

    #[test]
    fn test_text_to_tfidf_uses_corpus_pipeline() {
        let mut b = builder();
        b.add_text("one", "river stone", &[]);
        b.add_text("two", "river moss", &[]);
        b.add_text("three", "moss moss", &[]);
        let corpus = b.build().unwrap();
        let vec = corpus.text_to_tfidf("The RIVER, and a dragon").unwrap();
        let river = corpus.dictionary().token_id("river").unwrap();
        assert_eq!(vec.len(), 1);
        assert_eq!(vec[0].0, river);
    }
}
