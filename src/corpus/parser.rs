// Splitting source files into documents.
//
// A file is cut into documents wherever a line matches the document-start
// pattern. Substitution patterns rewrite each line before it is tokenized,
// but never the text on disk, so line numbers in a SourceSpan always point
// at the original file.

use std::path::Path;

use anyhow::{Context, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::document::SourceSpan;

/// How raw text lines are turned into documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// `(pattern, replacement)` pairs applied in order to every line.
    pub sub_patterns: Vec<(String, String)>,
    /// A line matching this pattern starts a new document.
    /// Without it, each file is a single document.
    pub doc_start_pattern: Option<String>,
    /// Whether the matching line is a separator that belongs to no document.
    pub doc_start_is_separator: bool,
}

impl ParseOptions {
    /// Blank-line separated paragraphs, the most common layout for prose.
    pub fn paragraphs() -> Self {
        Self {
            sub_patterns: Vec::new(),
            doc_start_pattern: Some(r"^\s*$".to_string()),
            doc_start_is_separator: true,
        }
    }

    pub fn compile(&self) -> Result<DocumentSplitter> {
        let subs = self
            .sub_patterns
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern)
                    .with_context(|| format!("Invalid substitution pattern '{pattern}'"))
                    .map(|re| (re, replacement.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let doc_start = self
            .doc_start_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("Invalid document start pattern '{pattern}'"))
            })
            .transpose()?;

        Ok(DocumentSplitter {
            subs,
            doc_start,
            separator: self.doc_start_is_separator,
        })
    }
}

/// A document cut from a file, before tokenization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub title: String,
    pub lines: Vec<String>,
    pub source: SourceSpan,
}

/// Compiled form of [`ParseOptions`].
#[derive(Debug)]
pub struct DocumentSplitter {
    subs: Vec<(Regex, String)>,
    doc_start: Option<Regex>,
    separator: bool,
}

impl DocumentSplitter {
    /// Apply every substitution pattern to a line.
    pub fn substitute(&self, line: &str) -> String {
        let mut out = line.to_string();
        for (re, replacement) in &self.subs {
            out = re.replace_all(&out, replacement.as_str()).into_owned();
        }
        out
    }

    /// Cut the lines of one file into documents.
    ///
    /// Leading and trailing blank lines are trimmed from each document, and
    /// documents with no text at all are skipped.
    pub fn split(&self, name: &str, path: &Path, lines: &[String]) -> Vec<RawDocument> {
        let mut documents = Vec::new();
        let mut current: Vec<(usize, &str)> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let starts_new = self
                .doc_start
                .as_ref()
                .is_some_and(|re| re.is_match(line));

            if starts_new {
                if let Some(doc) = finish_document(name, path, &current) {
                    documents.push(doc);
                }
                current.clear();
                if self.separator {
                    continue;
                }
            }

            current.push((idx + 1, line.as_str()));
        }

        if let Some(doc) = finish_document(name, path, &current) {
            documents.push(doc);
        }

        documents
    }
}

fn finish_document(name: &str, path: &Path, lines: &[(usize, &str)]) -> Option<RawDocument> {
    let first = lines.iter().position(|(_, l)| !l.trim().is_empty())?;
    let last = lines.iter().rposition(|(_, l)| !l.trim().is_empty())?;
    let lines = &lines[first..=last];

    let title = format!("{} - {}", name, lines[0].1.trim());

    Some(RawDocument {
        title,
        lines: lines.iter().map(|(_, l)| l.to_string()).collect(),
        source: SourceSpan {
            path: path.to_path_buf(),
            start_line: lines[0].0,
            end_line: lines[lines.len() - 1].0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_whole_file_is_one_document_without_pattern() {
        let splitter = ParseOptions::default().compile().unwrap();
        let docs = splitter.split("book", Path::new("book.txt"), &lines("\nFirst\nSecond\n\n"));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "book - First");
        assert_eq!(docs[0].lines, vec!["First", "Second"]);
        assert_eq!(docs[0].source.start_line, 2);
        assert_eq!(docs[0].source.end_line, 3);
    }

    #[test]
    fn test_blank_line_separated_paragraphs() {
        let splitter = ParseOptions::paragraphs().compile().unwrap();
        let text = "One a\nOne b\n\n\nTwo a\n   \nThree a\n";
        let docs = splitter.split("f", Path::new("f.txt"), &lines(text));
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].source.start_line, 1);
        assert_eq!(docs[0].source.end_line, 2);
        assert_eq!(docs[1].title, "f - Two a");
        assert_eq!(docs[1].source.start_line, 5);
        assert_eq!(docs[2].source.start_line, 7);
    }

    #[test]
    fn test_start_line_kept_when_not_separator() {
        let options = ParseOptions {
            doc_start_pattern: Some(r"^CHAPTER".to_string()),
            doc_start_is_separator: false,
            ..Default::default()
        };
        let splitter = options.compile().unwrap();
        let text = "CHAPTER 1\nIt begins.\nCHAPTER 2\nIt ends.";
        let docs = splitter.split("novel", Path::new("novel.txt"), &lines(text));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "novel - CHAPTER 1");
        assert_eq!(docs[1].lines, vec!["CHAPTER 2", "It ends."]);
        assert_eq!(docs[1].source.start_line, 3);
    }

    #[test]
    fn test_substitutions_apply_in_order() {
        let options = ParseOptions {
            sub_patterns: vec![
                ("“".to_string(), " ".to_string()),
                ("”".to_string(), " ".to_string()),
                ("colour".to_string(), "color".to_string()),
            ],
            ..Default::default()
        };
        let splitter = options.compile().unwrap();
        assert_eq!(splitter.substitute("“red colour”"), " red color ");
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let options = ParseOptions {
            doc_start_pattern: Some("(unclosed".to_string()),
            ..Default::default()
        };
        assert!(options.compile().is_err());
    }

    #[test]
    fn test_empty_file_has_no_documents() {
        let splitter = ParseOptions::paragraphs().compile().unwrap();
        assert!(splitter.split("e", Path::new("e.txt"), &[]).is_empty());
    }
}
