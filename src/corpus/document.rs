// Per-document metadata and source-file line decoding.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Character encoding of the source text files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl Encoding {
    /// Decode a single line, returning `None` if the bytes are invalid.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf-8"),
            Encoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => anyhow::bail!("Unsupported encoding '{other}' (expected utf-8 or latin-1)"),
        }
    }
}

/// Where a document lives on disk: a file and an inclusive, 1-based line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines {} - {}",
            self.path.display(),
            self.start_line,
            self.end_line
        )
    }
}

/// Metadata kept for every document in the corpus, indexed by document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: usize,
    pub title: String,
    /// Tags exactly as supplied; the tag index uses their lowercase form.
    pub tags: Vec<String>,
    pub source: Option<SourceSpan>,
    /// Raw lines of documents that were added from memory rather than a file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_lines: Vec<String>,
}

/// Read a text file as decoded lines.
///
/// Lines are split on `\n` with any trailing `\r` removed. A line that cannot
/// be decoded aborts the read with an error naming the file and line number.
pub fn read_lines(path: &Path, encoding: Encoding) -> Result<Vec<String>> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut raw_lines: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();
    if raw_lines.last().is_some_and(|l| l.is_empty()) {
        raw_lines.pop();
    }

    raw_lines
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            encoding.decode(raw).ok_or_else(|| {
                anyhow::anyhow!(
                    "Failed to decode line {} of {} as {}",
                    i + 1,
                    path.display(),
                    encoding
                )
            })
        })
        .collect()
}
