// Index status: file sizes, corpus stats, and build time.

use anyhow::Result;
use std::path::Path;

use crate::corpus::builder::CORPUS_FILE;
use crate::corpus::Corpus;
use crate::search::similarity::{INDEX_FILE, LSI_FILE};

/// Display index status to the terminal.
pub fn show(index_dir: &Path) -> Result<()> {
    let corpus_path = index_dir.join(CORPUS_FILE);
    if !corpus_path.exists() {
        println!("Index: not built ({})", index_dir.display());
        println!("\nRun `simsearch build <dir>` to create it.");
        return Ok(());
    }

    println!("Index: {}", index_dir.display());
    for name in [CORPUS_FILE, LSI_FILE, INDEX_FILE] {
        let size = std::fs::metadata(index_dir.join(name))
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "missing".to_string());
        println!("  {:<12} {}", name, size);
    }

    let corpus = Corpus::load(index_dir)?;
    println!(
        "Corpus: {} documents, {} unique words",
        corpus.len(),
        corpus.vocab_size()
    );
    println!("Encoding: {}", corpus.encoding());

    let tag_count = corpus.tags().count();
    if tag_count > 0 {
        println!("Tags: {}", tag_count);
    }

    let files: std::collections::BTreeSet<&Path> = corpus
        .documents()
        .iter()
        .filter_map(|d| d.source.as_ref().map(|s| s.path.as_path()))
        .collect();
    println!("Source files: {}", files.len());
    println!("Built: {}", corpus.built_at().format("%Y-%m-%d %H:%M:%S UTC"));

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
