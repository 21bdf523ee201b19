// Colored terminal output for search results, source text and diagnostics.
//
// main.rs gathers results from the library and delegates all formatting here.

use colored::Colorize;

use crate::cluster::diagnostics::{ElbowAnalysis, HistogramBin};
use crate::cluster::ClusterSummary;
use crate::corpus::Corpus;
use crate::search::interpret::{MatchInterpretation, WordContribution};
use crate::search::{DocSource, ScoredDoc, TagMatches};

/// Display ranked similarity results with document titles.
pub fn display_results(corpus: &Corpus, heading: &str, results: &[ScoredDoc]) {
    println!("\n{}", heading.bold());

    if results.is_empty() {
        println!("  {}", "No similar documents found.".dimmed());
        return;
    }

    for (doc_id, sim) in results {
        println!(
            "  {}  {:>6}  {}",
            colorize_similarity(*sim),
            format!("#{doc_id}").dimmed(),
            super::truncate_chars(corpus.title(*doc_id), 100)
        );
    }
}

/// Display the original text of a document, framed by its location.
pub fn display_doc_source(source: &DocSource) {
    let location = source
        .location
        .as_ref()
        .map(|span| span.to_string())
        .unwrap_or_else(|| "(in-memory document)".to_string());

    println!(
        "\n{} {}",
        format!("Doc {}:", source.doc_id).bold(),
        source.title
    );
    println!("  {}", location.dimmed());
    println!();

    for line in &source.lines {
        println!("    {line}");
    }

    if source.is_truncated() {
        println!(
            "    {}",
            format!(
                "... ({} more lines)",
                source.total_lines - source.lines.len()
            )
            .dimmed()
        );
    }
}

/// Display the most widespread words in the vocabulary.
pub fn display_top_words(words: &[(String, usize)]) {
    println!(
        "\n{}",
        format!("=== Top {} most frequent words ===", words.len()).bold()
    );
    for (word, df) in words {
        println!("  {:<24} {:>6} docs", word, df);
    }
}

/// Display keyword search hits.
pub fn display_keyword_results(
    corpus: &Corpus,
    includes: &[String],
    excludes: &[String],
    results: &[usize],
) {
    println!("\n{}", "=== Keyword search ===".bold());
    println!("  Including: {}", includes.join(", "));
    if !excludes.is_empty() {
        println!("  Excluding: {}", excludes.join(", "));
    }
    println!("  Found {} results.\n", results.len());

    for doc_id in results {
        println!(
            "  {:>6}  {}",
            format!("#{doc_id}").dimmed(),
            corpus.title(*doc_id)
        );
    }
}

/// Display the input documents and results of a "more of this tag" query.
pub fn display_tag_matches(corpus: &Corpus, matches: &TagMatches) {
    println!(
        "\n{}",
        format!("=== More documents like \"{}\" ===", matches.tag).bold()
    );
    println!("\n  Input documents:");
    for doc_id in &matches.inputs {
        println!("    {}", corpus.title(*doc_id));
    }
    display_results(corpus, "Results:", &matches.results);
}

/// Display the word-level breakdown of a match.
pub fn display_interpretation(interpretation: &MatchInterpretation) {
    println!(
        "\n{} {}",
        "Similarity:".bold(),
        colorize_similarity(interpretation.similarity)
    );

    display_contributions("Words in input", &interpretation.input_words);
    display_contributions("Words in match", &interpretation.match_words);
}

fn display_contributions(heading: &str, words: &[WordContribution]) {
    println!("\n  {heading}:");
    if words.is_empty() {
        println!("    {}", "(none above threshold)".dimmed());
        return;
    }
    println!(
        "    {:<20} {:>8} {:>8}",
        "Word".dimmed(),
        "Weight".dimmed(),
        "Contrib".dimmed()
    );
    for w in words {
        println!("    {:<20} {:>8.3} {:>8.3}", w.word, w.weight, w.contribution);
    }
}

/// Display cluster sizes and labels.
pub fn display_clusters(clusters: &[ClusterSummary]) {
    let real = clusters.iter().filter(|c| c.label.is_some()).count();
    println!(
        "\n{}",
        format!("=== {real} clusters (excluding noise) ===").bold()
    );

    for cluster in clusters {
        let label = match cluster.label {
            Some(l) => format!("Cluster {l}").normal(),
            None => "Noise".yellow(),
        };
        println!(
            "  {:<12} ({:>4} docs)  {}",
            label,
            cluster.doc_ids.len(),
            cluster.top_words.join(" ").dimmed()
        );
    }
}

/// Display the words defining each LSI topic.
pub fn display_topics(topics: &[(usize, Vec<(String, f64)>)]) {
    println!("\n{}", "=== LSI topics ===".bold());
    for (topic, words) in topics {
        let terms: Vec<String> = words
            .iter()
            .map(|(w, loading)| format!("{:.3}*{}", loading, w))
            .collect();
        println!("  {:>3}: {}", topic, terms.join(" + "));
    }
}

/// Display a histogram with cumulative percentages.
pub fn display_histogram(title: &str, bins: &[HistogramBin]) {
    println!("\n{}", title.bold());

    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let bar_width: usize = 30;

    for bin in bins {
        let filled = (bin.count as f64 / max_count as f64 * bar_width as f64).round() as usize;
        println!(
            "  {:>7.2}% < {:<8.3} {:>6}  {}",
            bin.cumulative_percent,
            bin.upper,
            bin.count,
            "=".repeat(filled).bright_blue()
        );
    }
}

/// Display the elbow curve as a table, marking the chosen k.
pub fn display_elbow(analysis: &ElbowAnalysis) {
    println!("\n{}", "=== Elbow method (k-means) ===".bold());
    println!("  {:>5}  {:>14}", "k".dimmed(), "avg within SS".dimmed());

    for point in &analysis.points {
        let marker = if Some(point.k) == analysis.best_k {
            "<- elbow".green().bold().to_string()
        } else {
            String::new()
        };
        println!("  {:>5}  {:>14.5}  {}", point.k, point.avg_within_ss, marker);
    }

    if analysis.best_k.is_none() {
        println!("  {}", "Need at least three values of k to locate an elbow.".dimmed());
    }
}

/// Colorize a similarity value.
fn colorize_similarity(sim: f64) -> colored::ColoredString {
    let text = format!("{:>5.2}", sim);
    if sim >= 0.75 {
        text.green().bold()
    } else if sim >= 0.5 {
        text.green()
    } else if sim >= 0.25 {
        text.yellow()
    } else {
        text.dimmed()
    }
}
