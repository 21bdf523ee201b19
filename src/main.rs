use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use simsearch::cluster::dbscan::DbscanClusterer;
use simsearch::cluster::diagnostics;
use simsearch::cluster::kmeans::KMeansClusterer;
use simsearch::cluster::traits::DocumentClusterer;
use simsearch::config::Config;
use simsearch::corpus::parser::ParseOptions;
use simsearch::corpus::CorpusBuilder;
use simsearch::output::terminal;
use simsearch::search::{KeySearch, SimSearch};

/// simsearch: latent semantic similarity search for text collections.
///
/// Builds a TF-IDF + LSI index over a directory of text files, then finds
/// documents by keyword, by similarity to another document, or by similarity
/// to free text.
#[derive(Parser)]
#[command(name = "simsearch", version, about)]
struct Cli {
    /// Index directory (overrides SIMSEARCH_INDEX_DIR)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a directory of .txt files and build the index
    Build {
        /// Directory containing the source text files
        source: PathBuf,

        /// Regex marking the first line of each document (default: blank-line paragraphs)
        #[arg(long)]
        doc_start: Option<String>,

        /// Keep the matching line as part of the new document instead of
        /// treating it as a separator
        #[arg(long)]
        keep_start_line: bool,

        /// Treat each file as a single document
        #[arg(long, conflicts_with = "doc_start")]
        whole_files: bool,

        /// Substitution applied to every line, as PATTERN=REPLACEMENT (repeatable)
        #[arg(long = "sub", value_name = "PATTERN=REPLACEMENT")]
        subs: Vec<String>,

        /// Descend into subdirectories
        #[arg(long)]
        recursive: bool,

        /// Number of LSI topics (overrides SIMSEARCH_NUM_TOPICS)
        #[arg(long)]
        topics: Option<usize>,
    },

    /// Show index status (files, corpus size, build time)
    Status,

    /// Show the words that appear in the most documents
    TopWords {
        #[arg(long, default_value = "30")]
        n: usize,
    },

    /// Find documents containing all of the included words and none of the excluded
    Keyword {
        /// Words every result must contain
        #[arg(long = "include", required = true)]
        includes: Vec<String>,

        /// Words no result may contain
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Show the source text of each result (at most this many lines)
        #[arg(long)]
        show_lines: Option<usize>,
    },

    /// Find documents similar to a document in the corpus
    SimilarDoc {
        doc_id: usize,

        #[arg(long, default_value = "10")]
        topn: usize,

        /// Explain the top match word by word
        #[arg(long)]
        explain: bool,
    },

    /// Find documents similar to free text, or to the contents of a file
    SimilarText {
        /// Query text
        #[arg(required_unless_present = "file")]
        text: Option<String>,

        /// Read the query from a file instead
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        #[arg(long, default_value = "10")]
        topn: usize,

        /// Explain each match word by word
        #[arg(long)]
        explain: bool,

        /// Hide words contributing less than this to an explained match
        #[arg(long, default_value = "0")]
        min_contribution: f64,
    },

    /// Find documents resembling those carrying a tag
    MoreOfTag {
        tag: String,

        #[arg(long, default_value = "10")]
        topn: usize,
    },

    /// Print the source text of a document
    Show {
        doc_id: usize,

        #[arg(long, default_value = "100")]
        max_lines: usize,
    },

    /// Print the top words of each LSI topic
    Topics {
        #[arg(long, default_value = "10")]
        count: usize,

        #[arg(long, default_value = "8")]
        words: usize,
    },

    /// Cluster all documents and label each cluster by its top words
    Cluster {
        #[command(subcommand)]
        method: ClusterMethod,

        /// Words shown per cluster
        #[arg(long, default_value = "10", global = true)]
        top_words: usize,
    },

    /// Histogram of nearest-neighbour cosine distances (for choosing DBSCAN eps)
    TuneEps {
        #[arg(long, default_value = "16")]
        bins: usize,
    },

    /// Histogram of neighbour counts within eps (for choosing DBSCAN min-samples)
    TuneMinPts {
        #[arg(long)]
        eps: f64,

        #[arg(long, default_value = "60")]
        bins: usize,
    },

    /// Run k-means over a range of k and locate the elbow
    Elbow {
        #[arg(long, default_value = "1")]
        from: usize,

        #[arg(long, default_value = "40")]
        to: usize,

        #[arg(long, default_value = "2")]
        step: usize,
    },
}

#[derive(Subcommand)]
enum ClusterMethod {
    /// K-means with k-means++ initialisation
    Kmeans {
        #[arg(long, default_value = "10")]
        k: usize,

        #[arg(long, default_value = "100")]
        max_iterations: u64,
    },

    /// DBSCAN with a cosine-distance radius
    Dbscan {
        #[arg(long, default_value = "0.44")]
        eps: f64,

        #[arg(long, default_value = "4")]
        min_samples: usize,
    },
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("simsearch=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.index_dir {
        config.index_dir = dir;
    }

    match cli.command {
        Commands::Build {
            source,
            doc_start,
            keep_start_line,
            whole_files,
            subs,
            recursive,
            topics,
        } => {
            let options = ParseOptions {
                sub_patterns: parse_subs(&subs)?,
                doc_start_pattern: if whole_files {
                    None
                } else {
                    Some(doc_start.unwrap_or_else(|| r"^\s*$".to_string()))
                },
                doc_start_is_separator: !keep_start_line,
            };

            println!("Parsing {}...", source.display());
            let mut builder = CorpusBuilder::new(config.tokenizer()?, options, config.encoding)?;
            builder.add_directory(&source, recursive)?;

            println!("Building corpus...");
            let corpus = builder.build()?;
            terminal::display_top_words(&corpus.top_words(30));
            println!(
                "\nVocabulary contains {} unique words.",
                corpus.vocab_size()
            );
            println!(
                "Corpus contains {} documents represented by tf-idf vectors.",
                corpus.len()
            );

            let num_topics = topics.unwrap_or(config.num_topics);
            println!("\nTraining LSI with {num_topics} topics...");
            let search = SimSearch::train(KeySearch::new(corpus), num_topics)?;

            search.save(&config.index_dir)?;
            println!(
                "\n{} Index saved to {}",
                "Done.".bold(),
                config.index_dir.display()
            );
        }

        Commands::Status => {
            simsearch::status::show(&config.index_dir)?;
        }

        Commands::TopWords { n } => {
            let search = load_search(&config)?;
            terminal::display_top_words(&search.keys().top_words(n));
            println!(
                "\nVocabulary contains {} unique words.",
                search.keys().vocab_size()
            );
        }

        Commands::Keyword {
            includes,
            excludes,
            show_lines,
        } => {
            let search = load_search(&config)?;
            let keys = search.keys();
            let results = keys.keyword_search(&includes, &excludes, &[]);
            terminal::display_keyword_results(search.corpus(), &includes, &excludes, &results);

            if let Some(max_lines) = show_lines {
                for doc_id in &results {
                    terminal::display_doc_source(&keys.doc_source(*doc_id, max_lines)?);
                }
            }
        }

        Commands::SimilarDoc {
            doc_id,
            topn,
            explain,
        } => {
            let search = load_search(&config)?;
            let keys = search.keys();

            terminal::display_doc_source(&keys.doc_source(doc_id, 5)?);
            let results = search.find_similar_to_doc(doc_id, topn)?;
            terminal::display_results(search.corpus(), "Most similar documents:", &results);

            if explain {
                if let Some(&(best, _)) = results.first() {
                    terminal::display_doc_source(&keys.doc_source(best, 8)?);
                    let interpretation = search.interpret_match(
                        keys.tfidf_for_doc(doc_id)?,
                        keys.tfidf_for_doc(best)?,
                        0.0,
                    );
                    terminal::display_interpretation(&interpretation);
                }
            }
        }

        Commands::SimilarText {
            text,
            file,
            topn,
            explain,
            min_contribution,
        } => {
            let search = load_search(&config)?;
            let keys = search.keys();

            let query = match (&file, &text) {
                (Some(path), _) => keys.tfidf_for_file(path)?,
                (None, Some(text)) => keys.tfidf_for_text(text)?,
                (None, None) => anyhow::bail!("Provide query text or --file"),
            };
            if query.is_empty() {
                println!(
                    "{}",
                    "None of the query words are in the corpus vocabulary.".yellow()
                );
            }

            let results = search.find_similar_to_vector(&query, topn, &[]);
            terminal::display_results(search.corpus(), "Most similar documents:", &results);

            if explain {
                for &(doc_id, _) in &results {
                    terminal::display_doc_source(&keys.doc_source(doc_id, 8)?);
                    let interpretation =
                        search.interpret_match(&query, keys.tfidf_for_doc(doc_id)?, min_contribution);
                    terminal::display_interpretation(&interpretation);
                }
            }
        }

        Commands::MoreOfTag { tag, topn } => {
            let search = load_search(&config)?;
            let matches = search.find_more_of_tag(&tag, topn)?;
            terminal::display_tag_matches(search.corpus(), &matches);
        }

        Commands::Show { doc_id, max_lines } => {
            let search = load_search(&config)?;
            terminal::display_doc_source(&search.keys().doc_source(doc_id, max_lines)?);
        }

        Commands::Topics { count, words } => {
            let search = load_search(&config)?;
            let topics: Vec<(usize, Vec<(String, f64)>)> = (0..count.min(search.lsi().num_topics()))
                .map(|t| (t, search.topic_words(t, words)))
                .collect();
            terminal::display_topics(&topics);
        }

        Commands::Cluster { method, top_words } => {
            let search = load_search(&config)?;
            let clusterer: Box<dyn DocumentClusterer> = match method {
                ClusterMethod::Kmeans { k, max_iterations } => {
                    info!(k, "Clustering with k-means");
                    Box::new(KMeansClusterer {
                        k,
                        max_iterations,
                        ..Default::default()
                    })
                }
                ClusterMethod::Dbscan { eps, min_samples } => {
                    info!(eps, min_samples, "Clustering with DBSCAN");
                    Box::new(DbscanClusterer::new(eps, min_samples))
                }
            };

            println!("Clustering {} documents...", search.index().len());
            let clusters =
                simsearch::cluster::cluster_documents(&search, clusterer.as_ref(), top_words)?;
            terminal::display_clusters(&clusters);
        }

        Commands::TuneEps { bins } => {
            let search = load_search(&config)?;
            let distances = diagnostics::nearest_neighbor_distances(search.index())?;
            terminal::display_histogram(
                "=== Nearest neighbour distances ===",
                &diagnostics::histogram(&distances, bins),
            );
        }

        Commands::TuneMinPts { eps, bins } => {
            let search = load_search(&config)?;
            let counts: Vec<f64> = diagnostics::neighbor_counts(search.index(), eps)
                .into_iter()
                .map(|c| c as f64)
                .collect();
            terminal::display_histogram(
                &format!("=== Number of neighbours within {eps} ==="),
                &diagnostics::histogram(&counts, bins),
            );
        }

        Commands::Elbow { from, to, step } => {
            if step == 0 {
                anyhow::bail!("--step must be at least 1");
            }
            let search = load_search(&config)?;
            let ks: Vec<usize> = (from..=to).step_by(step).collect();
            let vectors = search.index().to_array()?;
            let analysis = diagnostics::elbow(&vectors, &ks)?;
            terminal::display_elbow(&analysis);
        }
    }

    Ok(())
}

fn load_search(config: &Config) -> Result<SimSearch> {
    config.require_index()?;
    info!(dir = %config.index_dir.display(), "Loading index");
    SimSearch::load(&config.index_dir)
}

/// Parse `PATTERN=REPLACEMENT` pairs. The split is on the last `=` so that
/// patterns may contain `=`.
fn parse_subs(subs: &[String]) -> Result<Vec<(String, String)>> {
    subs.iter()
        .map(|s| match s.rsplit_once('=') {
            Some((pattern, replacement)) if !pattern.is_empty() => {
                Ok((pattern.to_string(), replacement.to_string()))
            }
            _ => anyhow::bail!("Invalid substitution '{s}': expected PATTERN=REPLACEMENT"),
        })
        .collect()
}
