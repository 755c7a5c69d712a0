use anyhow::Result;
use clap::{Parser, Subcommand};
use dexi::index::SearchIndex;
use dexi::trie::Trie;
use dexi::utils::Stopwords;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dexi")]
#[command(about = "Incremental search index builder for generated documentation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one index scan over a set of stale pages
    Scan {
        /// Root of the generated documentation pages
        scan_dir: PathBuf,

        /// Directory for published output (search records, trie_index.js)
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Directory for private state reloaded across runs
        #[arg(short, long)]
        private_dir: PathBuf,

        /// Custom stopword list (whitespace-separated words)
        #[arg(long)]
        stop_words: Option<PathBuf>,

        /// Stale pages to re-index; every .html page under the scan
        /// directory when omitted (full rebuild)
        files: Vec<PathBuf>,
    },
    /// Print indexed tokens from a private trie, optionally prefix-filtered
    Tokens {
        /// Directory holding search.trie
        #[arg(short, long)]
        private_dir: PathBuf,

        /// Only print tokens starting with this prefix
        prefix: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            scan_dir,
            output_dir,
            private_dir,
            stop_words,
            files,
        } => {
            let stop_words = match stop_words {
                Some(path) => Stopwords::from_file(&path)?,
                None => Stopwords::default(),
            };

            let stale = if files.is_empty() {
                collect_pages(&scan_dir)
            } else {
                files.into_iter().collect()
            };

            let mut engine =
                SearchIndex::with_stop_words(scan_dir, output_dir, private_dir, stop_words)?;
            engine.scan(&stale)?;
            println!("Indexed {} token(s)", engine.index().len());
        }
        Commands::Tokens {
            private_dir,
            prefix,
        } => {
            let trie = Trie::from_file(&private_dir.join("search.trie"))?;
            let tokens = match prefix {
                Some(prefix) => trie.complete(&prefix, usize::MAX),
                None => trie.tokens(),
            };
            for token in tokens {
                println!("{}", token);
            }
        }
    }

    Ok(())
}

/// Every .html page under the scan directory (full rebuild)
fn collect_pages(scan_dir: &std::path::Path) -> BTreeSet<PathBuf> {
    WalkBuilder::new(scan_dir)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == "html" || ext == "htm")
        })
        .map(|entry| entry.into_path())
        .collect()
}
