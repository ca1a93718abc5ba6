use clap::{Parser, Subcommand};
use docdex_context::TextChunker;
use docdex_retriever::config::RetrieverConfig;
use docdex_retriever::retrieval::indexer::Indexer;
use docdex_retriever::storage::sqlite_store::SqliteStore;
use docdex_retriever::storage::DocumentStore;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// Index a folder of support documents and query it with hybrid search.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Documents directory (overrides the config file)
    #[arg(short, long)]
    docs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one indexing pass over the documents directory
    Index,
    /// Search the index with hybrid ranking
    Search {
        /// Natural-language query
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
        /// Minimum base similarity (-1.0 admits everything)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assemble a context block for a query
    Context {
        /// Natural-language query
        query: String,
    },
    /// Re-index the documents directory on a fixed cadence until interrupted
    Watch {
        /// Seconds between passes
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RetrieverConfig::load(path)?,
        None => RetrieverConfig::default(),
    };
    if let Some(docs) = args.docs {
        config.docs_path = docs;
    }

    let store = Arc::new(SqliteStore::open(&config.docs_path).await?);

    if let Commands::Stats = &args.command {
        let stats = store.stats().await?;
        println!(
            "{} chunks across {} files in {}",
            stats.chunk_count,
            stats.file_count,
            config.docs_path.display()
        );
        return Ok(());
    }

    let provider = docdex_embed::create_provider(&config.embedding).await?;
    let chunker = TextChunker::new(
        config.chunk_size,
        config.chunk_overlap,
        config.separator.clone(),
    );
    let indexer = Arc::new(Indexer::new(
        config.docs_path.clone(),
        chunker,
        store,
        provider,
        None,
        config.limit,
        config.max_context_chars,
    ));

    match args.command {
        Commands::Index => {
            let results = indexer.index_directory().await?;
            for (filename, chunks) in &results {
                println!("{filename}: {chunks} chunks");
            }
            println!(
                "Indexed {} files, {} chunks total",
                results.len(),
                results.values().sum::<usize>()
            );
        }
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => {
            let results = indexer
                .search(
                    &query,
                    limit.unwrap_or(config.limit),
                    threshold.unwrap_or(config.similarity_threshold),
                )
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (idx, result) in results.iter().enumerate() {
                    println!(
                        "{}. [{}#{}] similarity={:.4} (base={:.4}, boost={:.2})",
                        idx + 1,
                        result.filename,
                        result.chunk_index,
                        result.similarity,
                        result.base_similarity,
                        result.keyword_boost
                    );
                    let preview: String = result.content.chars().take(160).collect();
                    println!("   {preview}");
                }
            }
        }
        Commands::Context { query } => {
            let context = indexer.search_context(&query).await?;
            if context.is_empty() {
                println!("No relevant knowledge found.");
            } else {
                println!("{context}");
            }
        }
        Commands::Watch { interval } => {
            let interval =
                Duration::from_secs(interval.unwrap_or(config.watch_interval_secs));
            let watcher = Arc::clone(&indexer);
            let handle = tokio::spawn(async move {
                watcher.watch_directory(interval).await;
            });

            tokio::signal::ctrl_c().await?;
            eprintln!("Stopping after the current pass...");
            indexer.stop_watching();
            handle.await?;
        }
        Commands::Stats => unreachable!("handled before provider setup"),
    }

    Ok(())
}
