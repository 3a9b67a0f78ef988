//! # docchat CLI
//!
//! The `docchat` binary drives the retrieval-augmented document chat
//! service: index initialization, document ingestion, retrieval, chat,
//! and the HTTP server.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat init` | Create the vector index and storage directories |
//! | `docchat ingest [FILE]` | Process one file, or the whole documents directory |
//! | `docchat search "<query>"` | Retrieve the nearest chunks for a query |
//! | `docchat ask "<question>"` | One-shot retrieval-augmented chat turn |
//! | `docchat status` | Summary of processed documents and indexed vectors |
//! | `docchat serve` | Start the JSON HTTP API |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docchat::chat::ChatSession;
use docchat::config::load_config;
use docchat::embedding::create_embedder;
use docchat::metadata::MetadataStore;
use docchat::pipeline::{self, ProcessOutcome};
use docchat::retrieve::search_chunks;
use docchat::store::SqliteVectorStore;
use docchat::{chat, server, status};

/// docchat — chat with your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; see `config/docchat.example.toml`.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "A retrieval-augmented document chat service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector index and storage directories. Idempotent.
    Init,

    /// Process documents: extract, chunk, embed, and index.
    ///
    /// With FILE, processes that single document. Without it, scans the
    /// configured documents directory; one file's failure does not stop
    /// the rest of the batch.
    Ingest {
        /// A single document to process instead of the whole directory.
        file: Option<PathBuf>,
    },

    /// Retrieve the chunks nearest to a query, with distances.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (defaults to retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask a question against the indexed documents (single chat turn).
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Show the processed-document summary.
    Status,

    /// Start the JSON HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            std::fs::create_dir_all(&config.storage.documents_dir)?;
            let store = SqliteVectorStore::open(&config.storage.index_path).await?;
            store.close().await;
            let meta = MetadataStore::load(&config.storage.metadata_path);
            meta.save()?;

            println!("init");
            println!("  documents dir: {}", config.storage.documents_dir.display());
            println!("  metadata: {}", config.storage.metadata_path.display());
            println!("  vector index: {}", config.storage.index_path.display());
            println!("ok");
        }

        Commands::Ingest { file } => {
            let embedder = create_embedder(&config.embedding)?;
            let store = SqliteVectorStore::open(&config.storage.index_path).await?;
            let mut meta = MetadataStore::load(&config.storage.metadata_path);

            let results = match file {
                Some(path) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let result =
                        pipeline::process_file(&config, embedder.as_ref(), &store, &mut meta, &path)
                            .await;
                    vec![(name, result)]
                }
                None => {
                    pipeline::process_all(&config, embedder.as_ref(), &store, &mut meta).await
                }
            };

            let mut indexed = 0u64;
            let mut unchanged = 0u64;
            let mut failed = 0u64;

            println!("ingest");
            for (name, result) in &results {
                match result {
                    Ok(ProcessOutcome::Indexed { chunks }) => {
                        indexed += 1;
                        println!("  {}: indexed ({} chunks)", name, chunks);
                    }
                    Ok(ProcessOutcome::Unchanged) => {
                        unchanged += 1;
                        println!("  {}: unchanged", name);
                    }
                    Err(e) => {
                        failed += 1;
                        println!("  {}: failed ({})", name, e);
                    }
                }
            }
            println!("  indexed: {}", indexed);
            println!("  unchanged: {}", unchanged);
            println!("  failed: {}", failed);
            println!("ok");

            store.close().await;
        }

        Commands::Search { query, limit } => {
            let embedder = create_embedder(&config.embedding)?;
            let store = SqliteVectorStore::open(&config.storage.index_path).await?;
            let top_k = limit.unwrap_or(config.retrieval.top_k);

            let results = search_chunks(embedder.as_ref(), &store, &query, top_k).await;
            if results.is_empty() {
                println!("No results.");
            } else {
                for (i, result) in results.iter().enumerate() {
                    let excerpt: String = result.text.chars().take(160).collect();
                    println!(
                        "{}. [{:.4}] {} (chunk {}/{})",
                        i + 1,
                        result.distance,
                        result.metadata.file_name,
                        result.metadata.chunk_index + 1,
                        result.metadata.total_chunks
                    );
                    println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
                }
            }

            store.close().await;
        }

        Commands::Ask { question } => {
            let embedder = create_embedder(&config.embedding)?;
            let store = SqliteVectorStore::open(&config.storage.index_path).await?;
            let mut session = ChatSession::new(&config.chat.system_prompt);

            let reply =
                chat::ask(&config, embedder.as_ref(), &store, &mut session, &question).await?;

            println!("{}", reply.response);
            if !reply.sources_used.is_empty() {
                println!();
                println!("sources: {}", reply.sources_used.join(", "));
            }

            store.close().await;
        }

        Commands::Status => {
            let summary = status::document_summary(&config).await?;
            status::print_summary(&summary);
        }

        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
