//! # Memory Harness CLI (`mem`)
//!
//! ## Usage
//!
//! ```bash
//! mem --config ./config/mem.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mem remember <id> <content>` | Store one document |
//! | `mem ingest <path>` | Chunk and store a markdown file or directory |
//! | `mem get <id>` | Print a stored document |
//! | `mem delete <id>` | Remove a document |
//! | `mem stats` | Document counts by backend and source |
//! | `mem clear` | Remove every document |
//! | `mem search "<query>"` | Ranked lexical search |
//! | `mem rehydrate "<query>"` | Assemble and print a context block |
//!
//! Logs go to stderr; set `RUST_LOG=debug` for per-document detail.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memory_harness::config::load_config_or_default;
use memory_harness::memory::{DocumentStore, UpsertOptions};
use memory_harness::{get, ingest, rehydrate, search, stats};
use memory_harness_core::format::{format_context, FormatOptions};
use memory_harness_core::models::Metadata;
use tracing_subscriber::EnvFilter;

/// Memory Harness: persistent memory and context rehydration for AI agents.
#[derive(Parser)]
#[command(name = "mem", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./config/mem.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a document, replacing any document with the same id.
    Remember {
        id: String,
        content: String,

        /// Metadata entry `key=value`; values that parse as JSON keep their type.
        #[arg(long = "meta", value_parser = parse_key_val)]
        meta: Vec<(String, serde_json::Value)>,

        /// Pipeline run identifier.
        #[arg(long, env = "GITHUB_RUN_ID", default_value = "")]
        run_id: String,

        /// Correlation id; generated when omitted.
        #[arg(long)]
        correlation_id: Option<String>,

        /// Store without computing any embedding.
        #[arg(long)]
        no_embed: bool,
    },

    /// Chunk a markdown file, or every markdown file under a directory, into the store.
    Ingest {
        path: PathBuf,

        /// Source label used in chunk ids (single file only; defaults to the path).
        #[arg(long)]
        source: Option<String>,

        /// Words per chunk (default from config).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words shared by consecutive chunks (default from config).
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Print a stored document. Exits 1 if it does not exist.
    Get { id: String },

    /// Remove a document.
    Delete { id: String },

    /// Show store statistics.
    Stats,

    /// Remove every document.
    Clear,

    /// Rank stored documents against a query.
    Search {
        query: String,

        #[arg(long, default_value_t = 5)]
        top_k: usize,

        /// Restrict to documents whose metadata has `key=value`.
        #[arg(long = "filter", value_parser = parse_key_val)]
        filter: Vec<(String, serde_json::Value)>,
    },

    /// Assemble working context for a task and print it.
    Rehydrate {
        query: String,

        /// Vector hits to retrieve (default from config).
        #[arg(long)]
        top_k: Option<usize>,

        /// Task line shown in the header instead of the query.
        #[arg(long)]
        task: Option<String>,

        /// Print the raw bundle as JSON.
        #[arg(long)]
        json: bool,

        #[arg(long, default_value_t = 5)]
        max_hits: usize,

        #[arg(long, default_value_t = 2000)]
        max_memory_chars: usize,
    },
}

/// Parse `key=value`. The value is read as JSON when possible, else kept as a string.
fn parse_key_val(s: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no '=' in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in '{}'", s));
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(v) if !v.is_object() && !v.is_array() => v,
        _ => serde_json::Value::String(raw.to_string()),
    };
    Ok((key.to_string(), value))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Remember {
            id,
            content,
            meta,
            run_id,
            correlation_id,
            no_embed,
        } => {
            let mut store = DocumentStore::open(&config)?;
            let doc = store.upsert(
                &id,
                &content,
                UpsertOptions {
                    metadata: meta.into_iter().collect::<Metadata>(),
                    correlation_id,
                    run_id,
                    skip_embed: no_embed,
                },
            )?;
            println!(
                "Stored {} (backend: {}, correlation_id: {})",
                doc.id, doc.embedding.backend, doc.correlation_id
            );
        }
        Commands::Ingest {
            path,
            source,
            chunk_size,
            overlap,
        } => {
            let chunk_size = chunk_size.unwrap_or(config.chunking.chunk_size_words);
            let overlap = overlap.unwrap_or(config.chunking.overlap_words);
            if chunk_size == 0 {
                anyhow::bail!("--chunk-size must be > 0");
            }
            if overlap >= chunk_size {
                anyhow::bail!("--overlap must be < --chunk-size");
            }
            let mut store = DocumentStore::open(&config)?;
            let summary =
                ingest::ingest_path(&mut store, &path, source.as_deref(), chunk_size, overlap)
                    .with_context(|| format!("Ingest failed for {}", path.display()))?;
            println!(
                "Ingested {} chunk(s) from {} file(s)",
                summary.chunks, summary.files
            );
        }
        Commands::Get { id } => {
            let store = DocumentStore::open(&config)?;
            get::run_get(&store, &id)?;
        }
        Commands::Delete { id } => {
            let mut store = DocumentStore::open(&config)?;
            if store.delete(&id)? {
                println!("Deleted {}", id);
            } else {
                println!("Not found: {}", id);
            }
        }
        Commands::Stats => {
            let store = DocumentStore::open(&config)?;
            stats::run_stats(&store, &config.store.path)?;
        }
        Commands::Clear => {
            let mut store = DocumentStore::open(&config)?;
            let count = store.count();
            store.clear()?;
            println!("Cleared {} document(s)", count);
        }
        Commands::Search {
            query,
            top_k,
            filter,
        } => {
            let store = DocumentStore::open(&config)?;
            let filter: Metadata = filter.into_iter().collect();
            search::run_search(&store, &query, top_k, &filter)?;
        }
        Commands::Rehydrate {
            query,
            top_k,
            task,
            json,
            max_hits,
            max_memory_chars,
        } => {
            let top_k = top_k.unwrap_or(config.rehydration.top_k);
            let bundle = rehydrate::rehydrate(&query, top_k, &config);
            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                let opts = FormatOptions {
                    task_description: task.as_deref(),
                    max_hits,
                    max_memory_chars,
                };
                println!("{}", format_context(&bundle, &opts));
            }
        }
    }

    Ok(())
}
