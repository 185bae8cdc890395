//! # Memory Harness
//!
//! A local-first persistent memory store for AI agents: documents are kept
//! in a JSON Lines file with per-document lexical embeddings, ranked by
//! cosine similarity, and merged with live state snapshots into a context
//! bundle before an agent acts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐
//! │ Markdown │──▶│ Chunk+Embed│──▶│ JSONL store  │
//! │  files   │   │            │   │ (in-memory   │
//! └──────────┘   └────────────┘   │  index)      │
//!                                 └──────┬───────┘
//!          snapshot, telemetry, index    │ query
//!                      │                 ▼
//!                      └────────▶ ┌──────────────┐   ┌──────────┐
//!                                 │  Rehydrate   │──▶│  Format  │
//!                                 └──────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mem ingest docs/                      # chunk and store markdown
//! mem remember note-1 "deploys run on Fridays" --meta agent=planner
//! mem search "deploy schedule"
//! mem rehydrate "plan the next deploy"  # context block for a prompt
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI and Ollama dense backends |
//! | [`jsonl_store`] | Atomic JSON Lines persistence |
//! | [`memory`] | Document store facade (upsert, query, ingest) |
//! | [`ingest`] | File and directory ingestion |
//! | [`rehydrate`] | Context bundle assembly |
//! | [`search`], [`get`], [`stats`] | CLI output |
//!
//! Pure logic (tokenizer, weighting, chunking, ranking, formatting) lives in
//! the `memory-harness-core` crate.

pub mod config;
pub mod embedding;
pub mod get;
pub mod ingest;
pub mod jsonl_store;
pub mod memory;
pub mod rehydrate;
pub mod search;
pub mod stats;
