//! # Memory Harness Core
//!
//! Pure logic for Memory Harness: the document model, lexical (sparse)
//! embeddings, heading-aware chunking, the store abstraction, cosine
//! similarity ranking, and context bundle formatting.
//!
//! This crate performs no filesystem or network I/O. Persistence, dense
//! embedding backends, and rehydration sources live in the `memory-harness`
//! app crate.

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod format;
pub mod models;
pub mod search;
pub mod store;
