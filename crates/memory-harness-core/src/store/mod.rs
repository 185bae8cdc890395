//! Storage abstraction for Memory Harness.
//!
//! The [`Store`] trait is the keyed document collection that the similarity
//! engine ranks over. Implementations keep the full index in memory and
//! iterate documents in a stable order: first-insertion order, with a
//! replaced document keeping its original position.
//!
//! | Implementation | Crate | Persistence |
//! |----------------|-------|-------------|
//! | [`memory::InMemoryStore`] | core | none |
//! | `JsonlStore` | `memory-harness` | full JSONL rewrite on every mutation |

pub mod memory;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Document;

/// Errors raised by store mutations and loading.
///
/// Only genuine storage-layer failures surface here. A corrupt line in a
/// backing file is skipped during load and never becomes an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize document '{id}': {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Abstract document collection.
///
/// `put` is the only way a document enters the store and it replaces any
/// existing document with the same id in full.
pub trait Store {
    /// Insert or replace a document.
    fn put(&mut self, doc: Document) -> Result<(), StoreError>;

    /// Look up a document by id.
    fn get(&self, id: &str) -> Option<&Document>;

    /// Remove a document. Returns `false` if it was absent.
    fn remove(&mut self, id: &str) -> Result<bool, StoreError>;

    /// Remove every document.
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Number of stored documents.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All documents in store-iteration order.
    fn documents(&self) -> Box<dyn Iterator<Item = &Document> + '_>;
}
