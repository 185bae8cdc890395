//! Document store facade.
//!
//! [`DocumentStore`] combines a [`Store`] (by default the JSONL file) with
//! a dense embedder. Every write embeds the content first: the sparse
//! vector always, the dense vector when the configured backend provides
//! one and is reachable. An unreachable dense backend is logged and the
//! document is stored with the sparse vector alone.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use memory_harness_core::chunk::{chunk_id, chunk_text};
use memory_harness_core::embedding::{embed_text, DenseEmbedder};
use memory_harness_core::models::{new_correlation_id, Document, Embedding, Metadata};
use memory_harness_core::search::{self, SearchHit};
use memory_harness_core::store::{Store, StoreError};

use crate::config::Config;
use crate::embedding::{create_backend, DenseBackend};
use crate::jsonl_store::JsonlStore;

/// Optional fields for [`DocumentStore::upsert`].
#[derive(Debug, Clone, Default)]
pub struct UpsertOptions {
    pub metadata: Metadata,
    /// Generated when absent.
    pub correlation_id: Option<String>,
    pub run_id: String,
    /// Store an empty embedding tagged `none` instead of embedding.
    pub skip_embed: bool,
}

/// Persistent keyed collection of documents.
pub struct DocumentStore<S: Store = JsonlStore, E: DenseEmbedder = DenseBackend> {
    store: S,
    embedder: E,
}

impl DocumentStore {
    /// Open the JSONL store and dense backend named in `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let store = JsonlStore::open(&config.store.path)
            .with_context(|| format!("Failed to open store: {}", config.store.path.display()))?;
        let embedder = create_backend(&config.embedding)?;
        tracing::info!(
            path = %config.store.path.display(),
            documents = store.len(),
            backend = %embedder.backend(),
            "document store ready"
        );
        Ok(Self::new(store, embedder))
    }
}

impl<S: Store, E: DenseEmbedder> DocumentStore<S, E> {
    pub fn new(store: S, embedder: E) -> Self {
        Self { store, embedder }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Embed and persist a document, replacing any entry with the same id.
    ///
    /// Only storage failures are returned; dense embedding failures
    /// degrade to a sparse-only embedding.
    pub fn upsert(
        &mut self,
        id: &str,
        content: &str,
        opts: UpsertOptions,
    ) -> Result<Document, StoreError> {
        let embedding = if opts.skip_embed {
            Embedding::empty()
        } else {
            embed_text(content, &self.embedder, |err| {
                tracing::warn!(id, backend = %self.embedder.backend(), error = %err, "dense embedding unavailable");
            })
        };

        let doc = Document {
            id: id.to_string(),
            content: content.to_string(),
            embedding,
            metadata: opts.metadata,
            timestamp: Utc::now(),
            correlation_id: opts.correlation_id.unwrap_or_else(new_correlation_id),
            run_id: opts.run_id,
        };

        self.store.put(doc.clone())?;
        tracing::debug!(id, backend = %doc.embedding.backend, "upserted document");
        Ok(doc)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.store.get(id)
    }

    /// Remove a document. Returns `false` if it was absent.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let removed = self.store.remove(id)?;
        tracing::debug!(id, removed, "delete");
        Ok(removed)
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear()
    }

    /// Rank stored documents against `query_text`.
    pub fn query(
        &self,
        query_text: &str,
        top_k: usize,
        metadata_filter: Option<&Metadata>,
    ) -> Vec<SearchHit> {
        search::query(&self.store, query_text, top_k, metadata_filter)
    }

    /// Chunk a markdown file and upsert each chunk as `"{source}::{i}"`.
    ///
    /// `source` defaults to the path as given. A missing file logs a
    /// warning and ingests nothing. Returns the number of chunks written.
    pub fn ingest_markdown(
        &mut self,
        path: &Path,
        source: Option<&str>,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<usize, StoreError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "ingest_markdown: file not found");
                return Ok(0);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let label = match source {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => path.display().to_string(),
        };

        let chunks = chunk_text(&text, chunk_size, overlap);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), label.clone().into());
            metadata.insert("chunk_index".to_string(), i.into());
            metadata.insert("total_chunks".to_string(), total.into());
            self.upsert(
                &chunk_id(&label, i),
                chunk,
                UpsertOptions {
                    metadata,
                    ..Default::default()
                },
            )?;
        }

        tracing::info!(source = %label, chunks = total, "ingested markdown");
        Ok(total)
    }
}
