//! Core data models used throughout Memory Harness.
//!
//! A [`Document`] is the unit of persistent memory. Its serialized form is
//! the record written one-per-line to the JSONL backing file:
//!
//! ```text
//! { "id": "...", "content": "...",
//!   "embedding": { "backend": "tfidf", "sparse": {"term": 0.5}, "dense": null },
//!   "metadata": {"source": "notes.md"},
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "correlation_id": "...", "run_id": "" }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Sparse term-weight vector: only terms present in the text carry a weight.
pub type SparseVector = BTreeMap<String, f64>;

/// Arbitrary scalar metadata attached to a document.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Which embedding backend produced a document's [`Embedding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sparse lexical vector only.
    #[default]
    Tfidf,
    /// Sparse vector plus an OpenAI dense vector.
    #[serde(rename = "openai")]
    OpenAi,
    /// Sparse vector plus an Ollama dense vector.
    Ollama,
    /// Embedding was skipped; both vectors are empty.
    None,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingBackend::Tfidf => "tfidf",
            EmbeddingBackend::OpenAi => "openai",
            EmbeddingBackend::Ollama => "ollama",
            EmbeddingBackend::None => "none",
        }
    }

    /// Whether this backend computes a dense vector in addition to the sparse one.
    pub fn is_dense(&self) -> bool {
        matches!(self, EmbeddingBackend::OpenAi | EmbeddingBackend::Ollama)
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tfidf" => Ok(EmbeddingBackend::Tfidf),
            "openai" => Ok(EmbeddingBackend::OpenAi),
            "ollama" => Ok(EmbeddingBackend::Ollama),
            "none" => Ok(EmbeddingBackend::None),
            other => Err(format!(
                "unknown embedding backend '{}': expected tfidf, openai, or ollama",
                other
            )),
        }
    }
}

/// Stored embedding for a document.
///
/// Ranking reads only `sparse`. `dense` is kept alongside when a remote
/// backend was configured and reachable at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Embedding {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    #[serde(default)]
    pub sparse: SparseVector,
    #[serde(default)]
    pub dense: Option<Vec<f32>>,
}

impl Embedding {
    /// Embedding recorded when the caller asked to skip embedding.
    pub fn empty() -> Self {
        Self {
            backend: EmbeddingBackend::None,
            sparse: SparseVector::new(),
            dense: None,
        }
    }
}

/// A stored memory unit, keyed by a caller-supplied `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default = "Embedding::empty")]
    pub embedding: Embedding,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "new_correlation_id")]
    pub correlation_id: String,
    #[serde(default)]
    pub run_id: String,
}

/// Parse an ISO-8601 timestamp. A value without an offset is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(e) => match raw.parse::<NaiveDateTime>() {
            Ok(naive) => Ok(Utc.from_utc_datetime(&naive)),
            Err(_) => Err(e),
        },
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Generate a fresh random correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
