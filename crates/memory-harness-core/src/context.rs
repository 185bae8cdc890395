//! Context bundle assembled by rehydration.
//!
//! A [`ContextBundle`] is ephemeral: it is built per request from the
//! document store plus auxiliary state sources and is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Metadata;
use crate::search::SearchHit;

/// Maximum characters of a document's content carried in a [`VectorHit`].
pub const HIT_CONTENT_CHARS: usize = 400;

/// A retrieval hit as carried in the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub score: f64,
    pub id: String,
    /// Document content truncated to [`HIT_CONTENT_CHARS`] characters.
    pub content: String,
    pub metadata: Metadata,
}

impl From<&SearchHit> for VectorHit {
    fn from(hit: &SearchHit) -> Self {
        Self {
            score: hit.score,
            id: hit.document.id.clone(),
            content: truncate_chars(&hit.document.content, HIT_CONTENT_CHARS).to_string(),
            metadata: hit.document.metadata.clone(),
        }
    }
}

/// State of the flat-file active-memory snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ActiveMemory {
    pub available: bool,
    pub content: String,
    /// Age of the snapshot in hours, rounded to two decimals.
    pub age_hours: Option<f64>,
    pub warning: Option<String>,
}

/// Everything rehydration gathered for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    pub vector_hits: Vec<VectorHit>,
    pub active_memory: ActiveMemory,
    /// Telemetry run records, most recent first.
    pub recent_runs: Vec<serde_json::Value>,
    pub org_repos: Vec<serde_json::Value>,
    /// Degradation warnings in source-processing order.
    pub warnings: Vec<String>,
    pub rehydrated_at: DateTime<Utc>,
    pub query: String,
}

impl ContextBundle {
    /// An empty bundle for `query` stamped at `now`.
    pub fn new(query: &str, now: DateTime<Utc>) -> Self {
        Self {
            vector_hits: Vec::new(),
            active_memory: ActiveMemory::default(),
            recent_runs: Vec::new(),
            org_repos: Vec::new(),
            warnings: Vec::new(),
            rehydrated_at: now,
            query: query.to_string(),
        }
    }
}

/// Prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Embedding};

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_vector_hit_truncates_content() {
        let hit = SearchHit {
            score: 0.5,
            document: Document {
                id: "d".into(),
                content: "x".repeat(1000),
                embedding: Embedding::empty(),
                metadata: Default::default(),
                timestamp: Utc::now(),
                correlation_id: "c".into(),
                run_id: String::new(),
            },
        };
        let vh = VectorHit::from(&hit);
        assert_eq!(vh.content.chars().count(), HIT_CONTENT_CHARS);
        assert_eq!(vh.id, "d");
    }
}
