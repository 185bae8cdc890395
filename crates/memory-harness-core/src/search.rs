//! Cosine-similarity nearest-neighbour search over a [`Store`].
//!
//! The query is embedded with the same sparse weighting as stored
//! documents and compared against each candidate's stored sparse vector.
//! Dense vectors are never consulted.
//!
//! # Algorithm
//!
//! 1. Embed the query text into a sparse vector.
//! 2. Candidates are all documents, narrowed by an optional metadata filter
//!    (every filter key must be present with an equal value).
//! 3. Score each candidate with [`cosine_sparse`].
//! 4. Stable sort by score descending, so ties keep store-iteration order.
//! 5. Truncate to `top_k`.

use serde::Serialize;

use crate::embedding::{cosine_sparse, sparse_embed};
use crate::models::{Document, Metadata};
use crate::store::Store;

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Cosine similarity in `[0.0, 1.0]`.
    pub score: f64,
    pub document: Document,
}

/// Return up to `top_k` documents most similar to `query_text`.
///
/// An empty store or `top_k == 0` yields an empty result.
pub fn query<S: Store + ?Sized>(
    store: &S,
    query_text: &str,
    top_k: usize,
    metadata_filter: Option<&Metadata>,
) -> Vec<SearchHit> {
    if store.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let query_vec = sparse_embed(query_text);

    let mut hits: Vec<SearchHit> = store
        .documents()
        .filter(|doc| metadata_filter.map_or(true, |f| matches_filter(&doc.metadata, f)))
        .map(|doc| SearchHit {
            score: cosine_sparse(&query_vec, &doc.embedding.sparse),
            document: doc.clone(),
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}

/// Whether `metadata` contains every key of `filter` with an equal value.
pub fn matches_filter(metadata: &Metadata, filter: &Metadata) -> bool {
    filter.iter().all(|(key, expected)| {
        metadata
            .get(key)
            .is_some_and(|actual| values_equal(actual, expected))
    })
}

/// JSON equality where numbers compare by value (`1` equals `1.0`).
fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a, b) {
        (serde_json::Value::Number(x), serde_json::Value::Number(y)) => {
            x == y || matches!((x.as_f64(), y.as_f64()), (Some(p), Some(q)) if p == q)
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{embed_text, SparseOnly};
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn doc(id: &str, content: &str, meta: &[(&str, serde_json::Value)]) -> Document {
        Document {
            id: id.to_string(),
            content: content.to_string(),
            embedding: embed_text(content, &SparseOnly, |_| {}),
            metadata: meta
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            timestamp: chrono::Utc::now(),
            correlation_id: "c".to_string(),
            run_id: String::new(),
        }
    }

    fn filter(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_empty_store_returns_nothing() {
        let store = InMemoryStore::new();
        assert!(query(&store, "anything", 10, None).is_empty());
        assert!(query(&store, "", 0, None).is_empty());
    }

    #[test]
    fn test_self_similarity_ranks_first() {
        let store: InMemoryStore = vec![
            doc("doc-b", "weather forecast sunny today", &[]),
            doc("doc-a", "autonomous agents govern policy", &[]),
        ]
        .into_iter()
        .collect();

        let hits = query(&store, "autonomous agents govern policy", 1, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "doc-a");
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn test_disjoint_vocabulary_scores_zero() {
        let store: InMemoryStore = vec![doc("doc-b", "weather forecast sunny today", &[])]
            .into_iter()
            .collect();
        let hits = query(&store, "autonomous policy governance", 5, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn test_scores_in_unit_range_and_sorted() {
        let store: InMemoryStore = vec![
            doc("1", "rust memory store", &[]),
            doc("2", "memory memory memory", &[]),
            doc("3", "completely unrelated words", &[]),
            doc("4", "", &[]),
            doc("5", "store rust memory ranking cosine", &[]),
        ]
        .into_iter()
        .collect();

        let hits = query(&store, "rust memory", 10, None);
        assert_eq!(hits.len(), 5);
        for w in hits.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
        for h in &hits {
            assert!((0.0..=1.0).contains(&h.score), "score {}", h.score);
        }
    }

    #[test]
    fn test_ties_keep_store_order() {
        let store: InMemoryStore = vec![
            doc("z", "nothing shared", &[]),
            doc("a", "also nothing", &[]),
            doc("m", "still nothing", &[]),
        ]
        .into_iter()
        .collect();
        let hits = query(&store, "query terms", 3, None);
        let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_top_k_truncates() {
        let store: InMemoryStore = (0..10)
            .map(|i| doc(&format!("d{}", i), "shared term", &[]))
            .collect();
        assert_eq!(query(&store, "shared", 3, None).len(), 3);
        assert_eq!(query(&store, "shared", 50, None).len(), 10);
    }

    #[test]
    fn test_metadata_filter_excludes_other_tags() {
        let store: InMemoryStore = vec![
            doc("y-doc", "governance policy agents", &[("source", json!("y"))]),
            doc("x-doc", "unrelated content entirely", &[("source", json!("x"))]),
        ]
        .into_iter()
        .collect();

        let f = filter(&[("source", json!("x"))]);
        let hits = query(&store, "governance policy agents", 10, Some(&f));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "x-doc");
    }

    #[test]
    fn test_filter_requires_every_key() {
        let meta = filter(&[("source", json!("x")), ("chunk_index", json!(2))]);
        assert!(matches_filter(&meta, &filter(&[("source", json!("x"))])));
        assert!(matches_filter(&meta, &filter(&[("chunk_index", json!(2.0))])));
        assert!(!matches_filter(&meta, &filter(&[("source", json!("x")), ("agent", json!("a"))])));
        assert!(!matches_filter(&meta, &filter(&[("chunk_index", json!("2"))])));
        assert!(matches_filter(&meta, &Metadata::new()));
    }
}
