//! Lexical embedding, the dense-embedding capability trait, and similarity.
//!
//! Every document carries a **sparse** vector computed from its own token
//! statistics. No corpus-wide document frequencies are involved, so a
//! single document can be embedded independently of the rest of the store.
//!
//! # Weighting
//!
//! For a token sequence of length `N` with per-term count `c(t)`:
//!
//! ```text
//! tf(t) = c(t) / N
//! w(t)  = tf(t) × ln(1 + 1/tf(t))
//! ```
//!
//! Dense vectors come from a remote service through [`DenseEmbedder`].
//! They are stored next to the sparse vector but never used for ranking.
//!
//! # Example
//!
//! ```rust
//! use memory_harness_core::embedding::{cosine_sparse, sparse_embed};
//!
//! let a = sparse_embed("autonomous agents govern policy");
//! let b = sparse_embed("weather forecast sunny today");
//! assert_eq!(cosine_sparse(&a, &b), 0.0);
//! assert!(cosine_sparse(&a, &a) > 0.99);
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{Embedding, EmbeddingBackend, SparseVector};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9_\-]+").expect("token pattern is valid"));

/// Split text into lower-cased tokens of `[a-zA-Z0-9_-]+` longer than one character.
///
/// No stemming and no stopword removal.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_ascii_lowercase())
}

/// Compute the document-local term weights for `text`.
///
/// Returns an empty vector when the text has no tokens.
pub fn sparse_embed(text: &str) -> SparseVector {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return SparseVector::new();
    }

    let n = total as f64;
    counts
        .into_iter()
        .map(|(term, count)| {
            let tf = count as f64 / n;
            (term, tf * (1.0 / tf).ln_1p())
        })
        .collect()
}

/// Cosine similarity between two sparse vectors.
///
/// Returns `0.0` when the vectors share no terms or either has zero
/// magnitude. Weights are non-negative, so the result lies in `[0, 1]`.
pub fn cosine_sparse(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut dot = 0.0f64;
    let mut shared = false;
    for (term, wa) in small {
        if let Some(wb) = large.get(term) {
            dot += wa * wb;
            shared = true;
        }
    }
    if !shared {
        return 0.0;
    }

    let mag_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let mag_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    // Rounding can push a self-similarity a hair above 1.
    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}

/// Why a dense embedding could not be produced.
///
/// Every variant is an expected, recoverable condition: the caller stores
/// the sparse vector alone and moves on.
#[derive(Debug, Error)]
pub enum EmbeddingUnavailable {
    #[error("no dense embedding backend configured")]
    NotConfigured,

    #[error("credential not set: {0}")]
    MissingCredential(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Capability for producing a fixed-length dense vector from text.
///
/// Implementations issue at most one bounded-timeout call and report every
/// failure as [`EmbeddingUnavailable`] instead of panicking or blocking.
pub trait DenseEmbedder {
    /// The backend tag recorded on documents embedded through this embedder.
    fn backend(&self) -> EmbeddingBackend;

    /// Produce a dense vector for `text`.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingUnavailable>;
}

/// Embedder for stores configured with the sparse backend only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseOnly;

impl DenseEmbedder for SparseOnly {
    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Tfidf
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingUnavailable> {
        Err(EmbeddingUnavailable::NotConfigured)
    }
}

/// Build the full [`Embedding`] for `text`.
///
/// The sparse vector is always computed. The dense vector is requested
/// only when the embedder's backend is a dense one; if the call fails the
/// outcome is handed to `on_unavailable` and `dense` stays `None`.
pub fn embed_text<E, F>(text: &str, embedder: &E, on_unavailable: F) -> Embedding
where
    E: DenseEmbedder + ?Sized,
    F: FnOnce(&EmbeddingUnavailable),
{
    let backend = embedder.backend();
    let dense = if backend.is_dense() {
        match embedder.embed(text) {
            Ok(v) => Some(v),
            Err(e) => {
                on_unavailable(&e);
                None
            }
        }
    } else {
        None
    };

    Embedding {
        backend,
        sparse: sparse_embed(text),
        dense,
    }
}
