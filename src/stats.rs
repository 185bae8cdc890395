//! Store statistics.
//!
//! A quick summary of what is remembered: document count, how each
//! document was embedded, and the size of the backing file.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use memory_harness_core::store::Store;

use crate::memory::DocumentStore;

/// Counts gathered from a store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub documents: usize,
    /// Documents per embedding backend tag.
    pub by_backend: BTreeMap<String, usize>,
    /// Documents carrying a dense vector.
    pub with_dense: usize,
    /// Documents per `source` metadata value.
    pub by_source: BTreeMap<String, usize>,
}

pub fn collect_stats<S: Store + ?Sized>(store: &S) -> StoreStats {
    let mut stats = StoreStats {
        documents: store.len(),
        ..Default::default()
    };
    for doc in store.documents() {
        *stats
            .by_backend
            .entry(doc.embedding.backend.to_string())
            .or_insert(0) += 1;
        if doc.embedding.dense.is_some() {
            stats.with_dense += 1;
        }
        if let Some(source) = doc.metadata.get("source").and_then(|v| v.as_str()) {
            *stats.by_source.entry(source.to_string()).or_insert(0) += 1;
        }
    }
    stats
}

/// Print a summary of the store at `path`.
pub fn run_stats(store: &DocumentStore, path: &Path) -> Result<()> {
    let stats = collect_stats(store.store());
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("Memory Harness — Store Stats");
    println!("============================");
    println!();
    println!("  Store:       {}", path.display());
    println!("  Size:        {}", format_bytes(size));
    println!();
    println!("  Documents:   {}", stats.documents);
    println!("  Dense:       {} / {}", stats.with_dense, stats.documents);

    if !stats.by_backend.is_empty() {
        println!();
        println!("  By backend:");
        for (backend, count) in &stats.by_backend {
            println!("    {:<10} {:>6}", backend, count);
        }
    }

    if !stats.by_source.is_empty() {
        println!();
        println!("  By source:");
        for (source, count) in &stats.by_source {
            println!("    {:<40} {:>6}", source, count);
        }
    }

    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
