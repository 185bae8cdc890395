//! `mem search`: ranked lexical retrieval from the command line.

use anyhow::Result;
use memory_harness_core::context::truncate_chars;
use memory_harness_core::models::Metadata;
use memory_harness_core::search::SearchHit;

use crate::memory::DocumentStore;

const EXCERPT_CHARS: usize = 160;

pub fn run_search(
    store: &DocumentStore,
    query: &str,
    top_k: usize,
    filter: &Metadata,
) -> Result<()> {
    let filter = (!filter.is_empty()).then_some(filter);
    let hits = store.query(query, top_k, filter);

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}", render_hit(i + 1, hit));
        println!();
    }
    Ok(())
}

fn render_hit(rank: usize, hit: &SearchHit) -> String {
    let doc = &hit.document;
    let mut lines = vec![format!("{}. [{:.3}] {}", rank, hit.score, doc.id)];
    if let Some(source) = doc.metadata.get("source").and_then(|v| v.as_str()) {
        lines.push(format!("    source: {}", source));
    }
    lines.push(format!(
        "    updated: {}",
        doc.timestamp.format("%Y-%m-%d %H:%M")
    ));
    let flat = doc.content.replace('\n', " ");
    lines.push(format!(
        "    excerpt: \"{}\"",
        truncate_chars(flat.trim(), EXCERPT_CHARS)
    ));
    lines.join("\n")
}
