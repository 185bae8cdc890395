//! `mem get`: print one stored document.

use memory_harness_core::models::Document;

use crate::memory::DocumentStore;

/// Print the document with `id`, or exit with status 1 if it is absent.
pub fn run_get(store: &DocumentStore, id: &str) -> anyhow::Result<()> {
    let doc = match store.get(id) {
        Some(d) => d,
        None => {
            eprintln!("Error: document not found: {}", id);
            std::process::exit(1);
        }
    };
    print!("{}", render_document(doc));
    Ok(())
}

fn render_document(doc: &Document) -> String {
    let metadata = serde_json::to_string(&doc.metadata).unwrap_or_else(|_| "{}".to_string());
    let dense = match &doc.embedding.dense {
        Some(v) => format!("{} dims", v.len()),
        None => "none".to_string(),
    };

    let mut out = String::new();
    out.push_str("--- Document ---\n");
    out.push_str(&format!("id:             {}\n", doc.id));
    out.push_str(&format!("timestamp:      {}\n", doc.timestamp.to_rfc3339()));
    out.push_str(&format!("correlation_id: {}\n", doc.correlation_id));
    if !doc.run_id.is_empty() {
        out.push_str(&format!("run_id:         {}\n", doc.run_id));
    }
    out.push_str(&format!("backend:        {}\n", doc.embedding.backend));
    out.push_str(&format!("terms:          {}\n", doc.embedding.sparse.len()));
    out.push_str(&format!("dense:          {}\n", dense));
    out.push_str(&format!("metadata:       {}\n", metadata));
    out.push('\n');
    out.push_str("--- Content ---\n");
    out.push_str(&doc.content);
    out.push('\n');
    out
}
