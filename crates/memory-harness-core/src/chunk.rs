//! Heading-aware, overlapping word-window chunker.
//!
//! Splits long text into bounded chunks suitable for storage as individual
//! documents. Chunk boundaries are a pure function of the input text and
//! parameters, so re-ingesting the same file produces the same chunks.
//!
//! # Algorithm
//!
//! 1. Split the text into sections at heading lines (a line starting with
//!    1–6 `#` characters followed by whitespace). Heading lines are dropped.
//! 2. Split each section on whitespace into words.
//! 3. Emit windows of `chunk_size` words, advancing by
//!    `chunk_size - overlap` words, stopping once a window reaches the end
//!    of the section.
//! 4. Sections with no words produce nothing.
//! 5. If the whole text produced no chunk, return one chunk holding the
//!    first `chunk_size × 6` characters of the raw text.
//!
//! # Example
//!
//! ```rust
//! use memory_harness_core::chunk::chunk_text;
//!
//! let text = "# Intro\nalpha beta gamma delta\n## Next\nepsilon zeta";
//! let chunks = chunk_text(text, 3, 1);
//! assert_eq!(chunks, vec!["alpha beta gamma", "gamma delta", "epsilon zeta"]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(\s|$)").expect("heading pattern is valid"));

/// Multiplier applied to `chunk_size` for the raw-character fallback chunk.
pub const FALLBACK_CHARS_PER_WORD: usize = 6;

/// Split `text` into overlapping word windows, one heading section at a time.
///
/// `overlap` values at or above `chunk_size` are treated as `chunk_size - 1`
/// so the window always advances. A `chunk_size` of zero is treated as one.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let step = chunk_size - overlap.min(chunk_size - 1);

    let mut chunks = Vec::new();
    for section in split_sections(text) {
        let words: Vec<&str> = section.iter().flat_map(|l| l.split_whitespace()).collect();
        if words.is_empty() {
            continue;
        }

        let mut start = 0;
        loop {
            let end = (start + chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start += step;
        }
    }

    if chunks.is_empty() {
        let limit = chunk_size.saturating_mul(FALLBACK_CHARS_PER_WORD);
        chunks.push(text.chars().take(limit).collect());
    }

    chunks
}

/// Group lines into sections separated by heading lines.
fn split_sections(text: &str) -> Vec<Vec<&str>> {
    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines() {
        if HEADING_RE.is_match(line) {
            sections.push(Vec::new());
        } else if let Some(current) = sections.last_mut() {
            current.push(line);
        }
    }
    sections
}

/// Document id for chunk `index` of `source`.
pub fn chunk_id(source: &str, index: usize) -> String {
    format!("{}::{}", source, index)
}
