//! Markdown ingestion for files and directory trees.
//!
//! A single file is handed straight to [`DocumentStore::ingest_markdown`].
//! A directory is walked with `walkdir`, filtered through include and
//! exclude glob sets, and each matching file is ingested in sorted order
//! with its path relative to the root as the chunk source.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use memory_harness_core::embedding::DenseEmbedder;
use memory_harness_core::store::Store;
use walkdir::WalkDir;

use crate::memory::DocumentStore;

/// Patterns applied when walking a directory.
#[derive(Debug, Clone)]
pub struct DirFilter {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

impl Default for DirFilter {
    fn default() -> Self {
        Self {
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: Vec::new(),
        }
    }
}

/// Totals for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub chunks: usize,
}

/// List the files under `root` that `filter` selects, sorted by relative path.
pub fn scan_dir(root: &Path, filter: &DirFilter) -> Result<Vec<(PathBuf, String)>> {
    if !root.is_dir() {
        bail!("not a directory: {}", root.display());
    }

    let include_set = build_globset(&filter.include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(filter.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((path.to_path_buf(), rel_str));
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Ingest every selected markdown file under `root`.
pub fn ingest_dir<S: Store, E: DenseEmbedder>(
    store: &mut DocumentStore<S, E>,
    root: &Path,
    filter: &DirFilter,
    chunk_size: usize,
    overlap: usize,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for (path, source) in scan_dir(root, filter)? {
        let chunks = store
            .ingest_markdown(&path, Some(&source), chunk_size, overlap)
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        summary.files += 1;
        summary.chunks += chunks;
    }
    tracing::info!(
        root = %root.display(),
        files = summary.files,
        chunks = summary.chunks,
        "ingested directory"
    );
    Ok(summary)
}

/// Ingest `path`, which may be a single file or a directory.
pub fn ingest_path<S: Store, E: DenseEmbedder>(
    store: &mut DocumentStore<S, E>,
    path: &Path,
    source: Option<&str>,
    chunk_size: usize,
    overlap: usize,
) -> Result<IngestSummary> {
    if path.is_dir() {
        return ingest_dir(store, path, &DirFilter::default(), chunk_size, overlap);
    }
    let chunks = store
        .ingest_markdown(path, source, chunk_size, overlap)
        .with_context(|| format!("Failed to ingest {}", path.display()))?;
    Ok(IngestSummary {
        files: usize::from(chunks > 0),
        chunks,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
