//! JSON Lines backing file for the document store.
//!
//! One [`Document`] per line. The whole index lives in memory; every
//! mutation rewrites the full file to `<path>.tmp` and renames it over the
//! original, so a crash mid-write leaves the previous file intact.
//!
//! Loading is forgiving: a line that is not valid UTF-8 or not a valid
//! document record is skipped and logged at debug level. Writing is not:
//! any I/O failure is returned as [`StoreError::Write`] and the in-memory
//! index is left as it was before the call.
//!
//! No locking is performed. Two processes writing the same file race, and
//! the last successful rename wins.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use memory_harness_core::models::Document;
use memory_harness_core::store::{Store, StoreError};

/// File-backed [`Store`].
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    index: IndexMap<String, Document>,
}

impl JsonlStore {
    /// Open the store at `path`, loading any existing records.
    ///
    /// A missing file is an empty store; the file and its parent directory
    /// are created on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let index = load_index(&path)?;
        tracing::debug!(path = %path.display(), documents = index.len(), "opened store");
        Ok(Self { path, index })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Discard the in-memory index and re-read the backing file.
    ///
    /// Picks up writes made by other processes since this store was opened.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.index = load_index(&self.path)?;
        Ok(())
    }

    /// Apply `mutate` to a copy of the index, persist the copy, then adopt it.
    fn commit<F>(&mut self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut IndexMap<String, Document>),
    {
        let mut next = self.index.clone();
        mutate(&mut next);
        write_index(&self.path, &next)?;
        self.index = next;
        Ok(())
    }
}

impl Store for JsonlStore {
    fn put(&mut self, doc: Document) -> Result<(), StoreError> {
        self.commit(|index| {
            index.insert(doc.id.clone(), doc);
        })
    }

    fn get(&self, id: &str) -> Option<&Document> {
        self.index.get(id)
    }

    fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        if !self.index.contains_key(id) {
            return Ok(false);
        }
        self.commit(|index| {
            index.shift_remove(id);
        })?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(|index| index.clear())
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn documents(&self) -> Box<dyn Iterator<Item = &Document> + '_> {
        Box::new(self.index.values())
    }
}

fn load_index(path: &Path) -> Result<IndexMap<String, Document>, StoreError> {
    let mut index = IndexMap::new();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(index),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut skipped = 0usize;
    for (lineno, line) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = line.map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<Document>(&bytes) {
            Ok(doc) => {
                index.insert(doc.id.clone(), doc);
            }
            Err(e) => {
                skipped += 1;
                tracing::debug!(line = lineno + 1, error = %e, "skipping malformed store record");
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(path = %path.display(), skipped, "ignored malformed lines");
    }
    Ok(index)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_index(path: &Path, index: &IndexMap<String, Document>) -> Result<(), StoreError> {
    let write_err = |source: io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Serialize first so an unserializable document never truncates anything.
    let mut lines = Vec::with_capacity(index.len());
    for doc in index.values() {
        check_finite(doc)?;
        let line = serde_json::to_string(doc).map_err(|source| StoreError::Serialize {
            id: doc.id.clone(),
            source,
        })?;
        lines.push(line);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = write_lines(&tmp, &lines).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }

    tracing::debug!(path = %path.display(), documents = index.len(), "flushed store");
    Ok(())
}

fn write_lines(tmp: &Path, lines: &[String]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// JSON has no encoding for NaN or infinity; `serde_json` would write `null`
/// and the record would fail to load on the next open.
fn check_finite(doc: &Document) -> Result<(), StoreError> {
    let sparse_ok = doc.embedding.sparse.values().all(|w| w.is_finite());
    let dense_ok = doc
        .embedding
        .dense
        .as_ref()
        .map_or(true, |v| v.iter().all(|f| f.is_finite()));
    if sparse_ok && dense_ok {
        return Ok(());
    }
    Err(StoreError::Serialize {
        id: doc.id.clone(),
        source: serde::ser::Error::custom("embedding contains a non-finite value"),
    })
}
