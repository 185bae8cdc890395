//! In-memory [`Store`] implementation for testing and ephemeral use.
//!
//! Backed by an insertion-ordered map so iteration order matches the
//! persistent store's.

use indexmap::IndexMap;

use crate::models::Document;

use super::{Store, StoreError};

/// In-memory store. Mutations never fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    docs: IndexMap<String, Document>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<Document> for InMemoryStore {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut docs = IndexMap::new();
        for doc in iter {
            docs.insert(doc.id.clone(), doc);
        }
        Self { docs }
    }
}

impl Store for InMemoryStore {
    fn put(&mut self, doc: Document) -> Result<(), StoreError> {
        self.docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&Document> {
        self.docs.get(id)
    }

    fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.docs.shift_remove(id).is_some())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.docs.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.docs.len()
    }

    fn documents(&self) -> Box<dyn Iterator<Item = &Document> + '_> {
        Box::new(self.docs.values())
    }
}
