//! In-memory [`IndexStore`] implementation for testing, WASM targets, and
//! as the fallback when the database cannot be opened.
//!
//! Holds the serialized JSON payload of each index in a `HashMap` behind
//! `std::sync::RwLock`, so loads exercise the same decode path as a
//! persistent backend. Contents are lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::index::BookIndex;

use super::{decode, encode, IndexStore, IndexSummary, StoreError};

struct StoredIndex {
    summary: IndexSummary,
    payload: String,
}

/// Volatile index store.
pub struct InMemoryIndexStore {
    indexes: RwLock<HashMap<String, StoredIndex>>,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Store a raw payload under `book_hash` without validating it.
    ///
    /// Lets callers seed the store with data written by other versions.
    pub fn insert_raw(&self, book_hash: &str, summary: IndexSummary, payload: String) {
        self.indexes
            .write()
            .unwrap()
            .insert(book_hash.to_string(), StoredIndex { summary, payload });
    }

    pub fn len(&self) -> usize {
        self.indexes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn index_exists(&self, book_hash: &str) -> Result<bool, StoreError> {
        Ok(self.indexes.read().unwrap().contains_key(book_hash))
    }

    async fn load_index(&self, book_hash: &str) -> Result<Option<BookIndex>, StoreError> {
        let indexes = self.indexes.read().unwrap();
        match indexes.get(book_hash) {
            Some(stored) => decode(book_hash, &stored.payload).map(Some),
            None => Ok(None),
        }
    }

    async fn save_index(&self, index: &BookIndex) -> Result<(), StoreError> {
        let payload = encode(index)?;
        self.indexes.write().unwrap().insert(
            index.book_hash.clone(),
            StoredIndex {
                summary: IndexSummary::of(index),
                payload,
            },
        );
        Ok(())
    }

    async fn delete_index(&self, book_hash: &str) -> Result<bool, StoreError> {
        Ok(self.indexes.write().unwrap().remove(book_hash).is_some())
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, StoreError> {
        let indexes = self.indexes.read().unwrap();
        let mut summaries: Vec<IndexSummary> =
            indexes.values().map(|s| s.summary.clone()).collect();
        summaries.sort_by(|a, b| a.book_hash.cmp(&b.book_hash));
        Ok(summaries)
    }
}
