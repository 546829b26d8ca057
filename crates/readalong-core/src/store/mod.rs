//! Storage abstraction for book indexes.
//!
//! The [`IndexStore`] trait is a small key-value interface keyed by book
//! content hash, enabling pluggable backends (SQLite in the application
//! crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Payloads are the JSON serialization of [`BookIndex`]; use [`encode`]
//! and [`decode`] so every backend agrees on the format.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::index::BookIndex;

/// Errors raised by index stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed index payload for {hash}: {source}")]
    Malformed {
        hash: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize index {hash}: {source}")]
    Serialization {
        hash: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("index store backend error: {0}")]
    Backend(String),
}

/// One row of [`IndexStore::list_indexes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub book_hash: String,
    pub title: String,
    pub chunk_count: usize,
    pub version: u32,
    /// Unix seconds.
    pub created_at: i64,
}

impl IndexSummary {
    pub fn of(index: &BookIndex) -> Self {
        Self {
            book_hash: index.book_hash.clone(),
            title: index.metadata.title.clone(),
            chunk_count: index.metadata.chunk_count,
            version: index.metadata.version,
            created_at: index.metadata.created_at,
        }
    }
}

/// Abstract persistence for computed book indexes.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`index_exists`](IndexStore::index_exists) | Check for an index by hash |
/// | [`load_index`](IndexStore::load_index) | Fetch and decode an index |
/// | [`save_index`](IndexStore::save_index) | Insert or replace an index |
/// | [`delete_index`](IndexStore::delete_index) | Remove an index |
/// | [`list_indexes`](IndexStore::list_indexes) | Summaries of all stored indexes |
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn index_exists(&self, book_hash: &str) -> Result<bool, StoreError>;

    /// `Ok(None)` when nothing is stored under `book_hash`. A stored payload
    /// that fails to decode is [`StoreError::Malformed`].
    async fn load_index(&self, book_hash: &str) -> Result<Option<BookIndex>, StoreError>;

    /// Insert or replace the index stored under `index.book_hash`.
    async fn save_index(&self, index: &BookIndex) -> Result<(), StoreError>;

    /// Returns whether an index was removed.
    async fn delete_index(&self, book_hash: &str) -> Result<bool, StoreError>;

    /// Summaries ordered by book hash.
    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, StoreError>;
}

#[async_trait]
impl<T: IndexStore + ?Sized> IndexStore for Arc<T> {
    async fn index_exists(&self, book_hash: &str) -> Result<bool, StoreError> {
        (**self).index_exists(book_hash).await
    }

    async fn load_index(&self, book_hash: &str) -> Result<Option<BookIndex>, StoreError> {
        (**self).load_index(book_hash).await
    }

    async fn save_index(&self, index: &BookIndex) -> Result<(), StoreError> {
        (**self).save_index(index).await
    }

    async fn delete_index(&self, book_hash: &str) -> Result<bool, StoreError> {
        (**self).delete_index(book_hash).await
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, StoreError> {
        (**self).list_indexes().await
    }
}

/// Serialize an index to its stored JSON payload.
pub fn encode(index: &BookIndex) -> Result<String, StoreError> {
    serde_json::to_string(index).map_err(|source| StoreError::Serialization {
        hash: index.book_hash.clone(),
        source,
    })
}

/// Parse a stored JSON payload.
pub fn decode(book_hash: &str, payload: &str) -> Result<BookIndex, StoreError> {
    serde_json::from_str(payload).map_err(|source| StoreError::Malformed {
        hash: book_hash.to_string(),
        source,
    })
}
