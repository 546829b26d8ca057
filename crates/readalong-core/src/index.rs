//! The persisted book index and its content hash.
//!
//! A [`BookIndex`] is derived entirely from the book text: normalized
//! chunks, the inverted n-gram and word tables, and metadata. It is keyed
//! in an [`IndexStore`](crate::store::IndexStore) by [`book_hash`], so a
//! changed text always produces a new key and a fresh index.
//!
//! Persisted indexes are untrusted. [`BookIndex::validate`] checks them
//! against the text they are about to serve; any failure is treated as a
//! cache miss by the locator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ChapterRange, Chunk};
use crate::ngram::NGramTable;

/// Version of the serialized index layout. Bumped on incompatible changes.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Book-level index metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub title: String,
    pub chunk_count: usize,
    /// Unix seconds.
    pub created_at: i64,
    pub version: u32,
    #[serde(default)]
    pub chapters: Vec<ChapterRange>,
}

/// All retrieval structures for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookIndex {
    pub book_hash: String,
    pub normalized_chunks: Vec<String>,
    pub tables: NGramTable,
    pub metadata: IndexMetadata,
}

/// Why a persisted index cannot serve a book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexValidationError {
    #[error("index is for book {found}, expected {expected}")]
    HashMismatch { expected: String, found: String },
    #[error("index format version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("index holds {found} chunks, book has {expected}")]
    ChunkCountMismatch { expected: usize, found: usize },
    #[error("index metadata claims {claimed} chunks but stores {stored}")]
    InconsistentChunkCount { claimed: usize, stored: usize },
    #[error("index references chunk {index}, past the last chunk")]
    IndexOutOfRange { index: usize },
    #[error("chapter '{id}' covers [{start}, {end}], outside the book")]
    ChapterOutOfRange { id: String, start: usize, end: usize },
}

impl BookIndex {
    /// Build a fresh index from chunked book text.
    pub fn build(
        book_hash: &str,
        title: &str,
        chunks: &[Chunk],
        chapters: Vec<ChapterRange>,
    ) -> Self {
        let normalized_chunks: Vec<String> = chunks.iter().map(|c| c.normalized.clone()).collect();
        let tables = NGramTable::build(&normalized_chunks);

        Self {
            book_hash: book_hash.to_string(),
            metadata: IndexMetadata {
                title: title.to_string(),
                chunk_count: normalized_chunks.len(),
                created_at: chrono::Utc::now().timestamp(),
                version: INDEX_FORMAT_VERSION,
                chapters,
            },
            normalized_chunks,
            tables,
        }
    }

    /// Check that this index can serve the book with `expected_hash` and
    /// `expected_chunks` chunks.
    pub fn validate(
        &self,
        expected_hash: &str,
        expected_chunks: usize,
    ) -> Result<(), IndexValidationError> {
        if self.book_hash != expected_hash {
            return Err(IndexValidationError::HashMismatch {
                expected: expected_hash.to_string(),
                found: self.book_hash.clone(),
            });
        }
        if self.metadata.version != INDEX_FORMAT_VERSION {
            return Err(IndexValidationError::VersionMismatch {
                expected: INDEX_FORMAT_VERSION,
                found: self.metadata.version,
            });
        }
        if self.metadata.chunk_count != self.normalized_chunks.len() {
            return Err(IndexValidationError::InconsistentChunkCount {
                claimed: self.metadata.chunk_count,
                stored: self.normalized_chunks.len(),
            });
        }
        if self.metadata.chunk_count != expected_chunks {
            return Err(IndexValidationError::ChunkCountMismatch {
                expected: expected_chunks,
                found: self.metadata.chunk_count,
            });
        }
        if let Some(index) = self.tables.max_referenced_index() {
            if index >= self.metadata.chunk_count {
                return Err(IndexValidationError::IndexOutOfRange { index });
            }
        }
        for chapter in &self.metadata.chapters {
            if chapter.start > chapter.end || chapter.end >= self.metadata.chunk_count {
                return Err(IndexValidationError::ChapterOutOfRange {
                    id: chapter.id.clone(),
                    start: chapter.start,
                    end: chapter.end,
                });
            }
        }
        Ok(())
    }
}

/// Stable content hash of the full book text, used as the index key.
///
/// SHA-256 hex with the `sha2` feature (default); otherwise a 64-bit
/// FNV-1a digest prefixed with `fnv1a-`.
#[cfg(feature = "sha2")]
pub fn book_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};

    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Stable content hash of the full book text, used as the index key.
#[cfg(not(feature = "sha2"))]
pub fn book_hash(text: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    let digest = text
        .as_bytes()
        .iter()
        .fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME));
    format!("fnv1a-{:016x}", digest)
}
