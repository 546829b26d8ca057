//! Core data models shared by the chunker, index, and locator.

use serde::{Deserialize, Serialize};

/// An addressable unit of reference text (sentence or paragraph sized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Absolute 0-based position in the book's chunk sequence.
    pub index: usize,
    /// Original text with casing and punctuation, trimmed.
    pub text: String,
    /// Cached [`normalize`](crate::normalize::normalize)d text.
    pub normalized: String,
}

/// A chapter boundary supplied by the document-extraction side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

/// Inclusive `[start, end]` span of global chunk indices for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub id: String,
    pub title: String,
    pub start: usize,
    pub end: usize,
}

impl ChapterRange {
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Number of chunks covered.
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// The accepted location of a transcript snippet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Chunk index of the match.
    pub index: usize,
    /// The chunk's original (non-normalized) text.
    pub text: String,
    /// Combined similarity in `[0, 1]`.
    pub score: f64,
}

/// Where the active index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexSource {
    /// Computed from the text (and saved when the store allowed it).
    Built,
    /// Reused from the index store.
    Loaded,
}

/// Summary of a [`Locator::create_index`](crate::locator::Locator::create_index) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexOutcome {
    pub book_hash: String,
    pub chunk_count: usize,
    pub chapter_count: usize,
    pub source: IndexSource,
}

/// Word-level location of a snippet, for highlighting the matched words.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanMatch {
    /// Word window the alignment was found in.
    pub window_id: usize,
    /// Absolute index of the first matched book word.
    pub start_word: usize,
    /// Absolute index of the last matched book word (inclusive).
    pub end_word: usize,
    /// The matched normalized book words joined by spaces.
    pub matched_text: String,
    /// Raw local alignment score.
    pub alignment_score: f64,
    /// `alignment_score / (2 × query words)`.
    pub confidence: f64,
}
