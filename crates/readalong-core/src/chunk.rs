//! Sentence/paragraph chunker and chapter scoping.
//!
//! Splits a book into [`Chunk`]s, the units the locator returns. A chunk
//! boundary falls after sentence-ending punctuation followed by
//! whitespace, and at blank-line paragraph breaks.
//!
//! # Algorithm
//!
//! 1. Scan the text once, tracking the start of the current piece.
//! 2. After `.`, `!`, `?` or `…` (plus any closing quotes or brackets),
//!    if whitespace follows, end the piece there.
//! 3. At a newline followed by optional spaces and another newline, end
//!    the piece.
//! 4. Trim every piece and drop those of 10 characters or fewer: too
//!    short to disambiguate a location.
//!
//! # Example
//!
//! ```rust
//! use readalong_core::chunk::split_to_chunks;
//!
//! let chunks = split_to_chunks("Go. He left.\n\nThe rain kept falling all night long.");
//! assert_eq!(chunks, vec!["The rain kept falling all night long."]);
//! ```

use tracing::debug;

use crate::models::{Chapter, ChapterRange, Chunk};
use crate::normalize::normalize;

/// Chunks whose trimmed length is at most this many characters are dropped.
pub const MIN_CHUNK_CHARS: usize = 10;

const SENTENCE_END: [char; 4] = ['.', '!', '?', '…'];
const CLOSERS: [char; 8] = ['"', '\'', '”', '’', '»', ')', ']', '}'];

/// Split text into ordered chunk strings.
///
/// Pieces are trimmed; pieces of [`MIN_CHUNK_CHARS`] characters or fewer
/// are discarded.
pub fn split_to_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut k = 0usize;

    while k < chars.len() {
        let (pos, c) = chars[k];

        if SENTENCE_END.contains(&c) {
            let mut end = k + 1;
            while end < chars.len() && CLOSERS.contains(&chars[end].1) {
                end += 1;
            }
            if end < chars.len() && chars[end].1.is_whitespace() {
                let cut = chars[end].0;
                push_piece(&mut chunks, &text[start..cut]);
                start = cut;
                k = end;
                continue;
            }
            k = end;
            continue;
        }

        if c == '\n' {
            let mut next = k + 1;
            while next < chars.len() && chars[next].1 != '\n' && chars[next].1.is_whitespace() {
                next += 1;
            }
            if next < chars.len() && chars[next].1 == '\n' {
                push_piece(&mut chunks, &text[start..pos]);
                start = chars[next].0;
                k = next;
                continue;
            }
        }

        k += 1;
    }

    push_piece(&mut chunks, &text[start..]);
    chunks
}

fn push_piece(chunks: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if trimmed.chars().count() > MIN_CHUNK_CHARS {
        chunks.push(trimmed.to_string());
    }
}

/// Chunk a whole book, assigning indices and cached normalized text.
pub fn chunk_book(text: &str) -> Vec<Chunk> {
    split_to_chunks(text)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index,
            normalized: normalize(&text),
            text,
        })
        .collect()
}

/// Map chapters onto contiguous blocks of global chunk indices.
///
/// Each chapter's text is chunked on its own; the chapter receives the
/// next block of indices. Chapters that produce no chunks are skipped and
/// do not advance the cursor.
pub fn build_chapter_ranges(chapters: &[Chapter]) -> Vec<ChapterRange> {
    let mut ranges = Vec::with_capacity(chapters.len());
    let mut cursor = 0usize;

    for chapter in chapters {
        let produced = split_to_chunks(&chapter.text).len();
        if produced == 0 {
            debug!(chapter = %chapter.id, "chapter produced no chunks; skipped");
            continue;
        }
        ranges.push(ChapterRange {
            id: chapter.id.clone(),
            title: chapter.title.clone(),
            start: cursor,
            end: cursor + produced - 1,
        });
        cursor += produced;
    }

    ranges
}
