//! The snippet locator: owns one active book and answers "where in the
//! book is this transcript?".
//!
//! The locator operates entirely through the [`IndexStore`] and
//! [`SimilarityBackend`] traits, with no database or configuration
//! dependencies. The calling application builds [`LocatorParams`] from its
//! own config and picks the store and backend.
//!
//! # Indexing
//!
//! 1. Hash the full text ([`book_hash`]) and chunk it.
//! 2. Try the store: a persisted index that validates against this text is
//!    reused; a missing, malformed, or stale one is rebuilt and saved.
//! 3. Chapter ranges come from the supplied chapters when given, otherwise
//!    from the persisted index.
//! 4. The active book is replaced in a single assignment.
//!
//! Store failures never fail indexing: they are logged and the index is
//! computed in memory.
//!
//! # Search
//!
//! 1. Resolve the scope: the whole book, or one chapter by id then title.
//! 2. Shortlist chunks sharing a 2- or 3-gram with the query. The
//!    shortlist is used only when it is non-empty and smaller than half the
//!    scope.
//! 3. Skip chunks more than twice as long or less than half as long
//!    (in characters) as the query.
//! 4. Score the rest and keep the highest, ties to the lowest index.
//! 5. Accept it only when the score exceeds the threshold.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use tracing::{debug, info, warn};

use crate::chunk::{build_chapter_ranges, chunk_book};
use crate::index::{book_hash, BookIndex};
use crate::models::{Chapter, ChapterRange, Chunk, IndexOutcome, IndexSource, MatchResult, SpanMatch};
use crate::ngram::word_ngrams;
use crate::normalize::{normalize, words};
use crate::similarity::{Backend, SimilarityBackend};
use crate::span::{SpanIndex, DEFAULT_STEP_WORDS, DEFAULT_WINDOW_WORDS};
use crate::store::IndexStore;

/// Minimum combined score (exclusive) for a match to be accepted.
pub const DEFAULT_THRESHOLD: f64 = 0.25;

/// N-gram orders used to shortlist candidates.
const SHORTLIST_NGRAM_SIZES: [usize; 2] = [2, 3];

/// Maximum character-length ratio between query and candidate.
const MAX_LENGTH_RATIO: usize = 2;

/// Locator tuning parameters, decoupled from application config.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorParams {
    /// A match must score strictly above this.
    pub threshold: f64,
    /// Words per span-locator window.
    pub span_window_words: usize,
    /// Words between consecutive span-locator windows.
    pub span_step_words: usize,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            span_window_words: DEFAULT_WINDOW_WORDS,
            span_step_words: DEFAULT_STEP_WORDS,
        }
    }
}

struct ActiveBook {
    chunks: Vec<Chunk>,
    index: BookIndex,
    chapters: Vec<ChapterRange>,
    span: SpanIndex,
}

/// Locates transcript snippets in the active book.
pub struct Locator<S: IndexStore, B: SimilarityBackend = Backend> {
    store: S,
    backend: B,
    params: LocatorParams,
    active: Option<ActiveBook>,
}

impl<S: IndexStore, B: SimilarityBackend> Locator<S, B> {
    pub fn new(store: S, backend: B, params: LocatorParams) -> Self {
        Self {
            store,
            backend,
            params,
            active: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    /// Hash of the active book, if any.
    pub fn book_hash(&self) -> Option<&str> {
        self.active.as_ref().map(|b| b.index.book_hash.as_str())
    }

    /// Number of chunks in the active book (0 when none is loaded).
    pub fn chunk_count(&self) -> usize {
        self.active.as_ref().map_or(0, |b| b.chunks.len())
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.active.as_ref().and_then(|b| b.chunks.get(index))
    }

    /// Chapter ranges of the active book.
    pub fn chapters(&self) -> &[ChapterRange] {
        self.active.as_ref().map_or(&[], |b| b.chapters.as_slice())
    }

    /// Make `text` the active book, reusing a persisted index when one
    /// is valid for it.
    pub async fn create_index(
        &mut self,
        text: &str,
        title: &str,
        chapters: Option<&[Chapter]>,
    ) -> IndexOutcome {
        let hash = book_hash(text);
        let chunks = chunk_book(text);
        let supplied = chapters.map(|c| clamp_ranges(build_chapter_ranges(c), chunks.len()));

        // Persisted indexes are never rewritten; supplied chapters only
        // scope the active book.
        let (index, source) = match self.load_valid(&hash, chunks.len()).await {
            Some(index) => (index, IndexSource::Loaded),
            None => {
                let index = BookIndex::build(&hash, title, &chunks, supplied.clone().unwrap_or_default());
                self.save(&index).await;
                (index, IndexSource::Built)
            }
        };

        let chapters = supplied.unwrap_or_else(|| index.metadata.chapters.clone());
        let span = SpanIndex::build(
            text,
            self.params.span_window_words,
            self.params.span_step_words,
        );

        let outcome = IndexOutcome {
            book_hash: hash,
            chunk_count: chunks.len(),
            chapter_count: chapters.len(),
            source,
        };
        info!(
            book = %outcome.book_hash,
            chunks = outcome.chunk_count,
            chapters = outcome.chapter_count,
            source = ?outcome.source,
            "book indexed"
        );

        self.active = Some(ActiveBook {
            chunks,
            index,
            chapters,
            span,
        });
        outcome
    }

    async fn load_valid(&self, hash: &str, chunk_count: usize) -> Option<BookIndex> {
        match self.store.load_index(hash).await {
            Ok(Some(index)) => match index.validate(hash, chunk_count) {
                Ok(()) => Some(index),
                Err(e) => {
                    warn!(book = %hash, error = %e, "persisted index rejected; rebuilding");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(book = %hash, error = %e, "failed to load persisted index; rebuilding");
                None
            }
        }
    }

    async fn save(&self, index: &BookIndex) {
        if let Err(e) = self.store.save_index(index).await {
            warn!(book = %index.book_hash, error = %e, "failed to persist index; keeping it in memory");
        }
    }

    /// Find the chunk best matching `query`, optionally within one chapter.
    ///
    /// Returns `None` for an empty query or book, or when no candidate
    /// scores above the threshold.
    ///
    /// A query sharing no 2- or 3-gram with the scope scores every
    /// length-compatible chunk in it. On a book of several thousand chunks
    /// that costs on the order of a second; scoping by chapter bounds it.
    pub fn search(&self, query: &str, chapter: Option<&str>) -> Option<MatchResult> {
        let book = self.active.as_ref()?;
        if book.chunks.is_empty() {
            return None;
        }
        let query_norm = normalize(query);
        if query_norm.is_empty() {
            return None;
        }

        let scope = book.scope(chapter);
        let shortlist = book.shortlist(&query_norm, &scope);

        let query_len = query_norm.chars().count();
        let (ids, texts): (Vec<usize>, Vec<&str>) = shortlist
            .into_iter()
            .map(|i| (i, book.index.normalized_chunks[i].as_str()))
            .filter(|(_, text)| within_length_ratio(query_len, text.chars().count()))
            .unzip();

        if ids.is_empty() {
            debug!("no candidate within the length ratio");
            return None;
        }

        let scores = self.backend.score_batch(&query_norm, &texts);
        let mut best: Option<(usize, f64)> = None;
        for (&id, &score) in ids.iter().zip(&scores) {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((id, score));
            }
        }

        let (index, score) = best?;
        debug!(
            candidates = ids.len(),
            best = index,
            score,
            backend = self.backend.name(),
            "scored candidates"
        );
        if score <= self.params.threshold {
            return None;
        }

        Some(MatchResult {
            index,
            text: book.chunks[index].text.clone(),
            score,
        })
    }

    /// Locate the exact run of book words matching `query`.
    pub fn locate_span(&self, query: &str) -> Option<SpanMatch> {
        self.active.as_ref()?.span.locate(query)
    }
}

impl ActiveBook {
    /// Chunk indices a search may consider.
    fn scope(&self, chapter: Option<&str>) -> RangeInclusive<usize> {
        let whole = 0..=self.chunks.len() - 1;
        let Some(key) = chapter else {
            return whole;
        };
        let found = self
            .chapters
            .iter()
            .find(|c| c.id == key)
            .or_else(|| self.chapters.iter().find(|c| c.title == key));
        match found {
            Some(range) => range.start..=range.end,
            None => {
                debug!(chapter = %key, "unknown chapter; searching the whole book");
                whole
            }
        }
    }

    /// Candidate indices in `scope`, narrowed by n-gram hits when that
    /// is selective enough.
    fn shortlist(&self, query_norm: &str, scope: &RangeInclusive<usize>) -> Vec<usize> {
        let query_words = words(query_norm);
        let mut hits = BTreeSet::new();
        for &n in &SHORTLIST_NGRAM_SIZES {
            for gram in word_ngrams(&query_words, n) {
                hits.extend(
                    self.index
                        .tables
                        .lookup(n, &gram)
                        .iter()
                        .copied()
                        .filter(|i| scope.contains(i)),
                );
            }
        }

        let scope_len = scope.end() + 1 - scope.start();
        if !hits.is_empty() && hits.len() * 2 < scope_len {
            hits.into_iter().collect()
        } else {
            scope.clone().collect()
        }
    }
}

fn within_length_ratio(query_len: usize, candidate_len: usize) -> bool {
    candidate_len <= query_len * MAX_LENGTH_RATIO && query_len <= candidate_len * MAX_LENGTH_RATIO
}

/// Drop ranges starting past the last chunk and trim the rest to it.
fn clamp_ranges(ranges: Vec<ChapterRange>, chunk_count: usize) -> Vec<ChapterRange> {
    let total = ranges.len();
    let clamped: Vec<ChapterRange> = ranges
        .into_iter()
        .filter(|r| r.start < chunk_count)
        .map(|mut r| {
            r.end = r.end.min(chunk_count - 1);
            r
        })
        .collect();
    if clamped.len() != total {
        debug!(
            dropped = total - clamped.len(),
            "chapter ranges past the end of the book dropped"
        );
    }
    clamped
}
