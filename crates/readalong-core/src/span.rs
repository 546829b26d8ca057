//! Word-window locator for highlighting the exact words a snippet covers.
//!
//! Where [`Locator::search`](crate::locator::Locator::search) answers
//! "which chunk", this answers "which words". The book's normalized words
//! are cut into overlapping windows, a 3-gram inverted index picks the
//! most promising windows, and a local (Smith-Waterman) word alignment
//! inside each finds the best matching run.
//!
//! # Scoring
//!
//! | Pair | Score |
//! |------|-------|
//! | identical words | +2 |
//! | edit distance ≤ 1 | +1 |
//! | otherwise | −1 |
//! | gap on either side | −1 |
//!
//! Cells never go below zero, so an alignment can start anywhere.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::SpanMatch;
use crate::ngram::word_ngrams;
use crate::normalize::{normalize, words};
use crate::similarity::levenshtein;

pub const DEFAULT_WINDOW_WORDS: usize = 100;
pub const DEFAULT_STEP_WORDS: usize = 30;
/// Windows aligned per query.
pub const TOP_WINDOWS: usize = 20;

const SCORE_EXACT: i32 = 2;
const SCORE_FUZZY: i32 = 1;
const SCORE_MISMATCH: i32 = -1;
const SCORE_GAP: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Window {
    start: usize,
    /// Exclusive.
    end: usize,
}

/// Word windows and their 3-gram index over one book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanIndex {
    words: Vec<String>,
    windows: Vec<Window>,
    trigrams: HashMap<String, Vec<usize>>,
}

impl SpanIndex {
    /// Cut the book into windows of `window_words` advancing by
    /// `step_words`. The last window always ends at the last word.
    pub fn build(text: &str, window_words: usize, step_words: usize) -> Self {
        let window_words = window_words.max(1);
        let step_words = step_words.max(1);

        let normalized = normalize(text);
        let book: Vec<String> = words(&normalized).into_iter().map(str::to_string).collect();

        let mut windows = Vec::new();
        let mut trigrams: HashMap<String, Vec<usize>> = HashMap::new();
        let mut start = 0usize;
        while start < book.len() {
            let end = (start + window_words).min(book.len());
            let id = windows.len();

            let slice: Vec<&str> = book[start..end].iter().map(String::as_str).collect();
            for gram in word_ngrams(&slice, 3) {
                let ids = trigrams.entry(gram).or_default();
                if ids.last() != Some(&id) {
                    ids.push(id);
                }
            }
            windows.push(Window { start, end });

            if end == book.len() {
                break;
            }
            start += step_words;
        }

        debug!(
            words = book.len(),
            windows = windows.len(),
            "span index built"
        );

        Self {
            words: book,
            windows,
            trigrams,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Find the best local word alignment of `query` in the book.
    ///
    /// Returns `None` for an empty book or query, or when no alignment
    /// scores above zero.
    pub fn locate(&self, query: &str) -> Option<SpanMatch> {
        if self.windows.is_empty() {
            return None;
        }
        let normalized = normalize(query);
        let query_words = words(&normalized);
        if query_words.is_empty() {
            return None;
        }

        let candidates = self.candidate_windows(&query_words);

        let mut best: Option<(usize, Alignment)> = None;
        for id in candidates {
            let window = &self.windows[id];
            let floor = best.as_ref().map_or(0, |(_, a)| a.score.max(0));
            let alignment = align(&query_words, &self.words[window.start..window.end], floor);
            let better = best
                .as_ref()
                .map_or(true, |(_, current)| alignment.score > current.score);
            if better {
                best = Some((id, alignment));
            }
        }

        let (window_id, alignment) = best.filter(|(_, a)| a.score > 0)?;
        let window = &self.windows[window_id];
        let start_word = window.start + alignment.start;
        let end_word = window.start + alignment.end;
        if start_word > end_word || end_word >= self.words.len() {
            return None;
        }

        let alignment_score = f64::from(alignment.score);
        Some(SpanMatch {
            window_id,
            start_word,
            end_word,
            matched_text: self.words[start_word..=end_word].join(" "),
            alignment_score,
            confidence: alignment_score / (2.0 * query_words.len() as f64),
        })
    }

    /// Top windows by shared query 3-grams (ties to the lower id), or the
    /// first windows when nothing is shared.
    fn candidate_windows(&self, query_words: &[&str]) -> Vec<usize> {
        let mut overlap: HashMap<usize, usize> = HashMap::new();
        for gram in word_ngrams(query_words, 3) {
            if let Some(ids) = self.trigrams.get(&gram) {
                for &id in ids {
                    *overlap.entry(id).or_insert(0) += 1;
                }
            }
        }

        if overlap.is_empty() {
            return (0..self.windows.len().min(TOP_WINDOWS)).collect();
        }

        let mut ranked: Vec<(usize, usize)> = overlap.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(TOP_WINDOWS).map(|(id, _)| id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Alignment {
    score: i32,
    /// Window-relative word range, inclusive.
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Stop,
    Diagonal,
    Up,
    Left,
}

fn pair_score(a: &str, b: &str) -> i32 {
    if a == b {
        SCORE_EXACT
    } else if levenshtein(a, b) <= 1 {
        SCORE_FUZZY
    } else {
        SCORE_MISMATCH
    }
}

/// Local alignment of the query against one window.
///
/// Stops scanning rows once the current row maximum plus an exact match
/// for every remaining query word cannot reach `floor`.
fn align(query: &[&str], window: &[String], floor: i32) -> Alignment {
    let (m, n) = (query.len(), window.len());
    let empty = Alignment {
        score: 0,
        start: 0,
        end: 0,
    };
    if m == 0 || n == 0 {
        return empty;
    }

    let width = n + 1;
    let mut dp = vec![0i32; (m + 1) * width];
    let mut trace = vec![Step::Stop; (m + 1) * width];
    let mut max_score = 0;
    let mut max_pos = (0usize, 0usize);

    for i in 1..=m {
        let mut row_max = 0;
        for j in 1..=n {
            let diagonal = dp[(i - 1) * width + j - 1] + pair_score(query[i - 1], &window[j - 1]);
            let up = dp[(i - 1) * width + j] + SCORE_GAP;
            let left = dp[i * width + j - 1] + SCORE_GAP;

            let mut best = 0;
            let mut step = Step::Stop;
            if diagonal > best {
                best = diagonal;
                step = Step::Diagonal;
            }
            if up > best {
                best = up;
                step = Step::Up;
            }
            if left > best {
                best = left;
                step = Step::Left;
            }

            dp[i * width + j] = best;
            trace[i * width + j] = step;
            if best > max_score {
                max_score = best;
                max_pos = (i, j);
            }
            row_max = row_max.max(best);
        }

        let reachable = row_max + (m - i) as i32 * SCORE_EXACT;
        if reachable < floor {
            break;
        }
    }

    if max_score <= 0 {
        return empty;
    }

    let (mut i, mut j) = max_pos;
    let end = j - 1;
    while i > 0 && j > 0 {
        match trace[i * width + j] {
            Step::Stop => break,
            Step::Diagonal => {
                i -= 1;
                j -= 1;
            }
            Step::Up => i -= 1,
            Step::Left => j -= 1,
        }
    }

    Alignment {
        score: max_score,
        start: j,
        end,
    }
}
