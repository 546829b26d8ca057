//! Native similarity backend.
//!
//! Produces the same scores as [`ReferenceBackend`](super::ReferenceBackend)
//! with less work:
//!
//! - the query is normalized, split, and n-grammed once per batch;
//! - n-grams are borrowed word slices in an `FxHashSet` instead of joined
//!   strings;
//! - every word and phrase pairing between query and candidate is scored
//!   once into [`PairScores`] and shared by the full alignment and all
//!   sliding windows;
//! - one DP buffer is reused across windows;
//! - candidates in a batch are scored in parallel with rayon.

use std::ops::Range;

use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::ngram::jaccard;
use crate::normalize::{normalize, words};

use super::align::word_match_score;
use super::reference::phrase_score;
use super::{
    char_similarity_chars, sliding_windows, substring_score, SimilarityBackend,
    SimilarityBreakdown, SimilarityWeights, EXACT_WORD_SCORE, SKIP_PENALTY,
};

/// Similarity backend with precomputed alignment tables and parallel
/// batch scoring.
#[derive(Debug, Clone, Default)]
pub struct AcceleratedBackend {
    weights: SimilarityWeights,
}

impl AcceleratedBackend {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }
}

impl SimilarityBackend for AcceleratedBackend {
    fn name(&self) -> &'static str {
        "accelerated"
    }

    fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    fn breakdown(&self, query: &str, candidate: &str) -> SimilarityBreakdown {
        let normalized = normalize(query);
        let query_words = words(&normalized);
        QueryProfile::new(&normalized, &query_words).breakdown(candidate)
    }

    fn score_batch(&self, query: &str, candidates: &[&str]) -> Vec<f64> {
        let normalized = normalize(query);
        let query_words = words(&normalized);
        let profile = QueryProfile::new(&normalized, &query_words);

        candidates
            .par_iter()
            .map(|candidate| profile.breakdown(candidate).combine(&self.weights))
            .collect()
    }
}

type GramSet<'a> = FxHashSet<&'a [&'a str]>;

fn gram_set<'a>(words: &'a [&'a str], n: usize) -> GramSet<'a> {
    if n == 0 || words.len() < n {
        return GramSet::default();
    }
    words.windows(n).collect()
}

/// Everything about the query that does not depend on the candidate.
struct QueryProfile<'a> {
    normalized: &'a str,
    chars: Vec<char>,
    words: &'a [&'a str],
    bigrams: GramSet<'a>,
    trigrams: GramSet<'a>,
    fourgrams: GramSet<'a>,
}

impl<'a> QueryProfile<'a> {
    fn new(normalized: &'a str, words: &'a [&'a str]) -> Self {
        Self {
            normalized,
            chars: normalized.chars().collect(),
            words,
            bigrams: gram_set(words, 2),
            trigrams: gram_set(words, 3),
            fourgrams: gram_set(words, 4),
        }
    }

    fn breakdown(&self, candidate: &str) -> SimilarityBreakdown {
        let cand_norm = normalize(candidate);
        let cand_words = words(&cand_norm);
        let cand_chars: Vec<char> = cand_norm.chars().collect();

        SimilarityBreakdown {
            word_level: self.word_level(&cand_words),
            bigram: jaccard(&self.bigrams, &gram_set(&cand_words, 2)),
            trigram: jaccard(&self.trigrams, &gram_set(&cand_words, 3)),
            fourgram: jaccard(&self.fourgrams, &gram_set(&cand_words, 4)),
            character: char_similarity_chars(&self.chars, &cand_chars),
            substring: substring_score(self.normalized, &cand_norm),
        }
    }

    fn word_level(&self, candidate: &[&str]) -> f64 {
        let (n, m) = (self.words.len(), candidate.len());
        if n == 0 || m == 0 {
            return 0.0;
        }

        let pairs = PairScores::new(self.words, candidate);
        let mut dp = Vec::new();

        let mut best = pairs.align(0..n, 0..m, &mut dp);
        for window in sliding_windows(n, m) {
            best = best.max(pairs.align(0..n, window, &mut dp));
        }
        for window in sliding_windows(m, n) {
            best = best.max(pairs.align(window, 0..m, &mut dp));
        }
        best.min(1.0)
    }
}

/// Alignment gains for every `(query word i, candidate word j)` cell.
///
/// Phrase tables are keyed by the position of the phrase's last word, so
/// `word_phrase[i][j]` pairs query word `i` with candidate words `j-1, j`.
struct PairScores {
    cols: usize,
    word_word: Vec<Option<f64>>,
    word_phrase: Vec<Option<f64>>,
    phrase_word: Vec<Option<f64>>,
    phrase_phrase: Vec<Option<f64>>,
}

impl PairScores {
    fn new(query: &[&str], candidate: &[&str]) -> Self {
        let (rows, cols) = (query.len(), candidate.len());
        let query_phrases = joined_pairs(query);
        let cand_phrases = joined_pairs(candidate);

        let mut word_word = Vec::with_capacity(rows * cols);
        let mut word_phrase = Vec::with_capacity(rows * cols);
        let mut phrase_word = Vec::with_capacity(rows * cols);
        let mut phrase_phrase = Vec::with_capacity(rows * cols);

        for i in 0..rows {
            for j in 0..cols {
                word_word.push(word_match_score(query[i], candidate[j]));
                word_phrase.push(
                    cand_phrases[j]
                        .as_deref()
                        .and_then(|phrase| phrase_score(query[i], phrase, 1.0)),
                );
                phrase_word.push(
                    query_phrases[i]
                        .as_deref()
                        .and_then(|phrase| phrase_score(phrase, candidate[j], 1.0)),
                );
                phrase_phrase.push(match (&query_phrases[i], &cand_phrases[j]) {
                    (Some(left), Some(right)) => phrase_score(left, right, 2.0),
                    _ => None,
                });
            }
        }

        Self {
            cols,
            word_word,
            word_phrase,
            phrase_word,
            phrase_phrase,
        }
    }

    /// Same recurrence as the reference alignment, over a query range and
    /// a candidate range, reading gains from the precomputed tables.
    fn align(&self, query: Range<usize>, candidate: Range<usize>, dp: &mut Vec<f64>) -> f64 {
        let (n, m) = (query.len(), candidate.len());
        if n == 0 || m == 0 {
            return 0.0;
        }

        let width = m + 1;
        dp.clear();
        dp.resize((n + 1) * width, 0.0);
        for i in 1..=n {
            dp[i * width] = i as f64 * SKIP_PENALTY;
        }
        for j in 1..=m {
            dp[j] = j as f64 * SKIP_PENALTY;
        }

        for i in 1..=n {
            let row = (query.start + i - 1) * self.cols;
            for j in 1..=m {
                let cell = row + candidate.start + j - 1;
                let mut best = (dp[(i - 1) * width + j] + SKIP_PENALTY)
                    .max(dp[i * width + j - 1] + SKIP_PENALTY);

                if let Some(score) = self.word_word[cell] {
                    best = best.max(dp[(i - 1) * width + j - 1] + score);
                }
                if j >= 2 {
                    if let Some(score) = self.word_phrase[cell] {
                        best = best.max(dp[(i - 1) * width + j - 2] + score);
                    }
                }
                if i >= 2 {
                    if let Some(score) = self.phrase_word[cell] {
                        best = best.max(dp[(i - 2) * width + j - 1] + score);
                    }
                }
                if i >= 2 && j >= 2 {
                    if let Some(score) = self.phrase_phrase[cell] {
                        best = best.max(dp[(i - 2) * width + j - 2] + score);
                    }
                }

                dp[i * width + j] = best;
            }
        }

        let score = dp[n * width + m] / (n.min(m) as f64 * EXACT_WORD_SCORE);
        score.clamp(0.0, 1.0)
    }
}

/// `out[k]` is `"words[k-1] words[k]"`; `out[0]` is `None`.
fn joined_pairs(words: &[&str]) -> Vec<Option<String>> {
    (0..words.len())
        .map(|k| (k >= 1).then(|| format!("{} {}", words[k - 1], words[k])))
        .collect()
}
