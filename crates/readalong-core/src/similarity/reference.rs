//! Direct implementation of every similarity metric.
//!
//! Each call recomputes everything from the two input strings. This is the
//! behavior other backends are measured against.

use crate::ngram::{generate_ngrams, jaccard};
use crate::normalize::{normalize, words};

use super::align::{word_match_score, word_to_phrase_similarity};
use super::{
    char_similarity, sliding_windows, substring_score, SimilarityBackend, SimilarityBreakdown,
    SimilarityWeights, EXACT_WORD_SCORE, PHRASE_MATCH_THRESHOLD, SKIP_PENALTY,
};

/// Similarity backend that evaluates the metrics directly.
#[derive(Debug, Clone, Default)]
pub struct ReferenceBackend {
    weights: SimilarityWeights,
}

impl ReferenceBackend {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }
}

impl SimilarityBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    fn breakdown(&self, query: &str, candidate: &str) -> SimilarityBreakdown {
        let query = normalize(query);
        let candidate = normalize(candidate);

        SimilarityBreakdown {
            word_level: word_level_similarity(&query, &candidate),
            bigram: jaccard(&generate_ngrams(&query, 2), &generate_ngrams(&candidate, 2)),
            trigram: jaccard(&generate_ngrams(&query, 3), &generate_ngrams(&candidate, 3)),
            fourgram: jaccard(&generate_ngrams(&query, 4), &generate_ngrams(&candidate, 4)),
            character: char_similarity(&query, &candidate),
            substring: substring_score(&query, &candidate),
        }
    }
}

/// Word-level sequence alignment score in `[0, 1]`.
///
/// Aligns the full word sequences, then every sliding window of the
/// candidate against the query and every sliding window of the query
/// against the candidate, keeping the best score.
pub fn word_level_similarity(query: &str, candidate: &str) -> f64 {
    let query = normalize(query);
    let candidate = normalize(candidate);
    let q = words(&query);
    let c = words(&candidate);
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }

    let mut best = align_words(&q, &c);
    for window in sliding_windows(q.len(), c.len()) {
        best = best.max(align_words(&q, &c[window]));
    }
    for window in sliding_windows(c.len(), q.len()) {
        best = best.max(align_words(&q[window], &c));
    }
    best.min(1.0)
}

/// Align two word sequences and normalize the final DP cell by
/// `min(len) × EXACT_WORD_SCORE`.
///
/// The table is a flat `(n + 1) × (m + 1)` array. Row and column zero
/// hold the cumulative cost of skipping leading words.
fn align_words(a: &[&str], b: &[&str]) -> f64 {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return 0.0;
    }

    let width = m + 1;
    let mut dp = vec![0.0f64; (n + 1) * width];
    for i in 1..=n {
        dp[i * width] = i as f64 * SKIP_PENALTY;
    }
    for j in 1..=m {
        dp[j] = j as f64 * SKIP_PENALTY;
    }

    for i in 1..=n {
        for j in 1..=m {
            let mut best = (dp[(i - 1) * width + j] + SKIP_PENALTY)
                .max(dp[i * width + j - 1] + SKIP_PENALTY);

            if let Some(score) = word_match_score(a[i - 1], b[j - 1]) {
                best = best.max(dp[(i - 1) * width + j - 1] + score);
            }

            if j >= 2 {
                let phrase = format!("{} {}", b[j - 2], b[j - 1]);
                if let Some(score) = phrase_score(a[i - 1], &phrase, 1.0) {
                    best = best.max(dp[(i - 1) * width + j - 2] + score);
                }
            }

            if i >= 2 {
                let phrase = format!("{} {}", a[i - 2], a[i - 1]);
                if let Some(score) = phrase_score(&phrase, b[j - 1], 1.0) {
                    best = best.max(dp[(i - 2) * width + j - 1] + score);
                }
            }

            if i >= 2 && j >= 2 {
                let left = format!("{} {}", a[i - 2], a[i - 1]);
                let right = format!("{} {}", b[j - 2], b[j - 1]);
                if let Some(score) = phrase_score(&left, &right, 2.0) {
                    best = best.max(dp[(i - 2) * width + j - 2] + score);
                }
            }

            dp[i * width + j] = best;
        }
    }

    let score = dp[n * width + m] / (n.min(m) as f64 * EXACT_WORD_SCORE);
    score.clamp(0.0, 1.0)
}

/// Phrase alignment gain: similarity scaled by the per-word maximum and
/// by how many words it covers on the shorter side.
pub(super) fn phrase_score(left: &str, right: &str, covered: f64) -> Option<f64> {
    let similarity = word_to_phrase_similarity(left, right);
    (similarity > PHRASE_MATCH_THRESHOLD).then(|| similarity * EXACT_WORD_SCORE * covered)
}
