//! Fuzzy similarity between a transcript snippet and a reference chunk.
//!
//! Four complementary metrics are combined into one score in `[0, 1]`:
//!
//! | Metric | Weight | Catches |
//! |--------|--------|---------|
//! | Word-level sequence alignment | 0.50 | substitutions, insertions, split/merged words |
//! | 3-gram Jaccard | 0.15 | local word order |
//! | 2-gram Jaccard | 0.15 | local word order |
//! | 4-gram Jaccard | 0.10 | longer exact runs |
//! | Character similarity | 0.05 | spelling-level noise |
//! | Substring containment (0.5 bonus) | 0.05 | snippet fully inside chunk |
//!
//! Transcription errors corrupt characters and words locally but rarely
//! reorder whole phrases, so the alignment score dominates.
//!
//! # Backends
//!
//! [`SimilarityBackend`] has two implementations producing the same scores:
//!
//! - [`ReferenceBackend`] computes every metric directly from the text.
//! - `AcceleratedBackend` (feature `accelerated`) prepares the query once,
//!   shares precomputed word-pair scores across sliding alignment windows,
//!   and scores candidate batches in parallel.
//!
//! [`Backend::select`] picks one at startup and falls back to the
//! reference backend when the accelerated one is not compiled in.

mod align;
#[cfg(feature = "accelerated")]
mod accelerated;
mod reference;

use std::ops::Range;

use serde::{Deserialize, Serialize};

pub use align::{word_match_score, word_to_phrase_similarity, words_similar};
#[cfg(feature = "accelerated")]
pub use accelerated::AcceleratedBackend;
pub use reference::{word_level_similarity, ReferenceBackend};

/// Minimum character similarity for two words to count as a match.
pub const WORD_MATCH_THRESHOLD: f64 = 0.6;
/// Minimum length of the shorter word for substring containment to count.
pub const MIN_CONTAINED_WORD_CHARS: usize = 3;
/// Score of an identical word pair; the per-word maximum of the alignment.
pub const EXACT_WORD_SCORE: f64 = 1.2;
/// Cost of leaving one word unaligned on either side.
pub const SKIP_PENALTY: f64 = -0.1;
/// A word/phrase pairing must exceed this similarity to be aligned.
pub const PHRASE_MATCH_THRESHOLD: f64 = 0.5;
/// Extra words allowed beyond the shorter sequence when sizing a window.
pub const WINDOW_SLACK_WORDS: usize = 3;
/// Words added to every sliding window.
pub const WINDOW_EXTENSION_WORDS: usize = 5;
/// Value of the containment metric when one text contains the other.
pub const SUBSTRING_BONUS: f64 = 0.5;

/// Combination weights for the similarity metrics.
///
/// Fixed per backend instance. The defaults are empirical and should be
/// tuned against a labeled transcription-error corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub word_level: f64,
    pub trigram: f64,
    pub bigram: f64,
    pub fourgram: f64,
    pub character: f64,
    pub substring: f64,
}

impl SimilarityWeights {
    pub const DEFAULT: SimilarityWeights = SimilarityWeights {
        word_level: 0.50,
        trigram: 0.15,
        bigram: 0.15,
        fourgram: 0.10,
        character: 0.05,
        substring: 0.05,
    };

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.word_level + self.trigram + self.bigram + self.fourgram + self.character + self.substring
    }

    /// Check that every weight is finite and non-negative and that they sum to 1.
    pub fn validate(&self) -> anyhow::Result<()> {
        let all = [
            ("word_level", self.word_level),
            ("trigram", self.trigram),
            ("bigram", self.bigram),
            ("fourgram", self.fourgram),
            ("character", self.character),
            ("substring", self.substring),
        ];
        for (name, w) in all {
            if !w.is_finite() || w < 0.0 {
                anyhow::bail!("weight '{}' must be a non-negative number, got {}", name, w);
            }
        }
        if (self.total() - 1.0).abs() > 1e-6 {
            anyhow::bail!("weights must sum to 1.0, got {}", self.total());
        }
        Ok(())
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The individual metric values behind one combined score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimilarityBreakdown {
    pub word_level: f64,
    pub bigram: f64,
    pub trigram: f64,
    pub fourgram: f64,
    pub character: f64,
    pub substring: f64,
}

impl SimilarityBreakdown {
    /// Weighted sum of the metrics, clamped to `[0, 1]`.
    pub fn combine(&self, w: &SimilarityWeights) -> f64 {
        let score = self.word_level * w.word_level
            + self.trigram * w.trigram
            + self.bigram * w.bigram
            + self.fourgram * w.fourgram
            + self.character * w.character
            + self.substring * w.substring;
        score.clamp(0.0, 1.0)
    }
}

/// A strategy for scoring a query against candidate chunks.
///
/// Implementations must agree on [`combined_similarity`](SimilarityBackend::combined_similarity)
/// up to floating-point tolerance; they differ only in cost.
pub trait SimilarityBackend: Send + Sync {
    /// Short backend name for logs (`"reference"`, `"accelerated"`).
    fn name(&self) -> &'static str;

    /// The combination weights this backend was built with.
    fn weights(&self) -> &SimilarityWeights;

    /// Compute every metric for one query/candidate pair.
    fn breakdown(&self, query: &str, candidate: &str) -> SimilarityBreakdown;

    /// Combined similarity in `[0, 1]`.
    fn combined_similarity(&self, query: &str, candidate: &str) -> f64 {
        self.breakdown(query, candidate).combine(self.weights())
    }

    /// Score one query against many candidates, in candidate order.
    fn score_batch(&self, query: &str, candidates: &[&str]) -> Vec<f64> {
        candidates
            .iter()
            .map(|c| self.combined_similarity(query, c))
            .collect()
    }
}

/// Which backend the configuration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Reference,
    #[default]
    Accelerated,
}

/// The backend chosen at startup.
pub enum Backend {
    Reference(ReferenceBackend),
    #[cfg(feature = "accelerated")]
    Accelerated(AcceleratedBackend),
}

impl Backend {
    /// Build the requested backend, falling back to the reference backend
    /// when the accelerated one is not compiled in.
    pub fn select(kind: BackendKind, weights: SimilarityWeights) -> Self {
        match kind {
            BackendKind::Reference => Backend::Reference(ReferenceBackend::new(weights)),
            #[cfg(feature = "accelerated")]
            BackendKind::Accelerated => Backend::Accelerated(AcceleratedBackend::new(weights)),
            #[cfg(not(feature = "accelerated"))]
            BackendKind::Accelerated => {
                tracing::debug!("accelerated similarity backend not compiled in; using reference");
                Backend::Reference(ReferenceBackend::new(weights))
            }
        }
    }
}

impl SimilarityBackend for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Reference(b) => b.name(),
            #[cfg(feature = "accelerated")]
            Backend::Accelerated(b) => b.name(),
        }
    }

    fn weights(&self) -> &SimilarityWeights {
        match self {
            Backend::Reference(b) => b.weights(),
            #[cfg(feature = "accelerated")]
            Backend::Accelerated(b) => b.weights(),
        }
    }

    fn breakdown(&self, query: &str, candidate: &str) -> SimilarityBreakdown {
        match self {
            Backend::Reference(b) => b.breakdown(query, candidate),
            #[cfg(feature = "accelerated")]
            Backend::Accelerated(b) => b.breakdown(query, candidate),
        }
    }

    fn score_batch(&self, query: &str, candidates: &[&str]) -> Vec<f64> {
        match self {
            Backend::Reference(b) => b.score_batch(query, candidates),
            #[cfg(feature = "accelerated")]
            Backend::Accelerated(b) => b.score_batch(query, candidates),
        }
    }
}

/// Classic Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein_chars(&a, &b)
}

pub(crate) fn levenshtein_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized edit similarity `1 - distance / max_len` of lowercased text.
///
/// Two empty strings are identical (`1.0`).
pub fn char_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    char_similarity_chars(&a, &b)
}

pub(crate) fn char_similarity_chars(a: &[char], b: &[char]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_chars(a, b) as f64 / max_len as f64
}

/// [`SUBSTRING_BONUS`] when either normalized text contains the other.
pub fn substring_score(normalized_a: &str, normalized_b: &str) -> f64 {
    if normalized_a.contains(normalized_b) || normalized_b.contains(normalized_a) {
        SUBSTRING_BONUS
    } else {
        0.0
    }
}

/// Sliding windows over a sequence of `len` words, sized against a
/// sequence of `other_len` words.
///
/// Window size is `min(other_len + 3, len) + 5`. Nothing is yielded when
/// the window would cover the whole sequence.
pub(crate) fn sliding_windows(other_len: usize, len: usize) -> impl Iterator<Item = Range<usize>> {
    let size = (other_len + WINDOW_SLACK_WORDS).min(len) + WINDOW_EXTENSION_WORDS;
    let count = if size < len { len - size + 1 } else { 0 };
    (0..count).map(move |start| start..start + size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("ёж", "еж"), 1);
    }

    #[test]
    fn test_char_similarity() {
        assert_eq!(char_similarity("", ""), 1.0);
        assert_eq!(char_similarity("ABC", "abc"), 1.0);
        assert!((char_similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-12);
        assert_eq!(char_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_substring_score() {
        assert_eq!(substring_score("the quick brown fox", "quick brown"), SUBSTRING_BONUS);
        assert_eq!(substring_score("quick brown", "the quick brown fox"), SUBSTRING_BONUS);
        assert_eq!(substring_score("quick brown", "lazy dog"), 0.0);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((SimilarityWeights::DEFAULT.total() - 1.0).abs() < 1e-12);
        assert!(SimilarityWeights::DEFAULT.validate().is_ok());
    }

    #[test]
    fn test_weights_validation_rejects_bad_sets() {
        let mut w = SimilarityWeights::DEFAULT;
        w.word_level = 0.9;
        assert!(w.validate().is_err());

        let mut w = SimilarityWeights::DEFAULT;
        w.character = -0.05;
        w.word_level = 0.6;
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_breakdown_combine_clamped() {
        let b = SimilarityBreakdown {
            word_level: 1.0,
            bigram: 1.0,
            trigram: 1.0,
            fourgram: 1.0,
            character: 1.0,
            substring: SUBSTRING_BONUS,
        };
        let score = b.combine(&SimilarityWeights::DEFAULT);
        assert!((score - 0.975).abs() < 1e-12);
        assert_eq!(SimilarityBreakdown::default().combine(&SimilarityWeights::DEFAULT), 0.0);
    }

    #[test]
    fn test_sliding_windows() {
        // 4 query words against 20 candidate words: windows of 12.
        let windows: Vec<_> = sliding_windows(4, 20).collect();
        assert_eq!(windows.len(), 9);
        assert_eq!(windows[0], 0..12);
        assert_eq!(windows[8], 8..20);

        // Window would cover everything: no sliding.
        assert_eq!(sliding_windows(4, 10).count(), 0);
        assert_eq!(sliding_windows(0, 0).count(), 0);
    }

    #[test]
    fn test_backend_select_reference() {
        let backend = Backend::select(BackendKind::Reference, SimilarityWeights::DEFAULT);
        assert_eq!(backend.name(), "reference");
    }

    #[test]
    fn test_backend_select_accelerated_never_fails() {
        let backend = Backend::select(BackendKind::Accelerated, SimilarityWeights::DEFAULT);
        let expected = if cfg!(feature = "accelerated") {
            "accelerated"
        } else {
            "reference"
        };
        assert_eq!(backend.name(), expected);
        let score = backend.combined_similarity("the quick brown fox", "the quick brown fox");
        assert!(score > 0.95);
    }

    #[test]
    fn test_backend_kind_serde() {
        let kind: BackendKind = serde_json::from_str("\"reference\"").unwrap();
        assert_eq!(kind, BackendKind::Reference);
        assert_eq!(BackendKind::default(), BackendKind::Accelerated);
    }
}
