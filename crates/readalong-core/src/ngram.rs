//! Word n-gram generation and the inverted n-gram / word tables of a book.
//!
//! An n-gram here is `n` consecutive whitespace-separated words joined by
//! a single space. Tables map each n-gram (and each word) to the sorted,
//! de-duplicated chunk indices that contain it. The locator unions the
//! query's 2- and 3-gram hits to shortlist candidate chunks.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// N-gram orders stored in a [`NGramTable`].
pub const INDEXED_NGRAM_SIZES: [usize; 3] = [2, 3, 4];

/// Generate the set of word n-grams of already-normalized text.
///
/// Text with fewer than `n` words (or `n == 0`) yields an empty set.
///
/// ```rust
/// use readalong_core::ngram::generate_ngrams;
///
/// let grams = generate_ngrams("the quick brown fox", 3);
/// assert_eq!(grams.len(), 2);
/// assert!(grams.contains("quick brown fox"));
/// ```
pub fn generate_ngrams(normalized: &str, n: usize) -> HashSet<String> {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    word_ngrams(&words, n).collect()
}

/// Iterate the n-grams of a word slice, in order, duplicates included.
pub(crate) fn word_ngrams<'a>(
    words: &'a [&'a str],
    n: usize,
) -> impl Iterator<Item = String> + 'a {
    let count = if n == 0 || words.len() < n {
        0
    } else {
        words.len() - n + 1
    };
    (0..count).map(move |i| words[i..i + n].join(" "))
}

/// Jaccard similarity (`|A ∩ B| / |A ∪ B|`) of two n-gram sets.
///
/// Two empty sets have similarity `0.0`: there is no evidence either way.
pub fn jaccard<T: Eq + std::hash::Hash, S: std::hash::BuildHasher>(
    a: &HashSet<T, S>,
    b: &HashSet<T, S>,
) -> f64 {
    let intersection = a.iter().filter(|g| b.contains(*g)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Inverted n-gram and word tables over a book's normalized chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NGramTable {
    /// `n → (ngram → chunk indices)` for each `n` in [`INDEXED_NGRAM_SIZES`].
    pub ngrams: BTreeMap<usize, HashMap<String, Vec<usize>>>,
    /// `word → chunk indices`.
    pub word_positions: HashMap<String, Vec<usize>>,
}

impl NGramTable {
    /// Build the tables from normalized chunks, indexed by position.
    pub fn build<S: AsRef<str>>(normalized_chunks: &[S]) -> Self {
        let mut ngrams: BTreeMap<usize, HashMap<String, BTreeSet<usize>>> = BTreeMap::new();
        let mut words_inv: HashMap<String, BTreeSet<usize>> = HashMap::new();

        for (index, chunk) in normalized_chunks.iter().enumerate() {
            let words: Vec<&str> = chunk.as_ref().split_whitespace().collect();

            for &n in &INDEXED_NGRAM_SIZES {
                let table = ngrams.entry(n).or_default();
                for gram in word_ngrams(&words, n) {
                    table.entry(gram).or_default().insert(index);
                }
            }

            for word in &words {
                words_inv.entry((*word).to_string()).or_default().insert(index);
            }
        }

        Self {
            ngrams: ngrams
                .into_iter()
                .map(|(n, table)| (n, flatten(table)))
                .collect(),
            word_positions: flatten(words_inv),
        }
    }

    /// Chunk indices containing `gram`, an n-gram of order `n`.
    ///
    /// Only the orders in [`INDEXED_NGRAM_SIZES`] are stored; asking for
    /// any other order is a caller bug.
    pub fn lookup(&self, n: usize, gram: &str) -> &[usize] {
        debug_assert!(
            INDEXED_NGRAM_SIZES.contains(&n),
            "n-gram order {} is not indexed",
            n
        );
        self.ngrams
            .get(&n)
            .and_then(|table| table.get(gram))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Chunk indices containing `word`.
    pub fn word_chunks(&self, word: &str) -> &[usize] {
        self.word_positions
            .get(word)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when no n-gram of any order is stored.
    pub fn is_empty(&self) -> bool {
        self.ngrams.values().all(HashMap::is_empty)
    }

    /// Largest chunk index referenced anywhere in the tables.
    pub fn max_referenced_index(&self) -> Option<usize> {
        self.ngrams
            .values()
            .flat_map(|table| table.values())
            .chain(self.word_positions.values())
            .filter_map(|indices| indices.iter().copied().max())
            .max()
    }
}

fn flatten(table: HashMap<String, BTreeSet<usize>>) -> HashMap<String, Vec<usize>> {
    table
        .into_iter()
        .map(|(key, set)| (key, set.into_iter().collect()))
        .collect()
}
