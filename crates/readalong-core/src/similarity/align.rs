//! Word- and phrase-level matching primitives used by the alignment DP.

use crate::normalize::{normalize, strip_spaces};

use super::{
    char_similarity, EXACT_WORD_SCORE, MIN_CONTAINED_WORD_CHARS, WORD_MATCH_THRESHOLD,
};

/// Relaxed word equality: identical, at least [`WORD_MATCH_THRESHOLD`]
/// character similarity, or the shorter word (3+ chars) contained in the
/// longer one.
pub fn words_similar(a: &str, b: &str) -> bool {
    a == b || char_similarity(a, b) >= WORD_MATCH_THRESHOLD || contains_word(a, b)
}

fn contains_word(a: &str, b: &str) -> bool {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let (longer, shorter, shorter_len) = if a_len > b_len {
        (a, b, b_len)
    } else {
        (b, a, a_len)
    };
    shorter_len >= MIN_CONTAINED_WORD_CHARS && longer.contains(shorter)
}

/// Diagonal score for aligning word `a` with word `b`.
///
/// Identical words score [`EXACT_WORD_SCORE`]; other similar words score
/// their character similarity, floored at [`WORD_MATCH_THRESHOLD`].
/// Dissimilar words cannot be aligned directly (`None`).
pub fn word_match_score(a: &str, b: &str) -> Option<f64> {
    if a == b {
        return Some(EXACT_WORD_SCORE);
    }
    let similarity = char_similarity(a, b);
    if similarity >= WORD_MATCH_THRESHOLD || contains_word(a, b) {
        Some(similarity.max(WORD_MATCH_THRESHOLD))
    } else {
        None
    }
}

/// Similarity of a word to a short phrase, tolerant of the recognizer
/// splitting one word in two ("soberly" → "so really") or merging two.
///
/// Tries, in order: equal normalized text; the phrase with its spaces
/// removed; the word with its spaces removed against the phrase; raw
/// character similarity; and an anagram-style comparison of sorted
/// characters when the lengths are within two. Falls back to the raw
/// character similarity.
pub fn word_to_phrase_similarity(word: &str, phrase: &str) -> f64 {
    let word_norm = normalize(word);
    let phrase_norm = normalize(phrase);

    if word_norm == phrase_norm {
        return 1.0;
    }

    let phrase_joined = strip_spaces(&phrase_norm);
    let joined = char_similarity(&word_norm, &phrase_joined);
    if joined > 0.75 {
        return joined;
    }

    let word_joined = strip_spaces(&word_norm);
    let reverse = char_similarity(&word_joined, &phrase_norm);
    if reverse > 0.75 {
        return reverse;
    }

    let direct = char_similarity(&word_norm, &phrase_norm);
    if direct > 0.7 {
        return direct;
    }

    let mut word_chars: Vec<char> = word_joined.chars().collect();
    let mut phrase_chars: Vec<char> = phrase_joined.chars().collect();
    let length_gap = word_chars.len().abs_diff(phrase_chars.len());
    word_chars.sort_unstable();
    phrase_chars.sort_unstable();
    let sorted_word: String = word_chars.into_iter().collect();
    let sorted_phrase: String = phrase_chars.into_iter().collect();
    let anagram = char_similarity(&sorted_word, &sorted_phrase);
    if anagram > 0.8 && length_gap <= 2 {
        return anagram * 0.9;
    }

    direct
}
