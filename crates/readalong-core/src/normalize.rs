//! Text canonicalization shared by indexing and querying.
//!
//! Transcripts arrive lowercased or not, with or without punctuation, and
//! with arbitrary spacing. Both sides of every comparison go through
//! [`normalize`] so that only the words themselves matter.
//!
//! # Example
//!
//! ```rust
//! use readalong_core::normalize::normalize;
//!
//! assert_eq!(normalize("Hello,   World!"), "hello world");
//! assert_eq!(normalize("Hello, World!"), normalize("hello world"));
//! ```

/// Canonicalize text for comparison.
///
/// Lowercases, replaces every non-word character with a space, collapses
/// runs of whitespace, and trims. Word characters are Unicode
/// alphanumerics and `_`. No stemming or locale rules are applied.
///
/// The function is idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if is_word_char(c) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Split already-normalized text into its words.
pub fn words(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Remove all whitespace from `text`.
pub(crate) fn strip_spaces(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
