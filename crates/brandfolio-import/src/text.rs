//! Small string transforms shared by normalization and duplicate detection.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Uppercases the first character of every whitespace-separated word and
/// lowercases the rest. Whitespace runs are collapsed to single spaces.
#[must_use]
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercases the first character only; the rest of `s` is left untouched.
#[must_use]
pub fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Cuts `s` to at most `max_chars` characters, trimming any trailing
/// whitespace the cut exposes.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Deduplication identity for a store name.
///
/// Lowercased, diacritics removed, and everything that is not a letter or
/// digit (spaces, apostrophes, punctuation) dropped, so `"Ganni"`,
/// `"ganni "` and `"GANNI!"` share one key. A name with no letters or digits
/// keys on its trimmed, lowercased self, so `"!!!"` and `"???"` stay apart.
#[must_use]
pub fn name_key(name: &str) -> String {
    let key: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect();
    if key.is_empty() {
        name.trim().to_lowercase()
    } else {
        key
    }
}

/// Normalized Levenshtein similarity in `[0, 1]`, compared case-insensitively:
/// `1 - distance / max(len)`, with two empty strings scoring `1`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}
