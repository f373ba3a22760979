//! Unicode clean-up for recognized token text.
//! Composes decomposed sequences (и + ◌̆ → й) and drops invisible format
//! characters. Recognized characters themselves are never changed.

use unicode_normalization::UnicodeNormalization;

const INVISIBLE: &[char] = &[
    '\u{00AD}', // soft hyphen
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
];

pub fn normalize_text(text: &str) -> String {
    text.nfc()
        .filter(|c| !INVISIBLE.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
