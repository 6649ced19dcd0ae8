//! Character classes that matter for scoring.

/// Hangul syllables, jamo and compatibility jamo
const COMPOSED_RANGES: [(char, char); 3] = [
    ('\u{AC00}', '\u{D7AF}'),
    ('\u{1100}', '\u{11FF}'),
    ('\u{3130}', '\u{318F}'),
];

/// True for characters typed as a multi-key composition.
pub fn is_composed(c: char) -> bool {
    COMPOSED_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&c))
}

/// Keystrokes needed to type `c`.
pub fn keystroke_weight(c: char) -> usize {
    if is_composed(c) { 2 } else { 1 }
}

/// Keystrokes needed to type `text`.
pub fn count_keystrokes(text: &str) -> usize {
    text.chars().map(keystroke_weight).sum()
}

/// Punctuation and other non-word characters.
pub fn is_symbol(c: char) -> bool {
    !(c.is_alphanumeric() || c == '_' || c.is_whitespace())
}

/// Number of positions where `input` differs from `expected`.
///
/// Only positions present in both are compared; anything typed past the end of
/// `expected` belongs to the next line. With `ignore_symbols`, a position whose
/// expected character is a symbol never counts.
pub fn count_errors(input: &str, expected: &str, ignore_symbols: bool) -> usize {
    input
        .chars()
        .zip(expected.chars())
        .filter(|&(typed, want)| typed != want && !(ignore_symbols && is_symbol(want)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights() {
        assert_eq!(count_keystrokes("한글ab"), 6);
        assert_eq!(count_keystrokes("가나다ab"), 8);
        assert_eq!(keystroke_weight('ㄱ'), 2);
        assert_eq!(keystroke_weight('!'), 1);
    }

    #[test]
    fn symbols() {
        assert!(is_symbol(','));
        assert!(is_symbol('“'));
        assert!(!is_symbol('a'));
        assert!(!is_symbol('가'));
        assert!(!is_symbol('_'));
        assert!(!is_symbol(' '));
    }

    #[test]
    fn errors() {
        assert_eq!(count_errors("helXo", "hello", false), 1);
        assert_eq!(count_errors("hello!!", "hello", false), 0);
        assert_eq!(count_errors("hXllo!!", "hello", false), 1);
        assert_eq!(count_errors("hi.", "hi,", true), 0);
        assert_eq!(count_errors("hi.", "hi,", false), 1);
        assert_eq!(count_errors("", "hello", false), 0);
    }
}
