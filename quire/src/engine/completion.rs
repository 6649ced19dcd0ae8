use crate::normalize_text;

use super::CompletionPolicy;

/// Checks whether `input` completes the `expected` line under `policy`.
///
/// A line with nothing to type is always complete.
pub fn is_line_complete(input: &str, expected: &str, policy: &CompletionPolicy) -> bool {
    let expected = normalize_text(expected);
    let input = normalize_text(input);

    if expected.is_empty() || input == expected {
        return true;
    }

    let expected_len = expected.chars().count();
    let input_len = input.chars().count();

    if input_len >= expected_len {
        return true;
    }

    if (input_len as f64) < expected_len as f64 * policy.min_ratio {
        return false;
    }

    let tail_len = policy
        .tail_min_chars
        .max((expected_len as f64 * policy.tail_ratio).floor() as usize)
        .min(expected_len);
    let tail: String = expected.chars().skip(expected_len - tail_len).collect();

    input.contains(&tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "abcdefghijklmnopqrst";

    #[test]
    fn exact_and_normalized() {
        let policy = CompletionPolicy::default();
        assert!(is_line_complete("hello  world ", "hello world", &policy));
        assert!(is_line_complete("", "   ", &policy));
        assert!(!is_line_complete("hello", "hello world", &policy));
    }

    #[test]
    fn near_complete_with_matching_tail() {
        let policy = CompletionPolicy::default();
        // 19 of 20 characters, one typo early on, tail intact
        assert!(is_line_complete("abdefghijklmnopqrst", LINE, &policy));
        // Same length but the tail is wrong
        assert!(!is_line_complete("abcdefghijklmnopqrX", LINE, &policy));
        // Perfect prefix, far too short
        assert!(!is_line_complete("abcdefghij", LINE, &policy));
    }

    #[test]
    fn length_alone_completes() {
        let policy = CompletionPolicy::default();
        assert!(is_line_complete("xxxxxxxxxxxxxxxxxxxx", LINE, &policy));
    }

    #[test]
    fn strict_policy() {
        assert!(!is_line_complete("abdefghijklmnopqrst", LINE, &CompletionPolicy::strict()));
    }
}
