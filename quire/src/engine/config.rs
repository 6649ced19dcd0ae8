//! # Engine Configuration
//!
//! Behaviour switches and tolerances for [`TypingEngine`](super::TypingEngine).
//! Every field has a default, so partial configuration files deserialize.
//!
//! ```rust
//! use quire::engine::{CompletionPolicy, EngineConfig};
//!
//! let config = EngineConfig::default()
//!     .with_auto_advance(false)
//!     .with_completion(CompletionPolicy::strict());
//!
//! assert!(config.ignore_symbols);
//! assert_eq!(config.completion.min_ratio, 1.0);
//! ```

use serde::{Deserialize, Serialize};

/// When a typed line counts as complete.
///
/// An input completes its line if, after whitespace normalization, it equals
/// the expected line or is at least as long. It also completes the line if it
/// reaches `min_ratio` of the expected length and contains the line's tail.
/// The tail is the last `max(tail_min_chars, tail_ratio * len)` characters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionPolicy {
    pub min_ratio: f64,
    pub tail_min_chars: usize,
    pub tail_ratio: f64,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            min_ratio: 0.95,
            tail_min_chars: 5,
            tail_ratio: 0.2,
        }
    }
}

impl CompletionPolicy {
    /// Only a full-length input completes a line.
    pub const fn strict() -> Self {
        Self {
            min_ratio: 1.0,
            tail_min_chars: 0,
            tail_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mistyped punctuation and other symbols are not counted as errors
    pub ignore_symbols: bool,
    /// Move to the next line as soon as a complete line is confirmed with a
    /// trailing space
    pub auto_advance: bool,
    pub completion: CompletionPolicy,
    /// Number of inter-keystroke intervals kept for the rhythm display
    pub rhythm_capacity: usize,
    /// Gaps at or above this many milliseconds are pauses, not rhythm
    pub rhythm_pause_ms: u64,
    /// Lower bound for the elapsed time used in speed calculations
    pub min_elapsed_minutes: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignore_symbols: true,
            auto_advance: true,
            completion: CompletionPolicy::default(),
            rhythm_capacity: 20,
            rhythm_pause_ms: 2000,
            min_elapsed_minutes: 0.01,
        }
    }
}

impl EngineConfig {
    pub const fn with_ignore_symbols(mut self, ignore_symbols: bool) -> Self {
        self.ignore_symbols = ignore_symbols;
        self
    }

    pub const fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    pub const fn with_completion(mut self, completion: CompletionPolicy) -> Self {
        self.completion = completion;
        self
    }
}
