use serde::{Deserialize, Serialize};

/// Elapsed time in minutes
pub type Minutes = f64;

/// Raw keystroke accounting for a session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    /// Weighted keystrokes, see [`keystroke_weight`](super::keystroke_weight)
    pub key_presses: usize,
    pub errors: usize,
    /// Characters removed from the input
    pub corrections: usize,
}

/// Speed and accuracy derived from [`Counters`].
///
/// All rates are rounded and never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStats {
    pub cpm: u32,
    pub wpm: u32,
    pub net_cpm: u32,
    pub net_wpm: u32,
    /// Percentage of keystrokes that were not errors
    pub accuracy: u32,
    pub key_press_count: usize,
    pub error_count: usize,
    pub correction_count: usize,
}

impl Default for TypingStats {
    fn default() -> Self {
        Self {
            cpm: 0,
            wpm: 0,
            net_cpm: 0,
            net_wpm: 0,
            accuracy: 100,
            key_press_count: 0,
            error_count: 0,
            correction_count: 0,
        }
    }
}

fn rounded(value: f64) -> u32 {
    // Saturating float to int cast
    value.round().max(0.0) as u32
}

impl TypingStats {
    /// Derives rates from `counters` over `minutes` of typing.
    pub fn calculate(counters: Counters, minutes: Minutes) -> Self {
        let key_presses = counters.key_presses as f64;
        let net = key_presses - counters.errors as f64;

        let cpm = key_presses / minutes;
        let net_cpm = net / minutes;
        let accuracy = if counters.key_presses == 0 {
            100.0
        } else {
            net / key_presses * 100.0
        };

        Self {
            cpm: rounded(cpm),
            wpm: rounded(cpm / 2.0),
            net_cpm: rounded(net_cpm),
            net_wpm: rounded(net_cpm / 2.0),
            accuracy: rounded(accuracy),
            key_press_count: counters.key_presses,
            error_count: counters.errors,
            correction_count: counters.corrections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates() {
        let counters = Counters {
            key_presses: 300,
            errors: 30,
            corrections: 4,
        };
        let stats = TypingStats::calculate(counters, 1.0);

        assert_eq!(stats.cpm, 300);
        assert_eq!(stats.wpm, 150);
        assert_eq!(stats.net_cpm, 270);
        assert_eq!(stats.net_wpm, 135);
        assert_eq!(stats.accuracy, 90);
        assert_eq!(stats.correction_count, 4);
    }

    #[test]
    fn never_negative() {
        let counters = Counters {
            key_presses: 2,
            errors: 5,
            corrections: 0,
        };
        let stats = TypingStats::calculate(counters, 0.5);
        assert_eq!(stats.net_cpm, 0);
        assert_eq!(stats.accuracy, 0);
    }

    #[test]
    fn untouched_session() {
        let stats = TypingStats::calculate(Counters::default(), 0.01);
        assert_eq!(stats, TypingStats::default());
    }
}
