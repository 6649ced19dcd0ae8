//! # Typing Engine - Line-by-line Matching State Machine
//!
//! [`TypingEngine`] compares what the user has typed so far against the
//! current line of a chapter and keeps score. It is fed the *whole* input
//! buffer on every change, either pushed with [`TypingEngine::input`] or polled
//! from an [`InputSource`] with [`TypingEngine::poll`].
//!
//! ## Key Features
//!
//! - **Differential accounting**: keystrokes, errors and corrections are
//!   derived from the difference between consecutive buffers
//! - **Composition aware**: while an IME composition is open, intermediate
//!   states are counted as keystrokes but never scored
//! - **Tolerant completion**: see [`CompletionPolicy`]
//! - **Carry-over**: text typed past the end of a line starts the next one
//!
//! ## Lifecycle
//!
#![doc = simple_mermaid::mermaid!("../../diagrams/engine_lifecycle.mmd")]
//!
//! ## Usage
//!
//! ```rust
//! use quire::engine::{ManualClock, Outcome, TypingEngine};
//!
//! let clock = ManualClock::new();
//! let lines = vec!["hello".to_string(), "world".to_string()];
//! let mut engine = TypingEngine::with_clock(lines, clock.clone());
//!
//! engine.input("hel");
//! clock.advance_millis(500);
//!
//! // A trailing space confirms a complete line
//! let outcome = engine.input("hello ");
//! assert!(matches!(outcome, Outcome::Advanced { from: 0, to: 1, .. }));
//! assert_eq!(engine.current_line(), 1);
//! assert_eq!(engine.stats().key_press_count, 6);
//! ```
//!
//! ## Hosts that do not clear their input
//!
//! After an advance the engine's buffer holds only the carried-over text. A
//! host that keeps sending its old field contents (because it has not cleared
//! the field yet) is detected: values starting with the text that triggered the
//! advance are rebased onto the carry. Repeating the confirming value is
//! therefore a no-op, and one logical action never advances twice.

mod clock;
mod completion;
mod config;
mod input;
mod rhythm;
mod script;
mod stats;

use strum::{Display, IntoStaticStr};
use tracing::{debug, trace};
use web_time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::is_line_complete;
pub use config::{CompletionPolicy, EngineConfig};
pub use input::InputSource;
pub use rhythm::Rhythm;
pub use script::{count_errors, count_keystrokes, is_composed, is_symbol, keystroke_weight};
pub use stats::{Counters, Minutes, TypingStats};

/// Where the session is in its lifecycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// What an event did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event had no effect
    Ignored,
    /// Input recorded while a composition is open; not evaluated yet
    Pending,
    /// Input recorded, the line is not complete
    Typing,
    /// The line is complete and waits for confirmation
    LineComplete,
    /// Moved forward; `carry` is the new input buffer
    Advanced {
        from: usize,
        to: usize,
        carry: String,
    },
    Retreated {
        from: usize,
        to: usize,
    },
    /// The last line was completed or skipped
    Finished,
}

/// Buffer a host may still be holding after an advance
#[derive(Debug, Clone)]
struct Stale {
    text: String,
    carry: String,
}

/// Typing session over a list of display lines.
///
/// An engine belongs to one chapter. Switching chapters means building a new
/// engine; nothing carries over.
///
/// An empty line list is allowed: every event is then ignored and
/// [`progress`](Self::progress) stays at 0.
#[derive(Debug, Clone)]
pub struct TypingEngine<C = SystemClock> {
    lines: Vec<String>,
    config: EngineConfig,
    clock: C,

    initial_line: usize,
    current_line: usize,
    status: Status,

    /// Input as last reported by the host
    buffer: String,
    /// Buffer at the last error evaluation
    evaluated: String,
    composing: bool,
    stale: Option<Stale>,

    counters: Counters,
    started_at: Option<Duration>,
    finished_at: Option<Duration>,
    last_keystroke: Option<Duration>,
    last_key: Option<char>,
    rhythm: Rhythm,
}

impl TypingEngine {
    /// Creates an engine timed by the system clock.
    pub fn new(lines: Vec<String>) -> Self {
        Self::with_clock(lines, SystemClock::new())
    }
}

impl<C: Clock> TypingEngine<C> {
    pub fn with_clock(lines: Vec<String>, clock: C) -> Self {
        let config = EngineConfig::default();
        let rhythm = Self::rhythm_for(&config);

        Self {
            lines,
            config,
            clock,
            initial_line: 0,
            current_line: 0,
            status: Status::NotStarted,
            buffer: String::new(),
            evaluated: String::new(),
            composing: false,
            stale: None,
            counters: Counters::default(),
            started_at: None,
            finished_at: None,
            last_keystroke: None,
            last_key: None,
            rhythm,
        }
    }

    fn rhythm_for(config: &EngineConfig) -> Rhythm {
        Rhythm::new(
            config.rhythm_capacity,
            Duration::from_millis(config.rhythm_pause_ms),
        )
    }

    /// Configure the engine (builder pattern)
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.rhythm = Self::rhythm_for(&config);
        self.config = config;
        self
    }

    /// Starts (and resets to) line `index` instead of the first line.
    ///
    /// Out-of-range indices are clamped to the last line.
    pub fn starting_at(mut self, index: usize) -> Self {
        let index = index.min(self.lines.len().saturating_sub(1));
        self.initial_line = index;
        self.current_line = index;
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index of the line being typed; equals the line count once completed.
    pub const fn current_line(&self) -> usize {
        self.current_line
    }

    pub fn current_line_text(&self) -> Option<&str> {
        self.lines.get(self.current_line).map(String::as_str)
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub const fn status(&self) -> Status {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    pub const fn is_composing(&self) -> bool {
        self.composing
    }

    pub const fn counters(&self) -> Counters {
        self.counters
    }

    pub const fn rhythm(&self) -> &Rhythm {
        &self.rhythm
    }

    /// Last character added to the input
    pub const fn last_key(&self) -> Option<char> {
        self.last_key
    }

    /// Share of lines passed, in percent.
    pub fn progress(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.current_line as f64 / self.lines.len() as f64 * 100.0
    }

    /// Time since the first keystroke, frozen once completed.
    pub fn elapsed(&self) -> Option<Duration> {
        let end = self.finished_at.unwrap_or_else(|| self.clock.now());
        self.started_at.map(|start| end.saturating_sub(start))
    }

    pub fn stats(&self) -> TypingStats {
        let minutes: Minutes = self
            .elapsed()
            .map_or(0.0, |elapsed| elapsed.as_secs_f64() / 60.0)
            .max(self.config.min_elapsed_minutes);
        TypingStats::calculate(self.counters, minutes)
    }

    /// True if the current input completes the current line.
    pub fn is_line_complete(&self) -> bool {
        self.current_line_text().is_some_and(|expected| {
            is_line_complete(&self.buffer, expected, &self.config.completion)
        })
    }

    fn is_active(&self) -> bool {
        !self.lines.is_empty() && self.status != Status::Completed
    }

    fn is_last_line(&self) -> bool {
        self.current_line + 1 >= self.lines.len()
    }

    /// Handles a change of the host's input buffer.
    ///
    /// `value` is the complete buffer, not just the last keystroke.
    pub fn input(&mut self, value: &str) -> Outcome {
        if !self.is_active() || !self.record(value) {
            return Outcome::Ignored;
        }
        if self.composing {
            return Outcome::Pending;
        }
        self.evaluate()
    }

    /// Reads `source`, handles its value, and writes the new buffer back after
    /// a line change.
    pub fn poll(&mut self, source: &mut impl InputSource) -> Outcome {
        let value = source.read().to_string();
        let outcome = self.input(&value);
        if matches!(outcome, Outcome::Advanced { .. } | Outcome::Finished) {
            self.sync(source);
        }
        outcome
    }

    /// Writes the engine's buffer to `source`.
    ///
    /// Call this after a line change the host triggered itself
    /// ([`confirm`](Self::confirm), [`skip`](Self::skip), ...) so the next
    /// poll starts from the carried-over text.
    pub fn sync(&mut self, source: &mut impl InputSource) {
        source.write(&self.buffer);
        self.stale = None;
    }

    pub fn composition_start(&mut self) {
        if self.is_active() {
            self.composing = true;
        }
    }

    /// Closes a composition and evaluates the final buffer, `value` if given.
    ///
    /// A composition that completes the line and ends with the confirming
    /// delimiter advances right away.
    pub fn composition_end(&mut self, value: Option<&str>) -> Outcome {
        self.composing = false;
        if !self.is_active() {
            return Outcome::Ignored;
        }
        if let Some(value) = value {
            self.record(value);
        }
        self.evaluate()
    }

    /// Advances if the current line is complete.
    pub fn confirm(&mut self) -> Outcome {
        if !self.is_active() || self.composing || !self.is_line_complete() {
            return Outcome::Ignored;
        }
        if self.is_last_line() {
            return self.finish();
        }
        self.advance_confirmed()
    }

    /// Advances regardless of what was typed.
    ///
    /// Text after the last space of the input carries over.
    pub fn skip(&mut self) -> Outcome {
        if !self.is_active() || self.composing {
            return Outcome::Ignored;
        }
        if self.is_last_line() {
            return self.finish();
        }

        let carry = carry_over(&self.buffer);
        self.stale = Some(Stale {
            text: self.buffer.clone(),
            carry: carry.clone(),
        });
        self.move_to(self.current_line + 1, carry)
    }

    /// Goes back one line, discarding the current input.
    pub fn previous(&mut self) -> Outcome {
        if self.lines.is_empty() || self.composing || self.current_line == 0 {
            return Outcome::Ignored;
        }

        let from = self.current_line;
        let to = from.min(self.lines.len()) - 1;
        self.reopen();
        self.current_line = to;
        self.clear_input();

        debug!(from, to, "moved to previous line");
        Outcome::Retreated { from, to }
    }

    /// Jumps to line `index`, discarding the current input.
    ///
    /// Returns `false` if there is no such line.
    pub fn set_current_line(&mut self, index: usize) -> bool {
        if index >= self.lines.len() {
            return false;
        }
        self.reopen();
        self.current_line = index;
        self.composing = false;
        self.clear_input();
        true
    }

    /// Clears all counters and input and returns to the initial line.
    pub fn reset(&mut self) {
        self.current_line = self.initial_line;
        self.status = Status::NotStarted;
        self.composing = false;
        self.clear_input();
        self.counters = Counters::default();
        self.started_at = None;
        self.finished_at = None;
        self.last_keystroke = None;
        self.last_key = None;
        self.rhythm.clear();
    }

    fn clear_input(&mut self) {
        self.buffer.clear();
        self.evaluated.clear();
        self.stale = None;
    }

    fn reopen(&mut self) {
        if self.status == Status::Completed {
            self.finished_at = None;
            self.status = if self.started_at.is_some() {
                Status::InProgress
            } else {
                Status::NotStarted
            };
        }
    }

    /// Rebases `value` onto the carry if it still contains pre-advance text.
    fn rebase(&mut self, value: &str) -> String {
        let Some(stale) = self.stale.take() else {
            return value.to_string();
        };

        match value.strip_prefix(stale.text.as_str()) {
            Some(rest) => {
                let rebased = format!("{}{rest}", stale.carry);
                self.stale = Some(stale);
                rebased
            }
            None => value.to_string(),
        }
    }

    /// Stores a new buffer and does the keystroke accounting.
    ///
    /// Returns `false` if the buffer did not change.
    fn record(&mut self, value: &str) -> bool {
        let value = self.rebase(value);
        if value == self.buffer {
            return false;
        }

        let now = self.clock.now();
        if self.started_at.is_none() && !value.is_empty() {
            self.started_at = Some(now);
            self.status = Status::InProgress;
        }

        let old_len = self.buffer.chars().count();
        let new_len = value.chars().count();

        if new_len > old_len {
            let added: usize = value.chars().skip(old_len).map(keystroke_weight).sum();
            self.counters.key_presses += added;

            if let Some(last) = self.last_keystroke {
                self.rhythm.record(now.saturating_sub(last));
            }
            self.last_keystroke = Some(now);
            self.last_key = value.chars().last();
        } else if new_len < old_len {
            self.counters.corrections += old_len - new_len;
        }

        trace!(buffer = %value, key_presses = self.counters.key_presses, "input");
        self.buffer = value;
        true
    }

    /// Scores the buffer against the current line and advances if confirmed.
    fn evaluate(&mut self) -> Outcome {
        let Some(expected) = self.lines.get(self.current_line) else {
            return Outcome::Ignored;
        };

        let ignore_symbols = self.config.ignore_symbols;
        let errors = count_errors(&self.buffer, expected, ignore_symbols);
        let previous = count_errors(&self.evaluated, expected, ignore_symbols);
        self.counters.errors += errors.saturating_sub(previous);
        self.evaluated.clone_from(&self.buffer);

        if !is_line_complete(&self.buffer, expected, &self.config.completion) {
            return Outcome::Typing;
        }
        if self.is_last_line() {
            return self.finish();
        }
        if self.config.auto_advance && confirms_line(&self.buffer, expected) {
            return self.advance_confirmed();
        }
        Outcome::LineComplete
    }

    /// Advances past a complete line, carrying over the overflow.
    fn advance_confirmed(&mut self) -> Outcome {
        let carry = carry_over(&self.buffer);
        self.stale = Some(Stale {
            text: self.buffer.clone(),
            carry: carry.clone(),
        });
        self.move_to(self.current_line + 1, carry)
    }

    fn move_to(&mut self, to: usize, carry: String) -> Outcome {
        let from = self.current_line;
        self.current_line = to;
        self.buffer.clone_from(&carry);
        self.evaluated.clear();

        debug!(from, to, carry = %carry, "advanced to next line");
        Outcome::Advanced { from, to, carry }
    }

    fn finish(&mut self) -> Outcome {
        self.current_line = self.lines.len();
        self.status = Status::Completed;
        self.finished_at = Some(self.clock.now());
        self.composing = false;
        self.clear_input();

        debug!(
            key_presses = self.counters.key_presses,
            errors = self.counters.errors,
            "session completed"
        );
        Outcome::Finished
    }
}

/// Text after the last whitespace delimiter, the start of the next line.
fn carry_over(input: &str) -> String {
    input
        .rfind(char::is_whitespace)
        .map(|index| input[index..].trim_start().to_string())
        .unwrap_or_default()
}

/// True if the input confirms the line with a delimiter: it ends in
/// whitespace, or has whitespace past the end of the expected text.
fn confirms_line(input: &str, expected: &str) -> bool {
    input.ends_with(char::is_whitespace)
        || input
            .chars()
            .skip(expected.chars().count())
            .any(char::is_whitespace)
}
