//! Wrapping chapter content into display lines for typing.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::normalize_text;

/// Breaks content into lines that fit a width budget.
pub trait LineLayout {
    fn wrap(&self, content: &str, width: usize) -> Vec<String>;
}

/// Greedy word wrapper measuring terminal display columns.
///
/// Every source line is a paragraph. Blank lines are dropped and whitespace
/// inside a paragraph collapses to single spaces. Words wider than the budget
/// are split across lines unless `break_words` is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub break_words: bool,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self { break_words: true }
    }
}

impl ColumnLayout {
    pub const fn with_word_breaking(mut self, break_words: bool) -> Self {
        self.break_words = break_words;
        self
    }

    fn wrap_paragraph(&self, paragraph: &str, width: usize, out: &mut Vec<String>) {
        let mut line = String::new();
        let mut line_width = 0;

        for word in paragraph.split(' ') {
            let word_width = word.width();

            if line_width > 0 && line_width + 1 + word_width > width {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }

            if word_width > width && self.break_words {
                for c in word.chars() {
                    let char_width = c.width().unwrap_or(0);
                    if line_width > 0 && line_width + char_width > width {
                        out.push(std::mem::take(&mut line));
                        line_width = 0;
                    }
                    line.push(c);
                    line_width += char_width;
                }
                continue;
            }

            if line_width > 0 {
                line.push(' ');
                line_width += 1;
            }
            line.push_str(word);
            line_width += word_width;
        }

        if !line.is_empty() {
            out.push(line);
        }
    }
}

impl LineLayout for ColumnLayout {
    fn wrap(&self, content: &str, width: usize) -> Vec<String> {
        let width = width.max(1);
        let mut lines = Vec::new();

        for paragraph in content.lines() {
            let paragraph = normalize_text(paragraph);
            if paragraph.is_empty() {
                continue;
            }
            self.wrap_paragraph(&paragraph, width, &mut lines);
        }

        lines
    }
}
