//! # Chapter splitting
//!
//! Assigns every chapter the lines of text it owns: from the line holding its
//! position up to the line before the next chapter (in position order) starts.

use tracing::{debug, warn};

use crate::{
    ChapterNode, DEFAULT_FULL_TEXT_LABEL, DEFAULT_NO_CONTENT_LABEL, LineIndex, flatten_chapters,
    map_chapters,
};

/// Line range and text computed for one chapter
#[derive(Debug, Clone)]
struct Span {
    start_line: usize,
    end_line: usize,
    content: String,
}

/// Splits text into chapter contents.
///
/// The labels are supplied by the host so they can be localized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSplitter {
    fallback_title: String,
    placeholder: String,
}

impl Default for ChapterSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_FULL_TEXT_LABEL)
    }
}

impl ChapterSplitter {
    pub fn new(fallback_title: impl Into<String>) -> Self {
        Self {
            fallback_title: fallback_title.into(),
            placeholder: DEFAULT_NO_CONTENT_LABEL.to_string(),
        }
    }

    /// Sets the text used when a chapter has nothing else to show.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn fallback_title(&self) -> &str {
        &self.fallback_title
    }

    /// A single chapter holding the whole text.
    pub fn fallback_chapter(&self, text: &str) -> ChapterNode {
        let index = LineIndex::new(text);
        let mut chapter = ChapterNode::new(self.fallback_title.as_str(), 1, 0);
        chapter.content = Some(text.to_string());
        chapter.start_line = Some(0);
        chapter.end_line = Some(index.line_count().saturating_sub(1));
        chapter
    }

    /// Returns a copy of `chapters` with `content`, `start_line` and
    /// `end_line` filled in.
    ///
    /// Without chapters, the result is the single [fallback
    /// chapter](Self::fallback_chapter).
    pub fn split(&self, text: &str, chapters: &[ChapterNode]) -> Vec<ChapterNode> {
        if chapters.is_empty() {
            debug!("no chapters, using the whole text");
            return vec![self.fallback_chapter(text)];
        }

        let index = LineIndex::new(text);
        let spans = self.spans(&index, chapters);

        let split = map_chapters(chapters, |i, mut chapter| {
            if let Some(span) = spans.get(i) {
                chapter.start_line = Some(span.start_line);
                chapter.end_line = Some(span.end_line);
                chapter.content = Some(span.content.clone());
            }
            chapter
        });

        if split.is_empty() {
            return vec![self.fallback_chapter(text)];
        }
        split
    }

    /// Computes the span of every chapter, indexed in pre-order.
    fn spans(&self, index: &LineIndex, chapters: &[ChapterNode]) -> Vec<Span> {
        let last_offset = index.char_len().saturating_sub(1);
        let last_line = index.line_count().saturating_sub(1);

        let flat = flatten_chapters(chapters);
        let mut order: Vec<(usize, usize)> = flat
            .iter()
            .enumerate()
            .map(|(i, chapter)| (i, index.line_containing(chapter.position.min(last_offset))))
            .collect();
        // Stable, so chapters on the same line keep their tree order
        order.sort_by_key(|&(_, line)| line);

        let mut spans = vec![
            Span {
                start_line: 0,
                end_line: 0,
                content: String::new(),
            };
            flat.len()
        ];

        for (rank, &(i, line)) in order.iter().enumerate() {
            let start_line = if rank == 0 && has_preamble(index, line) {
                0
            } else {
                line
            };

            let end_line = match order.get(rank + 1) {
                Some(&(_, next)) if next > start_line => next - 1,
                Some(_) => start_line,
                None => last_line,
            };

            let mut content = index.join(start_line, end_line);
            if content.trim().is_empty() {
                content = self.fallback_content(index, start_line);
                warn!(
                    title = %flat[i].title,
                    start_line,
                    "chapter has no content, using fallback"
                );
            }

            spans[i] = Span {
                start_line,
                end_line,
                content,
            };
        }

        spans
    }

    fn fallback_content(&self, index: &LineIndex, start_line: usize) -> String {
        [index.line(start_line), index.line(0)]
            .into_iter()
            .flatten()
            .find(|line| !line.trim().is_empty())
            .unwrap_or(self.placeholder.as_str())
            .to_string()
    }
}

/// True if anything but blank lines comes before `first_line`.
fn has_preamble(index: &LineIndex, first_line: usize) -> bool {
    index.lines()[..first_line]
        .iter()
        .any(|line| !line.trim().is_empty())
}

/// Splits `text` into chapter contents with the default placeholder.
///
/// See [`ChapterSplitter::split`].
pub fn split_text_by_chapters(
    text: &str,
    chapters: &[ChapterNode],
    fallback_title: &str,
) -> Vec<ChapterNode> {
    ChapterSplitter::new(fallback_title).split(text, chapters)
}
