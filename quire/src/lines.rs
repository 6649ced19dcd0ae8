/// Line table over a text, measured in characters.
///
/// Lines are split on `\n` only; each line start advances by its length plus
/// one for the newline.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
    starts: Vec<usize>,
    char_len: usize,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut starts = Vec::with_capacity(lines.len());
        let mut offset = 0;

        for line in &lines {
            starts.push(offset);
            offset += line.chars().count() + 1;
        }

        Self {
            lines,
            starts,
            // The last line has no trailing newline
            char_len: offset.saturating_sub(1),
        }
    }

    /// Length of the text in characters
    pub const fn char_len(&self) -> usize {
        self.char_len
    }

    pub const fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Character offset at which line `index` begins.
    pub fn start(&self, index: usize) -> usize {
        self.starts
            .get(index)
            .copied()
            .unwrap_or(self.char_len)
    }

    /// Index of the line containing the character at `offset`.
    pub fn line_containing(&self, offset: usize) -> usize {
        self.starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Line start closest to `offset`, restricted to `lower..=upper`.
    ///
    /// Falls back to `lower` when no line starts inside the range.
    pub fn nearest_start_within(&self, offset: usize, lower: usize, upper: usize) -> usize {
        let first = self.starts.partition_point(|&start| start < lower);
        let last = self.starts.partition_point(|&start| start <= upper);

        self.starts[first..last]
            .iter()
            .copied()
            .min_by_key(|&start| start.abs_diff(offset))
            .unwrap_or(lower)
    }

    /// Joins lines `first..=last` back together with their line breaks.
    pub fn join(&self, first: usize, last: usize) -> String {
        let last = last.min(self.lines.len().saturating_sub(1));
        if first > last {
            return String::new();
        }
        self.lines[first..=last].join("\n")
    }
}

/// Collapses every whitespace run into a single space and trims the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
