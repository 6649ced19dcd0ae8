//! # Table of contents extraction
//!
//! Walks the text line by line and turns every detected heading into a
//! [`ChapterNode`]. Nesting is tracked with one open list per level: a deeper
//! heading opens new levels, a shallower one closes them by attaching the
//! closed list to the last chapter of the level above.

use tracing::debug;

use crate::{ChapterNode, clean_title, detect_heading_level};

/// Open chapter lists, `levels[n]` holds the chapters of level `n + 1`
#[derive(Debug, Default)]
struct LevelStack {
    levels: Vec<Vec<ChapterNode>>,
}

impl LevelStack {
    fn push(&mut self, node: ChapterNode) {
        let depth = node.level;
        self.close_to(depth);
        while self.levels.len() < depth {
            self.levels.push(Vec::new());
        }
        self.levels[depth - 1].push(node);
    }

    /// Closes every level deeper than `depth`.
    ///
    /// A closed list becomes the children of the last open chapter one level
    /// up. If that level has no chapter yet (the text skipped a level), the
    /// nodes are hoisted into it instead so nothing is lost.
    fn close_to(&mut self, depth: usize) {
        while self.levels.len() > depth.max(1) {
            let Some(closed) = self.levels.pop() else {
                break;
            };
            if closed.is_empty() {
                continue;
            }
            let Some(parent_level) = self.levels.last_mut() else {
                break;
            };
            match parent_level.last_mut() {
                Some(parent) => parent.children.extend(closed),
                None => parent_level.extend(closed),
            }
        }
    }

    fn finish(mut self) -> Vec<ChapterNode> {
        self.close_to(1);
        self.levels.pop().unwrap_or_default()
    }
}

/// Builds a chapter forest from the headings detected in `text`.
///
/// Every chapter's `position` is the character offset of its heading line.
pub fn extract_table_of_contents(text: &str) -> Vec<ChapterNode> {
    let mut stack = LevelStack::default();
    let mut offset = 0;
    let mut found = 0;

    for line in text.split('\n') {
        let line_start = offset;
        offset += line.chars().count() + 1;

        if line.trim().is_empty() {
            continue;
        }

        let level = detect_heading_level(line);
        if level == 0 {
            continue;
        }

        let mut title = clean_title(line, level);
        if title.is_empty() {
            title = line.trim().to_string();
        }

        stack.push(ChapterNode::new(title, level, line_start));
        found += 1;
    }

    debug!(headings = found, "extracted table of contents");
    stack.finish()
}
