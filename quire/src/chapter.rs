//! Chapter tree model and persistent tree helpers.
//!
//! Every pipeline stage takes a borrowed forest and returns a fresh one. The
//! helpers here walk the forest in depth-first pre-order, which is also the
//! order used to re-thread computed fields back into the hierarchy.

use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, IntoStaticStr};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque chapter identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct ChapterId(String);

impl ChapterId {
    /// Generates an identifier unique within this process.
    pub fn generate() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("ch-{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChapterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a chapter's `position` was obtained.
///
/// Anything other than [`PositionConfidence::Exact`] is an approximation the
/// host may want to surface (e.g. offer to recalculate the table of contents).
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PositionConfidence {
    /// Detected heading line, or the title was found verbatim in the text
    #[default]
    Exact,
    /// The title was matched by word overlap
    Fuzzy,
    /// Taken from a decoder-supplied character offset
    Hinted,
    /// Spread evenly between neighbouring chapters
    Interpolated,
    /// Was out of range and got clamped into the text
    Clamped,
}

impl PositionConfidence {
    pub const fn is_approximate(self) -> bool {
        !matches!(self, Self::Exact)
    }
}

/// One entry of the table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterNode {
    pub id: ChapterId,
    /// Heading text with structural markers stripped
    pub title: String,
    /// Nesting depth, 1 is top level
    pub level: usize,
    /// Character offset of the chapter heading in the full text
    pub position: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChapterNode>,
    /// Text belonging to this chapter, filled in by the splitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    /// Set by the practice session once the chapter has been typed
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub confidence: PositionConfidence,
}

impl ChapterNode {
    pub fn new(title: impl Into<String>, level: usize, position: usize) -> Self {
        Self {
            id: ChapterId::generate(),
            title: title.into(),
            level: level.max(1),
            position,
            children: Vec::new(),
            content: None,
            start_line: None,
            end_line: None,
            completed: false,
            confidence: PositionConfidence::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ChapterId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    pub const fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True if the chapter has content worth typing.
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|content| !content.trim().is_empty())
    }

    /// A copy of the node without its children.
    pub(crate) fn shallow(&self) -> Self {
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            level: self.level,
            position: self.position,
            children: Vec::new(),
            content: self.content.clone(),
            start_line: self.start_line,
            end_line: self.end_line,
            completed: self.completed,
            confidence: self.confidence,
        }
    }
}

/// Flattens the forest depth-first, parents before their children.
pub fn flatten_chapters(chapters: &[ChapterNode]) -> Vec<&ChapterNode> {
    fn walk<'a>(items: &'a [ChapterNode], out: &mut Vec<&'a ChapterNode>) {
        for item in items {
            out.push(item);
            walk(&item.children, out);
        }
    }

    let mut out = Vec::new();
    walk(chapters, &mut out);
    out
}

/// Number of nodes in the forest.
pub fn count_chapters(chapters: &[ChapterNode]) -> usize {
    chapters
        .iter()
        .map(|chapter| 1 + count_chapters(&chapter.children))
        .sum()
}

/// Builds a new forest with the same shape as `chapters`.
///
/// `update` receives each node's pre-order index and a childless copy of the
/// node, and returns the replacement. Children are rebuilt recursively, so the
/// closure never has to deal with the hierarchy.
pub fn map_chapters<F>(chapters: &[ChapterNode], mut update: F) -> Vec<ChapterNode>
where
    F: FnMut(usize, ChapterNode) -> ChapterNode,
{
    fn walk<F>(items: &[ChapterNode], index: &mut usize, update: &mut F) -> Vec<ChapterNode>
    where
        F: FnMut(usize, ChapterNode) -> ChapterNode,
    {
        items
            .iter()
            .map(|item| {
                let mut node = update(*index, item.shallow());
                *index += 1;
                node.children = walk(&item.children, index, update);
                node
            })
            .collect()
    }

    let mut index = 0;
    walk(chapters, &mut index, &mut update)
}

/// True if any chapter position is an approximation.
pub fn needs_review(chapters: &[ChapterNode]) -> bool {
    flatten_chapters(chapters)
        .iter()
        .any(|chapter| chapter.confidence.is_approximate())
}

/// Finds a chapter anywhere in the forest.
pub fn find_chapter<'a>(chapters: &'a [ChapterNode], id: &ChapterId) -> Option<&'a ChapterNode> {
    flatten_chapters(chapters)
        .into_iter()
        .find(|chapter| &chapter.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ChapterNode> {
        vec![
            ChapterNode::new("A", 1, 0).with_id("a").with_children(vec![
                ChapterNode::new("A.1", 2, 10).with_id("a1"),
                ChapterNode::new("A.2", 2, 20).with_id("a2"),
            ]),
            ChapterNode::new("B", 1, 30).with_id("b"),
        ]
    }

    #[test]
    fn flatten_is_preorder() {
        let chapters = sample();
        let titles: Vec<&str> = flatten_chapters(&chapters)
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, ["A", "A.1", "A.2", "B"]);
        assert_eq!(count_chapters(&chapters), 4);
    }

    #[test]
    fn map_keeps_shape_and_input() {
        let chapters = sample();
        let mapped = map_chapters(&chapters, |index, mut node| {
            node.position = index;
            node
        });

        assert_eq!(mapped[0].children.len(), 2);
        assert_eq!(mapped[0].children[1].position, 2);
        assert_eq!(mapped[1].position, 3);
        // The input tree is untouched
        assert_eq!(chapters[1].position, 30);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ChapterId::generate(), ChapterId::generate());
    }

    #[test]
    fn review_flag_follows_confidence() {
        let mut chapters = sample();
        assert!(!needs_review(&chapters));
        chapters[0].children[0].confidence = PositionConfidence::Fuzzy;
        assert!(needs_review(&chapters));
        assert_eq!(
            find_chapter(&chapters, &ChapterId::from("a1")).map(|c| c.confidence),
            Some(PositionConfidence::Fuzzy)
        );
    }
}
