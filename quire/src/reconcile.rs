//! # Position reconciliation
//!
//! Brings chapter positions in line with the text they index into.
//!
//! - [`recalculate_chapter_positions`] re-finds each title in the text
//! - [`validate_and_fix_chapter_positions`] additionally clamps every position
//!   into the text
//! - [`reconcile_outline`] converts a decoder-supplied outline, whose position
//!   hints are in arbitrary units, into a validated chapter forest
//!
//! Matching prefers an exact (substring) title match, then the best word
//! overlap score, then a trusted offset hint, and finally interpolates between
//! positioned neighbours.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    ChapterId, ChapterNode, LineIndex, PositionConfidence, PositionHint, RawOutlineNode,
    map_chapters,
};

/// Tunables for fuzzy title matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Minimum fraction of significant title words a line must contain
    /// (exclusive)
    pub fuzzy_threshold: f64,
    /// Title words shorter than this are ignored when scoring
    pub min_word_len: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.5,
            min_word_len: 4,
        }
    }
}

impl ReconcileConfig {
    pub const fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub const fn with_min_word_len(mut self, len: usize) -> Self {
        self.min_word_len = len;
        self
    }
}

/// Index of the first line that equals or contains `title`.
fn find_exact(index: &LineIndex, title: &str) -> Option<usize> {
    if title.is_empty() {
        return None;
    }
    index
        .lines()
        .iter()
        .position(|line| line.trim().contains(title))
}

/// Line with the best word overlap score above the threshold.
///
/// Ties resolve to the earliest line.
fn find_fuzzy(index: &LineIndex, title: &str, config: &ReconcileConfig) -> Option<(usize, f64)> {
    let title = title.to_lowercase();
    let words: Vec<&str> = title
        .split_whitespace()
        .filter(|word| word.chars().count() >= config.min_word_len)
        .collect();

    if words.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (line_index, line) in index.lines().iter().enumerate() {
        let line = line.trim().to_lowercase();
        let matches = words.iter().filter(|word| line.contains(**word)).count();
        let score = matches as f64 / words.len() as f64;

        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((line_index, score));
        }
    }

    best.filter(|(_, score)| *score > config.fuzzy_threshold)
}

/// Re-finds every chapter title in `text`.
///
/// Each chapter whose trimmed title equals or is contained in a line moves to
/// the start of the first such line. Chapters without a match keep their
/// position. The input forest is not modified.
pub fn recalculate_chapter_positions(chapters: &[ChapterNode], text: &str) -> Vec<ChapterNode> {
    if chapters.is_empty() || text.is_empty() {
        return chapters.to_vec();
    }

    let index = LineIndex::new(text);
    map_chapters(chapters, |_, mut chapter| {
        if let Some(line) = find_exact(&index, chapter.title.trim()) {
            chapter.position = index.start(line);
            chapter.confidence = PositionConfidence::Exact;
            debug!(title = %chapter.title, line, position = chapter.position, "matched chapter title");
        }
        chapter
    })
}

/// Recalculates positions, then clamps every position into the text.
///
/// For non-empty `text` every chapter of the result satisfies
/// `position < text.chars().count()`.
pub fn validate_and_fix_chapter_positions(
    chapters: &[ChapterNode],
    text: &str,
) -> Vec<ChapterNode> {
    let recalculated = recalculate_chapter_positions(chapters, text);
    let len = text.chars().count();
    if len == 0 {
        return recalculated;
    }

    map_chapters(&recalculated, |_, chapter| clamp_position(chapter, len))
}

fn clamp_position(mut chapter: ChapterNode, len: usize) -> ChapterNode {
    if len > 0 && chapter.position >= len {
        warn!(
            title = %chapter.title,
            position = chapter.position,
            len,
            "chapter position out of range, clamping"
        );
        chapter.position = len - 1;
        chapter.confidence = PositionConfidence::Clamped;
    }
    chapter
}

/// Outline node on its way to becoming a [`ChapterNode`]
struct Draft<'a> {
    raw: &'a RawOutlineNode,
    resolved: Option<(usize, PositionConfidence)>,
    children: Vec<Draft<'a>>,
}

impl<'a> Draft<'a> {
    fn matched(
        raw: &'a RawOutlineNode,
        index: &LineIndex,
        config: &ReconcileConfig,
    ) -> Self {
        let title = raw.title.trim();
        let resolved = if let Some(line) = find_exact(index, title) {
            debug!(title, line, "outline title matched exactly");
            Some((index.start(line), PositionConfidence::Exact))
        } else if let Some((line, score)) = find_fuzzy(index, title, config) {
            warn!(title, line, score, "outline title matched approximately");
            Some((index.start(line), PositionConfidence::Fuzzy))
        } else {
            match raw.hint {
                PositionHint::Offset(offset) if offset < index.char_len() => {
                    Some((offset, PositionConfidence::Hinted))
                }
                _ => None,
            }
        };

        Self {
            raw,
            resolved,
            children: raw
                .children
                .iter()
                .map(|child| Self::matched(child, index, config))
                .collect(),
        }
    }

    fn position(&self) -> Option<usize> {
        self.resolved.map(|(position, _)| position)
    }

    fn into_chapter(self, len: usize) -> ChapterNode {
        let (position, confidence) = self
            .resolved
            .unwrap_or((0, PositionConfidence::Interpolated));

        let mut chapter = ChapterNode::new(self.raw.title.trim(), self.raw.level, position);
        if let Some(id) = &self.raw.id {
            chapter.id = ChapterId::from(id.as_str());
        }
        chapter.confidence = confidence;
        chapter.children = self
            .children
            .into_iter()
            .map(|child| child.into_chapter(len))
            .collect();

        clamp_position(chapter, len)
    }
}

/// Places runs of unpositioned siblings evenly between their neighbours.
///
/// `lower..=upper` is the range available to `drafts`. Children are handled
/// recursively within the range their parent owns.
fn interpolate(drafts: &mut [Draft], lower: usize, upper: usize, index: &LineIndex) {
    let mut i = 0;
    while i < drafts.len() {
        if drafts[i].resolved.is_some() {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < drafts.len() && drafts[i].resolved.is_none() {
            i += 1;
        }
        let run_len = i - run_start;

        let from = run_start
            .checked_sub(1)
            .and_then(|prev| drafts[prev].position())
            .unwrap_or(lower);
        let to = drafts
            .get(i)
            .and_then(Draft::position)
            .unwrap_or(upper)
            .max(from);

        for (step, draft) in drafts[run_start..i].iter_mut().enumerate() {
            let raw = from + (step + 1) * (to - from) / (run_len + 1);
            let snapped = index.nearest_start_within(raw, from, to);
            warn!(
                title = %draft.raw.title,
                position = snapped,
                "no match for outline title, interpolating"
            );
            draft.resolved = Some((snapped, PositionConfidence::Interpolated));
        }
    }

    for i in 0..drafts.len() {
        let start = drafts[i].position().unwrap_or(lower);
        let end = drafts
            .get(i + 1)
            .and_then(Draft::position)
            .unwrap_or(upper)
            .max(start);
        interpolate(&mut drafts[i].children, start, end, index);
    }
}

/// Converts a decoder outline into a chapter forest positioned in `text`.
///
/// ```rust
/// use quire::{PositionConfidence, PositionHint, RawOutlineNode, ReconcileConfig, reconcile_outline};
///
/// let text = "Opening words\nThe Long Voyage Home\nsea and sky\nEpilogue";
/// let outline = vec![
///     RawOutlineNode::new("the long voyage", 1).with_hint(PositionHint::Ordinal(7)),
///     RawOutlineNode::new("Epilogue", 1),
/// ];
///
/// let chapters = reconcile_outline(&outline, text, &ReconcileConfig::default());
/// assert_eq!(chapters[0].position, 14);
/// assert_eq!(chapters[0].confidence, PositionConfidence::Fuzzy);
/// assert_eq!(chapters[1].confidence, PositionConfidence::Exact);
/// ```
pub fn reconcile_outline(
    outline: &[RawOutlineNode],
    text: &str,
    config: &ReconcileConfig,
) -> Vec<ChapterNode> {
    let index = LineIndex::new(text);
    let mut drafts: Vec<Draft> = outline
        .iter()
        .map(|raw| Draft::matched(raw, &index, config))
        .collect();

    interpolate(
        &mut drafts,
        0,
        index.char_len().saturating_sub(1),
        &index,
    );

    drafts
        .into_iter()
        .map(|draft| draft.into_chapter(index.char_len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::flatten_chapters;

    const TEXT: &str = "Preface\nChapter One\nsome text\nChapter Two\nmore text";

    fn positions(chapters: &[ChapterNode]) -> Vec<usize> {
        flatten_chapters(chapters)
            .iter()
            .map(|c| c.position)
            .collect()
    }

    #[test]
    fn recalculate_finds_titles() {
        let chapters = vec![
            ChapterNode::new("Chapter One", 1, 999),
            ChapterNode::new("Chapter Two", 1, 0),
            ChapterNode::new("Missing", 1, 5),
        ];
        let fixed = recalculate_chapter_positions(&chapters, TEXT);

        assert_eq!(positions(&fixed), vec![8, 30, 5]);
        // Input untouched
        assert_eq!(chapters[0].position, 999);
    }

    #[test]
    fn recalculate_matches_nested_by_title() {
        let chapters = vec![
            ChapterNode::new("Preface", 1, 40)
                .with_children(vec![ChapterNode::new("Chapter Two", 2, 0)]),
        ];
        let fixed = recalculate_chapter_positions(&chapters, TEXT);
        assert_eq!(fixed[0].position, 0);
        assert_eq!(fixed[0].children[0].position, 30);
    }

    #[test]
    fn recalculate_with_empty_inputs() {
        assert!(recalculate_chapter_positions(&[], TEXT).is_empty());
        let chapters = vec![ChapterNode::new("A", 1, 3)];
        assert_eq!(recalculate_chapter_positions(&chapters, ""), chapters);
    }

    #[test]
    fn validate_clamps_into_text() {
        let text = "short text";
        let chapters = vec![
            ChapterNode::new("nowhere", 1, 4),
            ChapterNode::new("elsewhere", 1, 500)
                .with_children(vec![ChapterNode::new("deeper", 2, 10)]),
        ];
        let fixed = validate_and_fix_chapter_positions(&chapters, text);
        let len = text.chars().count();

        for chapter in flatten_chapters(&fixed) {
            assert!(chapter.position < len);
        }
        assert_eq!(fixed[1].position, len - 1);
        assert_eq!(fixed[1].confidence, PositionConfidence::Clamped);
        assert_eq!(fixed[0].confidence, PositionConfidence::Exact);
    }

    #[test]
    fn validate_leaves_empty_text_alone() {
        let chapters = vec![ChapterNode::new("A", 1, 3)];
        assert_eq!(validate_and_fix_chapter_positions(&chapters, ""), chapters);
    }

    #[test]
    fn fuzzy_prefers_best_then_earliest() {
        let text = "alpha\nwild river crossing\nthe wild river\nwild river";
        let index = LineIndex::new(text);
        let config = ReconcileConfig::default();

        // "wild river crossing" has score 1.0 on line 1
        assert_eq!(
            find_fuzzy(&index, "Crossing the Wild River", &config).map(|(line, _)| line),
            Some(1)
        );
        // 2/3 words on lines 1, 2 and 3, earliest wins
        assert_eq!(
            find_fuzzy(&index, "wild river rapids", &config).map(|(line, _)| line),
            Some(1)
        );
        // 1/2 is not above the threshold
        assert_eq!(find_fuzzy(&index, "wild horses", &config), None);
    }

    #[test]
    fn fuzzy_threshold_is_tunable() {
        let index = LineIndex::new("wild river");
        let config = ReconcileConfig::default().with_fuzzy_threshold(0.4);
        assert_eq!(
            find_fuzzy(&index, "wild horses", &config).map(|(line, _)| line),
            Some(0)
        );
    }

    #[test]
    fn outline_exact_wins_over_fuzzy() {
        let text = "one two three four\nsomething else\nfour three two one";
        let outline = vec![RawOutlineNode::new("four three two one", 1)];
        let chapters = reconcile_outline(&outline, text, &ReconcileConfig::default());
        assert_eq!(chapters[0].position, 34);
        assert_eq!(chapters[0].confidence, PositionConfidence::Exact);
    }

    #[test]
    fn outline_offsets_are_trusted_when_in_range() {
        let text = "aaaa\nbbbb\ncccc";
        let outline = vec![
            RawOutlineNode::new("x", 1).with_hint(PositionHint::Offset(5)),
            RawOutlineNode::new("y", 1).with_hint(PositionHint::Offset(500)),
        ];
        let chapters = reconcile_outline(&outline, text, &ReconcileConfig::default());
        assert_eq!(chapters[0].position, 5);
        assert_eq!(chapters[0].confidence, PositionConfidence::Hinted);
        assert_eq!(chapters[1].confidence, PositionConfidence::Interpolated);
        assert!(chapters[1].position >= 5);
    }

    #[test]
    fn outline_interpolates_between_neighbours() {
        // Lines start at 0, 10, 20, 30, 40
        let text = "Beginning\n111111111\n222222222\n333333333\nThe End!!";
        let outline = vec![
            RawOutlineNode::new("Beginning", 1),
            RawOutlineNode::new("page 7", 1).with_hint(PositionHint::Ordinal(7)),
            RawOutlineNode::new("page 9", 1).with_hint(PositionHint::Ordinal(9)),
            RawOutlineNode::new("The End", 1),
        ];
        let chapters = reconcile_outline(&outline, text, &ReconcileConfig::default());

        assert_eq!(positions(&chapters), vec![0, 10, 30, 40]);
        assert!(
            chapters[1..3]
                .iter()
                .all(|c| c.confidence == PositionConfidence::Interpolated)
        );
    }

    #[test]
    fn outline_children_stay_inside_parent() {
        let text = "Part A\n111111111\n222222222\nPart B\n333333333";
        let outline = vec![
            RawOutlineNode::new("Part A", 1).with_children(vec![
                RawOutlineNode::new("unknown", 2).with_hint(PositionHint::Ordinal(3)),
            ]),
            RawOutlineNode::new("Part B", 1),
        ];
        let chapters = reconcile_outline(&outline, text, &ReconcileConfig::default());

        // Lines start at 0, 7, 17, 27, 34
        let child = &chapters[0].children[0];
        assert_eq!(chapters[1].position, 27);
        assert_eq!(child.position, 17);
        assert_eq!(child.confidence, PositionConfidence::Interpolated);
    }

    #[test]
    fn outline_keeps_supplied_ids() {
        let outline = vec![RawOutlineNode::new("Alpha", 1).with_id("nav-1")];
        let chapters = reconcile_outline(&outline, "Alpha\nbody", &ReconcileConfig::default());
        assert_eq!(chapters[0].id.as_str(), "nav-1");
    }

    #[test]
    fn outline_positions_are_valid() {
        let text = "x\ny\nz";
        let outline = vec![
            RawOutlineNode::new("a", 1).with_hint(PositionHint::Ordinal(-4)),
            RawOutlineNode::new("b", 1).with_hint(PositionHint::Ordinal(i64::MAX)),
            RawOutlineNode::new("c", 1).with_hint(PositionHint::None),
        ];
        let chapters = reconcile_outline(&outline, text, &ReconcileConfig::default());
        for chapter in flatten_chapters(&chapters) {
            assert!(chapter.position < text.len());
        }
    }
}
