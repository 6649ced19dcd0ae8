//! Moving between chapters of a split forest.
//!
//! Next/previous navigation only visits chapters that have something to type,
//! in depth-first order.

use crate::{ChapterId, ChapterNode, flatten_chapters, map_chapters};

/// Chapter whose heading is the closest one at or before `position`.
///
/// Falls back to the first chapter when `position` precedes every heading.
pub fn find_current_chapter(chapters: &[ChapterNode], position: usize) -> Option<&ChapterNode> {
    let flat = flatten_chapters(chapters);
    flat.iter()
        .copied()
        .filter(|chapter| chapter.position <= position)
        .min_by_key(|chapter| position - chapter.position)
        .or_else(|| flat.first().copied())
}

fn typable(chapters: &[ChapterNode]) -> Vec<&ChapterNode> {
    flatten_chapters(chapters)
        .into_iter()
        .filter(|chapter| chapter.has_content())
        .collect()
}

pub fn find_next_chapter<'a>(chapters: &'a [ChapterNode], id: &ChapterId) -> Option<&'a ChapterNode> {
    let typable = typable(chapters);
    let current = typable.iter().position(|chapter| &chapter.id == id)?;
    typable.get(current + 1).copied()
}

pub fn find_prev_chapter<'a>(chapters: &'a [ChapterNode], id: &ChapterId) -> Option<&'a ChapterNode> {
    let typable = typable(chapters);
    let current = typable.iter().position(|chapter| &chapter.id == id)?;
    current.checked_sub(1).and_then(|prev| typable.get(prev).copied())
}

/// Percentage of chapters that are completed, in `0.0..=100.0`.
///
/// A chapter counts if it is flagged `completed` or its id is in `completed`.
/// Ids that do not belong to the forest are ignored.
pub fn calculate_overall_progress(chapters: &[ChapterNode], completed: &[ChapterId]) -> f64 {
    let flat = flatten_chapters(chapters);
    if flat.is_empty() {
        return 0.0;
    }

    let done = flat
        .iter()
        .filter(|chapter| chapter.completed || completed.contains(&chapter.id))
        .count();

    done as f64 / flat.len() as f64 * 100.0
}

/// Returns a copy of `chapters` with chapter `id` marked completed.
pub fn mark_completed(chapters: &[ChapterNode], id: &ChapterId) -> Vec<ChapterNode> {
    map_chapters(chapters, |_, mut chapter| {
        if &chapter.id == id {
            chapter.completed = true;
        }
        chapter
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split_text_by_chapters;

    fn forest() -> Vec<ChapterNode> {
        let text = "# A\nalpha\n## A.1\nnested\n# B\nbeta";
        let chapters = vec![
            ChapterNode::new("A", 1, 0)
                .with_id("a")
                .with_children(vec![ChapterNode::new("A.1", 2, 10).with_id("a1")]),
            ChapterNode::new("B", 1, 24).with_id("b"),
        ];
        split_text_by_chapters(text, &chapters, "Full Text")
    }

    #[test]
    fn current_chapter_by_position() {
        let chapters = forest();
        let id = |position| find_current_chapter(&chapters, position).map(|c| c.id.as_str());

        assert_eq!(id(0), Some("a"));
        assert_eq!(id(12), Some("a1"));
        assert_eq!(id(500), Some("b"));
        assert!(find_current_chapter(&[], 3).is_none());
    }

    #[test]
    fn current_chapter_before_first_heading() {
        let chapters = vec![ChapterNode::new("Late", 1, 40).with_id("late")];
        assert_eq!(
            find_current_chapter(&chapters, 2).map(|c| c.id.as_str()),
            Some("late")
        );
    }

    #[test]
    fn next_and_previous_walk_depth_first() {
        let chapters = forest();
        let next = |id: &str| find_next_chapter(&chapters, &id.into()).map(|c| c.id.as_str());
        let prev = |id: &str| find_prev_chapter(&chapters, &id.into()).map(|c| c.id.as_str());

        assert_eq!(next("a"), Some("a1"));
        assert_eq!(next("a1"), Some("b"));
        assert_eq!(next("b"), None);
        assert_eq!(prev("b"), Some("a1"));
        assert_eq!(prev("a"), None);
        assert_eq!(next("missing"), None);
    }

    #[test]
    fn navigation_skips_empty_chapters() {
        let mut chapters = forest();
        chapters[0].children[0].content = Some("  ".to_string());
        assert_eq!(
            find_next_chapter(&chapters, &"a".into()).map(|c| c.id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn progress_and_completion() {
        let chapters = forest();
        assert_eq!(calculate_overall_progress(&chapters, &[]), 0.0);
        assert_eq!(calculate_overall_progress(&[], &["a".into()]), 0.0);

        let marked = mark_completed(&chapters, &"a1".into());
        assert!(marked[0].children[0].completed);
        assert!(!chapters[0].children[0].completed);

        let progress = calculate_overall_progress(&marked, &["b".into(), "ghost".into()]);
        assert!((progress - 200.0 / 3.0).abs() < 1e-9);
    }
}
