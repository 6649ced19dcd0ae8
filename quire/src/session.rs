//! Practice progress over a whole document, and the port used to persist it.

use serde::{Deserialize, Serialize};

use crate::{ChapterId, ChapterNode, calculate_overall_progress, flatten_chapters, mark_completed};

/// Serializable record of a practice session over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub title: String,
    pub chapters: Vec<ChapterNode>,
    /// Index into the depth-first list of chapters
    pub current_chapter_index: usize,
    /// Percentage of completed chapters
    pub overall_progress: f64,
    #[serde(default)]
    pub completed_chapters: Vec<ChapterId>,
    /// Line of the current chapter the user stopped at
    #[serde(default)]
    pub last_position: usize,
}

impl PracticeSession {
    pub fn new(title: impl Into<String>, chapters: Vec<ChapterNode>) -> Self {
        let mut session = Self {
            title: title.into(),
            chapters,
            current_chapter_index: 0,
            overall_progress: 0.0,
            completed_chapters: Vec::new(),
            last_position: 0,
        };
        session.overall_progress =
            calculate_overall_progress(&session.chapters, &session.completed_chapters);
        session
    }

    pub fn current_chapter(&self) -> Option<&ChapterNode> {
        flatten_chapters(&self.chapters)
            .get(self.current_chapter_index)
            .copied()
    }

    /// Moves to chapter `id`, resetting the line position if it changed.
    ///
    /// Returns `false` if there is no such chapter.
    pub fn select_chapter(&mut self, id: &ChapterId) -> bool {
        let Some(index) = flatten_chapters(&self.chapters)
            .iter()
            .position(|chapter| &chapter.id == id)
        else {
            return false;
        };

        if index != self.current_chapter_index {
            self.current_chapter_index = index;
            self.last_position = 0;
        }
        true
    }

    /// Records chapter `id` as completed and updates the overall progress.
    pub fn complete_chapter(&mut self, id: &ChapterId) {
        if !self.completed_chapters.contains(id) {
            self.completed_chapters.push(id.clone());
        }
        self.chapters = mark_completed(&self.chapters, id);
        self.overall_progress = calculate_overall_progress(&self.chapters, &self.completed_chapters);
    }

    pub fn is_finished(&self) -> bool {
        flatten_chapters(&self.chapters)
            .iter()
            .all(|chapter| chapter.completed)
    }
}

/// Storage for practice sessions, keyed by [`session_key`].
pub trait SessionStore {
    type Error: std::error::Error;

    fn load(&self, key: &str) -> Result<Option<PracticeSession>, Self::Error>;

    fn save(&self, key: &str, session: &PracticeSession) -> Result<(), Self::Error>;
}

/// Storage key for a document title: lowercase alphanumerics separated by
/// single dashes.
pub fn session_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            key.push(c);
        } else if !key.is_empty() && !key.ends_with('-') {
            key.push('-');
        }
    }

    let key = key.trim_end_matches('-');
    if key.is_empty() {
        "untitled".to_string()
    } else {
        key.to_string()
    }
}
