use std::fs;
use std::path::PathBuf;

use quire::{PracticeSession, SessionStore};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create sessions directory: {0}")]
    CreateDirectory(std::io::Error),

    #[error("Failed to read session file: {0}")]
    ReadFile(std::io::Error),

    #[error("Failed to write session file: {0}")]
    WriteFile(std::io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(serde_json::Error),
}

/// One pretty-printed JSON file per document in a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    pub fn new(directory: PathBuf) -> Result<Self, StoreError> {
        if !directory.exists() {
            fs::create_dir_all(&directory).map_err(StoreError::CreateDirectory)?;
        }
        Ok(Self { directory })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }
}

impl SessionStore for JsonFileStore {
    type Error = StoreError;

    /// A file that no longer parses is treated as missing, so a format change
    /// only costs the saved progress.
    fn load(&self, key: &str) -> Result<Option<PracticeSession>, StoreError> {
        let path = self.path(key);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(StoreError::ReadFile)?;
        match serde_json::from_str(&content) {
            Ok(session) => {
                debug!(path = %path.display(), "loaded session");
                Ok(Some(session))
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, session: &PracticeSession) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(session).map_err(StoreError::Serialize)?;
        fs::write(self.path(key), json).map_err(StoreError::WriteFile)?;
        debug!(key, "saved session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quire::{ChapterNode, session_key};

    use super::*;

    fn session() -> PracticeSession {
        let mut chapter = ChapterNode::new("Intro", 1, 0).with_id("intro");
        chapter.content = Some("Hello there".to_string());
        PracticeSession::new("My Book", vec![chapter, ChapterNode::new("End", 1, 12)])
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("sessions")).unwrap();
        let key = session_key("My Book");

        assert_eq!(store.load(&key).unwrap(), None);

        let mut session = session();
        session.complete_chapter(&"intro".into());
        session.last_position = 3;
        store.save(&key, &session).unwrap();

        assert!(dir.path().join("sessions").join("my-book.json").is_file());
        assert_eq!(store.load(&key).unwrap(), Some(session));
    }

    #[test]
    fn corrupt_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        assert_eq!(store.load("broken").unwrap(), None);
    }

    #[test]
    fn camel_case_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().to_path_buf()).unwrap();
        store.save("book", &session()).unwrap();

        let json = fs::read_to_string(dir.path().join("book.json")).unwrap();
        assert!(json.contains("\"currentChapterIndex\": 0"));
        assert!(json.contains("\"completedChapters\": []"));
    }
}
