use std::path::PathBuf;

use derive_more::From;
use quire::DecodeError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Debug, From, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(ConfigError),

    #[error("Failed to decode document: {0}")]
    Decode(DecodeError),

    #[error(transparent)]
    Store(StoreError),

    #[error("Failed to read '{}': {error}", path.display())]
    #[from(skip)]
    ReadInput {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Terminal I/O failed: {0}")]
    Io(std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Json(serde_json::Error),

    #[error("No chapter matches '{0}'")]
    #[from(skip)]
    UnknownChapter(String),
}
