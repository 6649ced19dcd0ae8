use std::path::{Path, PathBuf};

use derive_more::From;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use quire::{
    DEFAULT_FULL_TEXT_LABEL, DEFAULT_NO_CONTENT_LABEL, EngineConfig, ImportOptions,
    ReconcileConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const SETTINGS_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "RETYPE_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Wrap width in terminal columns
    pub width: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { width: 72 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Labels {
    /// Title of the single chapter used when no structure is found
    pub full_text: String,
    /// Content of a chapter whose text turned out empty
    pub no_content: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            full_text: DEFAULT_FULL_TEXT_LABEL.to_string(),
            no_content: DEFAULT_NO_CONTENT_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub typing: EngineConfig,
    pub reconcile: ReconcileConfig,
    pub layout: LayoutConfig,
    pub labels: Labels,
    pub sessions_dir: Option<PathBuf>,
}

impl Settings {
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            fallback_title: self.labels.full_text.clone(),
            placeholder: self.labels.no_content.clone(),
            reconcile: self.reconcile,
        }
    }
}

#[derive(Debug, From, Error)]
pub enum ConfigError {
    #[error(
        "Failed to get configuration directory. Please specify the location using the `--config <path>` flag"
    )]
    NoDirectory,

    #[error("Failed to create config directory: {0}")]
    CreateDirectory(std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(Box<figment::Error>),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config file: {0}")]
    #[from(skip)]
    Write(std::io::Error),

    #[error("Config file '{0}' already exists, pass `--force` to overwrite it")]
    #[from(skip)]
    AlreadyExists(PathBuf),
}

#[derive(Debug)]
pub struct Config {
    pub settings: Settings,
    pub directory: PathBuf,
}

impl Config {
    /// Config directory: the override if given, the platform location
    /// otherwise. Created if missing.
    pub fn directory(override_path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        let config_dir = override_path
            .or_else(|| project_dirs().map(|dirs| dirs.config_dir().to_path_buf()))
            .ok_or(ConfigError::NoDirectory)?;

        // Ensure path exists
        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)?;
        }

        Ok(config_dir)
    }

    /// Layers defaults, `settings.toml` and `RETYPE_*` environment variables.
    pub fn get(override_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let overridden = override_path.is_some();
        let config_dir = Self::directory(override_path)?;

        // Grab default configuration
        let mut settings = Figment::from(Serialized::defaults(Settings::default()));

        let settings_toml = config_dir.join(SETTINGS_FILE);
        if settings_toml.exists() {
            debug!(path = %settings_toml.display(), "loading settings");
            settings = settings.merge(Toml::file(settings_toml));
        }

        // RETYPE_LAYOUT__WIDTH=60 sets layout.width
        settings = settings.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut settings: Settings = settings.extract().map_err(Box::new)?;

        let sessions_dir = settings.sessions_dir.clone().unwrap_or_else(|| {
            project_dirs()
                .filter(|_| !overridden)
                .map_or_else(
                    || config_dir.join("sessions"),
                    |dirs| dirs.data_dir().join("sessions"),
                )
        });
        settings.sessions_dir = Some(sessions_dir);

        Ok(Self {
            settings,
            directory: config_dir,
        })
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.settings
            .sessions_dir
            .clone()
            .unwrap_or_else(|| self.directory.join("sessions"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "Retype", "Retype")
}

/// Writes a `settings.toml` holding every default into `config_dir`.
pub fn init(config_dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = config_dir.join(SETTINGS_FILE);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }

    let content = toml::to_string_pretty(&Settings::default())?;
    std::fs::write(&path, content).map_err(ConfigError::Write)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::get(Some(dir.path().to_path_buf())).unwrap();

        assert_eq!(config.settings.layout.width, 72);
        assert_eq!(config.settings.labels.full_text, "Full Text");
        assert!(config.settings.typing.ignore_symbols);
        assert_eq!(config.sessions_dir(), dir.path().join("sessions"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "[layout]\nwidth = 40\n\n[typing]\nauto_advance = false\n\n[typing.completion]\nmin_ratio = 1.0\n",
        )
        .unwrap();

        let settings = Config::get(Some(dir.path().to_path_buf())).unwrap().settings;
        assert_eq!(settings.layout.width, 40);
        assert!(!settings.typing.auto_advance);
        assert!(settings.typing.ignore_symbols);
        assert_eq!(settings.typing.completion.min_ratio, 1.0);
        assert_eq!(settings.typing.completion.tail_min_chars, 5);
        assert_eq!(settings.reconcile, ReconcileConfig::default());
    }

    #[test]
    fn init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path(), false).unwrap();
        assert!(path.exists());

        let mut settings = Config::get(Some(dir.path().to_path_buf())).unwrap().settings;
        settings.sessions_dir = None;
        assert_eq!(settings, Settings::default());

        assert!(matches!(
            init(dir.path(), false),
            Err(ConfigError::AlreadyExists(_))
        ));
        assert!(init(dir.path(), true).is_ok());
    }

    #[test]
    fn bad_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "[layout]\nwidth = \"wide\"\n").unwrap();

        assert!(matches!(
            Config::get(Some(dir.path().to_path_buf())),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn import_options_follow_labels() {
        let mut settings = Settings::default();
        settings.labels.full_text = "Everything".to_string();
        assert_eq!(settings.import_options().fallback_title, "Everything");
    }
}
