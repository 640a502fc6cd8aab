//! Application settings stored as JSON in the platform data directory

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "com.papershelf";
const MAX_RECENT: usize = 10;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not find app data directory")]
    NoDataDir,
    #[error("Failed to access settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Library opened when no path is given.
    pub library_path: Option<PathBuf>,
    #[serde(default)]
    pub recent_libraries: Vec<PathBuf>,
    /// Default `tracing` filter, overridden by `RUST_LOG`.
    pub log_filter: Option<String>,
    /// Write logs to daily files here instead of stderr.
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Load from the default location; a missing file yields the defaults.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Like [`Settings::load`], but an unreadable file yields the defaults
    /// together with the error instead of failing.
    pub fn load_or_default() -> (Self, Option<SettingsError>) {
        match settings_path() {
            Ok(path) => Self::load_from_or_default(&path),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn load_from_or_default(path: &Path) -> (Self, Option<SettingsError>) {
        match Self::load_from(path) {
            Ok(settings) => (settings, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Move `path` to the front of the recent list.
    pub fn remember_library(&mut self, path: &Path) {
        self.recent_libraries.retain(|p| p != path);
        self.recent_libraries.insert(0, path.to_path_buf());
        self.recent_libraries.truncate(MAX_RECENT);
    }

    /// The configured library, falling back to [`default_library_path`].
    pub fn resolve_library_path(&self) -> Result<PathBuf, SettingsError> {
        match &self.library_path {
            Some(path) => Ok(path.clone()),
            None => default_library_path(),
        }
    }
}

fn app_dir() -> Result<PathBuf, SettingsError> {
    Ok(dirs::data_dir().ok_or(SettingsError::NoDataDir)?.join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf, SettingsError> {
    Ok(app_dir()?.join("settings.json"))
}

pub fn default_library_path() -> Result<PathBuf, SettingsError> {
    Ok(app_dir()?.join("library.sqlite"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.library_path = Some(PathBuf::from("/tmp/papers.sqlite"));
        settings.log_filter = Some("debug".to_string());
        settings.log_dir = Some(dir.path().join("logs"));
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        assert_eq!(
            settings.resolve_library_path().unwrap(),
            PathBuf::from("/tmp/papers.sqlite")
        );
    }

    #[test]
    fn test_remember_library_dedupes_and_caps() {
        let mut settings = Settings::default();
        for i in 0..12 {
            settings.remember_library(Path::new(&format!("/lib/{}.sqlite", i)));
        }
        settings.remember_library(Path::new("/lib/5.sqlite"));

        assert_eq!(settings.recent_libraries.len(), MAX_RECENT);
        assert_eq!(settings.recent_libraries[0], PathBuf::from("/lib/5.sqlite"));
        assert_eq!(
            settings.recent_libraries.iter().filter(|p| p.ends_with("5.sqlite")).count(),
            1
        );
    }

    #[test]
    fn test_bad_json_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_bad_json_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let (settings, err) = Settings::load_from_or_default(&path);
        assert_eq!(settings, Settings::default());
        assert!(matches!(err, Some(SettingsError::Json(_))));
        // The broken file is left for the user to fix.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_good_file_loads_without_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut saved = Settings::default();
        saved.log_filter = Some("info".to_string());
        saved.save_to(&path).unwrap();

        let (settings, err) = Settings::load_from_or_default(&path);
        assert_eq!(settings, saved);
        assert!(err.is_none());
    }
}
