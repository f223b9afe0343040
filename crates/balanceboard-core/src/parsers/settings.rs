//! Settings parser with graceful fallback to defaults

use crate::error::{CoreError, LoadError, LoadReport};
use crate::models::Settings;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parser for balanceboard settings files
pub struct SettingsParser;

impl Default for SettingsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsParser {
    pub fn new() -> Self {
        Self
    }

    /// Default location: `~/.balanceboard/settings.json`
    pub fn default_path() -> Result<PathBuf, CoreError> {
        dirs::home_dir()
            .map(|home| home.join(".balanceboard").join("settings.json"))
            .ok_or(CoreError::HomeNotFound)
    }

    /// Parse a single settings.json file
    pub async fn parse(&self, path: &Path) -> Result<Settings, CoreError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::from_io(path, e))?;

        let settings: Settings =
            serde_json::from_str(&content).map_err(|e| CoreError::JsonParse {
                path: path.to_path_buf(),
                message: e.to_string(),
                source: e,
            })?;

        settings.forecast.validate()?;
        settings.offset()?;
        Ok(settings)
    }

    /// Parse settings file, falling back to defaults on any error
    pub async fn parse_graceful(&self, path: &Path, report: &mut LoadReport) -> Settings {
        match self.parse(path).await {
            Ok(settings) => {
                debug!(?path, "Loaded settings");
                report.settings_loaded = true;
                settings
            }
            Err(CoreError::FileNotFound { .. }) => {
                // No settings file is the normal case
                debug!(?path, "Settings file not found, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!(?path, error = %e, "Failed to load settings, using defaults");
                report.add_error(LoadError::from_core_error("settings", &e));
                Settings::default()
            }
        }
    }

    /// Persist settings as pretty JSON, creating the parent directory
    pub async fn save(&self, path: &Path, settings: &Settings) -> Result<(), CoreError> {
        let write_err = |source| CoreError::FileWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(settings).map_err(|e| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })?;

        tokio::fs::write(path, content).await.map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_settings_uses_defaults() {
        let dir = tempdir().unwrap();
        let mut report = LoadReport::new();

        let settings = SettingsParser::new()
            .parse_graceful(&dir.path().join("settings.json"), &mut report)
            .await;

        assert_eq!(settings, Settings::default());
        assert!(!report.settings_loaded);
        assert!(!report.has_errors());
    }

    #[tokio::test]
    async fn test_invalid_settings_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"forecast":{"alpha":3.0}}"#)
            .await
            .unwrap();

        let mut report = LoadReport::new();
        let settings = SettingsParser::new().parse_graceful(&path, &mut report).await;

        assert_eq!(settings.forecast.alpha, 0.3);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "settings");
    }

    #[tokio::test]
    async fn test_save_then_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let parser = SettingsParser::new();

        let mut settings = Settings::default();
        settings.utc_offset = Some("+09:00".to_string());
        settings.forecast.rising_trend_floor = Some(0.002);

        parser.save(&path, &settings).await.unwrap();
        let loaded = parser.parse(&path).await.unwrap();

        assert_eq!(loaded, settings);
    }
}
