use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
/// Persisted UI/application settings for the component editor.
pub struct AppConfig {
    pub window_width: Option<f32>,
    pub window_height: Option<f32>,
    /// Model document opened when none is given on the command line.
    pub model_path: Option<PathBuf>,
    /// Object shown in the editor when the app last exited.
    pub last_path: Option<String>,
    /// `any` or `subject`; see `RefreshScope`.
    pub refresh_scope: Option<String>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("component-editor").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable config");
            Self::default()
        })
    }

    /// Writes config to disk, ignoring filesystem/serialization errors.
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(s) = toml::to_string_pretty(self) {
            let _ = std::fs::write(&path, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn parse_fills_missing_fields_with_none() {
        let config = AppConfig::parse("last_path = \"prob.dis1\"\nrefresh_scope = \"subject\"\n");
        assert_eq!(config.last_path.as_deref(), Some("prob.dis1"));
        assert_eq!(config.refresh_scope.as_deref(), Some("subject"));
        assert!(config.model_path.is_none());
        assert!(config.window_width.is_none());
    }

    #[test]
    fn parse_falls_back_to_defaults_on_bad_toml() {
        let config = AppConfig::parse("window_width = \"wide\"");
        assert!(config.window_width.is_none());
        assert!(config.last_path.is_none());
    }
}
