use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{services::unions::DEFAULT_REMINDER_HOUR, storage::json::DEFAULT_BACKUPS_TO_KEEP};

const APP_DIR: &str = "exito";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid reminder hour {0}: expected 0 to 23")]
    InvalidReminderHour(i8),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where clients and reminders are kept
    pub data_dir: Option<PathBuf>,
    /// Hour of the day the monthly union check fires
    pub reminder_hour: i8,
    /// Previous client documents kept in `backups/`, 0 disables backups
    pub backups_to_keep: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            reminder_hour: DEFAULT_REMINDER_HOUR,
            backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Reads the config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        if !(0..=23).contains(&config.reminder_hour) {
            return Err(ConfigError::InvalidReminderHour(config.reminder_hour));
        }

        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }

    pub fn clients_path(&self) -> PathBuf {
        self.data_dir().join("clients.json")
    }

    pub fn reminders_path(&self) -> PathBuf {
        self.data_dir().join("reminders.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(&dir.path().join("config.json")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.reminder_hour, 9);
        assert_eq!(config.backups_to_keep, 5);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "data_dir": "/srv/exito", "reminder_hour": 8 }"#).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.reminder_hour, 8);
        assert_eq!(config.backups_to_keep, 5);
        assert_eq!(config.clients_path(), PathBuf::from("/srv/exito/clients.json"));
        assert_eq!(config.reminders_path(), PathBuf::from("/srv/exito/reminders.json"));
    }

    #[test]
    fn test_invalid_reminder_hour() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "reminder_hour": 24 }"#).unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidReminderHour(24))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "reminder_hour = 9").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::ParseFailed { .. })));
    }
}
