//! Configuration loading for the daemon.
//!
//! Config lives at `~/.meetflow/config.json`. A missing file is not an error;
//! every field has a default, so a bare install runs with the stock scheduler
//! settings and the default database path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::db::MeetingDb;
use crate::types::Config;

pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".meetflow").join("config.json"))
}

/// Load config from the default location, falling back to defaults when the
/// file does not exist.
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(config)
}

/// Resolve the database path: the config override wins, otherwise
/// `~/.meetflow/meetflow.db`.
pub fn resolve_db_path(config: &Config) -> Result<PathBuf, String> {
    match &config.db_path {
        Some(path) => Ok(PathBuf::from(path)),
        None => MeetingDb::default_db_path().map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config_from(&dir.path().join("config.json")).expect("load");
        assert!(config.db_path.is_none());
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_minutes, 5);
    }

    #[test]
    fn test_partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "dbPath": "/tmp/meetflow-test.db", "scheduler": { "tickMinutes": 1 } }"#,
        )
        .expect("write");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.db_path.as_deref(), Some("/tmp/meetflow-test.db"));
        assert_eq!(config.scheduler.tick_minutes, 1);
        // Unspecified fields come from serde defaults
        assert_eq!(config.scheduler.lead_times_minutes, vec![1440, 60, 30]);
        assert_eq!(config.scheduler.completion_grace_hours, 2);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_db_path_override_wins() {
        let config = Config {
            db_path: Some("/var/lib/meetflow/meetings.db".into()),
            ..Default::default()
        };
        let path = resolve_db_path(&config).expect("resolve");
        assert_eq!(path, PathBuf::from("/var/lib/meetflow/meetings.db"));
    }
}
