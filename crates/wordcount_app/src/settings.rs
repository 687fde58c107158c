//! Process settings, read from a RON file.
//!
//! Every field has a default, so the file may be partial or missing entirely.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use counter_logging::{engine_info, LogDestination};
use serde::{Deserialize, Serialize};
use wordcount_engine::{EngineConfig, FetchSettings, StoreConfig, DEFAULT_CHUNK_SIZE};

pub const DEFAULT_SETTINGS_FILE: &str = "wordcount.ron";
pub const DEFAULT_STORE_FILE: &str = "wordcount_store.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON file holding the running totals; `None` keeps them in memory.
    pub store_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub fetch: FetchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub destination: LogDestination,
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: Some(PathBuf::from(DEFAULT_STORE_FILE)),
            chunk_size: DEFAULT_CHUNK_SIZE,
            fetch: FetchConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            connect_timeout_ms: fetch.connect_timeout.as_millis() as u64,
            request_timeout_ms: fetch.request_timeout.as_millis() as u64,
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
            allowed_content_types: fetch.allowed_content_types,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::Terminal,
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        let store = match &self.store_path {
            Some(path) => StoreConfig::JsonFile(path.clone()),
            None => StoreConfig::Memory,
        };
        EngineConfig {
            store,
            fetch: FetchSettings {
                connect_timeout: Duration::from_millis(self.fetch.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.fetch.request_timeout_ms),
                redirect_limit: self.fetch.redirect_limit,
                max_bytes: self.fetch.max_bytes,
                allowed_content_types: self.fetch.allowed_content_types.clone(),
            },
            chunk_size: self.chunk_size,
        }
    }
}

/// Loads settings from `explicit`, or from `wordcount.ron` in the working directory.
///
/// An explicitly named file must exist; the default one is optional.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            return Ok(Settings::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read settings from {path:?}"));
        }
    };

    let settings: Settings =
        ron::from_str(&content).with_context(|| format!("failed to parse settings in {path:?}"))?;
    engine_info!("Loaded settings from {:?}", path);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("wordcount.ron");
        fs::write(&path, "(chunk_size: 128, fetch: (redirect_limit: 1))").unwrap();

        let settings = load_settings(Some(&path)).unwrap();

        assert_eq!(settings.chunk_size, 128);
        assert_eq!(settings.fetch.redirect_limit, 1);
        assert_eq!(settings.fetch.max_bytes, FetchConfig::default().max_bytes);
        assert_eq!(settings.store_path, Some(PathBuf::from(DEFAULT_STORE_FILE)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(load_settings(Some(&temp.path().join("absent.ron"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bad.ron");
        fs::write(&path, "(chunk_size: \"lots\")").unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn engine_config_maps_store_and_timeouts() {
        let settings = Settings {
            store_path: None,
            ..Settings::default()
        };
        let config = settings.engine_config();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(
            config.fetch.request_timeout,
            FetchSettings::default().request_timeout
        );
    }

    #[test]
    fn settings_round_trip_through_ron() {
        let settings = Settings::default();
        let text = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::new()).unwrap();
        let parsed: Settings = ron::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
