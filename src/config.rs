//! Configuration for searchdoc
//!
//! `StoreConfig` tunes the query layer and is shared by every store of a
//! catalog. `IndexConfig` tunes the tantivy index behind each collection.
//! `Config` is the on-disk JSON file read by the CLI; it embeds the store
//! settings at the top level and the index settings under `index`.
//!
//! ```json
//! {
//!   "data_dir": "./data",
//!   "log_level": "warn",
//!   "default_page_size": 10,
//!   "join_failure_mode": "report",
//!   "max_join_depth": 16,
//!   "serialize_writes": false,
//!   "index": { "writer_heap_size": 50000000 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event, Event, Logger, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// What happens to join failures inside a search result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinFailureMode {
    /// Logged and counted only; the result carries nothing
    Silent,
    /// Also listed in `SearchResult::join_failures`
    #[default]
    Report,
}

/// Query layer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Page size used when a query asks for less than one document
    pub default_page_size: usize,
    /// Page size of the unpaginated scan behind sum/avg
    pub aggregate_scan_size: usize,
    pub join_failure_mode: JoinFailureMode,
    /// Deepest allowed join nesting
    pub max_join_depth: usize,
    /// Serialize read-merge-write of `put` per id
    pub serialize_writes: bool,
    /// Number of lock stripes used when `serialize_writes` is on
    pub write_lock_stripes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            aggregate_scan_size: i32::MAX as usize,
            join_failure_mode: JoinFailureMode::Report,
            max_join_depth: 16,
            serialize_writes: false,
            write_lock_stripes: 64,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid("default_page_size must be > 0".into()));
        }
        if self.aggregate_scan_size == 0 {
            return Err(ConfigError::Invalid("aggregate_scan_size must be > 0".into()));
        }
        if self.max_join_depth == 0 {
            return Err(ConfigError::Invalid("max_join_depth must be > 0".into()));
        }
        if self.serialize_writes && self.write_lock_stripes == 0 {
            return Err(ConfigError::Invalid(
                "write_lock_stripes must be > 0 when serialize_writes is on".into(),
            ));
        }
        Ok(())
    }
}

/// Smallest writer heap tantivy accepts for one indexing thread
pub const MIN_WRITER_HEAP_SIZE: usize = 15_000_000;

/// Per-collection index settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Memory budget of each collection's index writer, in bytes
    pub writer_heap_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            writer_heap_size: 50_000_000,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.writer_heap_size < MIN_WRITER_HEAP_SIZE {
            return Err(ConfigError::Invalid(format!(
                "writer_heap_size must be >= {}",
                MIN_WRITER_HEAP_SIZE
            )));
        }
        Ok(())
    }
}

/// CLI configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one index directory per collection
    pub data_dir: String,

    /// Minimum log severity, or "off"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(flatten)]
    pub store: StoreConfig,

    #[serde(default)]
    pub index: IndexConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_level: default_log_level(),
            store: StoreConfig::default(),
            index: IndexConfig::default(),
        }
    }

    /// Loads and validates a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        let path_str = path.display().to_string();
        log_event(Event::ConfigLoaded, &[("path", path_str.as_str())]);
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if !self.log_level.eq_ignore_ascii_case("off") && Severity::parse(&self.log_level).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or off.",
                self.log_level
            )));
        }
        self.store.validate()?;
        self.index.validate()
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Applies `log_level` to the process-wide logger
    pub fn apply_log_level(&self) {
        match Severity::parse(&self.log_level) {
            Some(severity) => Logger::set_min_severity(severity),
            None => Logger::mute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.aggregate_scan_size, i32::MAX as usize);
        assert_eq!(config.join_failure_mode, JoinFailureMode::Report);
        assert!(!config.serialize_writes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_value(json!({
            "data_dir": "/tmp/x",
            "join_failure_mode": "silent",
            "max_join_depth": 4
        }))
        .unwrap();

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.store.join_failure_mode, JoinFailureMode::Silent);
        assert_eq!(config.store.max_join_depth, 4);
        assert_eq!(config.store.default_page_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_values() {
        let mut config = StoreConfig::default();
        config.default_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.max_join_depth = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.serialize_writes = true;
        config.write_lock_stripes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_settings() {
        let config: Config = serde_json::from_value(json!({"data_dir": "/tmp/x"})).unwrap();
        assert_eq!(config.index, IndexConfig::default());

        let config: Config = serde_json::from_value(json!({
            "data_dir": "/tmp/x",
            "index": {"writer_heap_size": 1000}
        }))
        .unwrap();
        assert_eq!(config.index.writer_heap_size, 1000);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut config = Config::new("/tmp/x");
        config.log_level = "chatty".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.log_level = "OFF".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searchdoc.json");
        fs::write(&path, r#"{"data_dir": "./data", "serialize_writes": true}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.store.serialize_writes);
        assert_eq!(config.data_path(), Path::new("./data"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
