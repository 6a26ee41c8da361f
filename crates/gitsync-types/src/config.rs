//! Configuration loading for gitsync.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/gitsync/config.toml.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::GitsyncError;

/// Which repository to synchronize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySettings {
    /// Path to the repository (work tree or bare directory)
    #[serde(default)]
    pub path: Option<String>,

    /// Id used to scope documents in the shared index.
    /// Defaults to the repository path.
    #[serde(default)]
    pub id: Option<String>,
}

/// Document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL of the search engine REST API
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Index holding both blob and commit documents
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_name() -> String {
    "gitsync-repository".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            index_name: default_index_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Write path settings: retries, batching and the content filter ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingSettings {
    /// Total attempts per document write, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay before jitter
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Operations buffered before a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Writes in flight at once during a flush
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,

    /// Blobs of this size or larger are never indexed
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrent_writes() -> usize {
    4
}

fn default_max_blob_size() -> u64 {
    1_048_576
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            batch_size: default_batch_size(),
            max_concurrent_writes: default_max_concurrent_writes(),
            max_blob_size: default_max_blob_size(),
        }
    }
}

/// Query side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Default page size
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Bucket count of the repository facet
    #[serde(default = "default_repositories_count")]
    pub repositories_count: u32,

    /// Bucket count of the language facet
    #[serde(default = "default_languages_count")]
    pub languages_count: u32,
}

fn default_per_page() -> u32 {
    20
}

fn default_repositories_count() -> u32 {
    10
}

fn default_languages_count() -> u32 {
    20
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            repositories_count: default_repositories_count(),
            languages_count: default_languages_count(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub repository: RepositorySettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub indexing: IndexingSettings,

    #[serde(default)]
    pub search: SearchSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/gitsync/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (GITSYNC__*, `__` between nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, GitsyncError> {
        let config_dir = ProjectDirs::from("", "", "gitsync")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| GitsyncError::Config(e.to_string()))?
            .set_default("store.url", default_store_url())
            .map_err(|e| GitsyncError::Config(e.to_string()))?
            .set_default("store.index_name", default_index_name())
            .map_err(|e| GitsyncError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: GITSYNC__REPOSITORY__PATH, GITSYNC__INDEXING__MAX_ATTEMPTS, etc.
        builder = builder.add_source(
            Environment::with_prefix("GITSYNC")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| GitsyncError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| GitsyncError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would stall or disable the write path.
    pub fn validate(&self) -> Result<(), GitsyncError> {
        if self.indexing.max_attempts == 0 {
            return Err(GitsyncError::Config(
                "indexing.max_attempts must be > 0".to_string(),
            ));
        }
        if self.indexing.batch_size == 0 {
            return Err(GitsyncError::Config(
                "indexing.batch_size must be > 0".to_string(),
            ));
        }
        if self.indexing.max_concurrent_writes == 0 {
            return Err(GitsyncError::Config(
                "indexing.max_concurrent_writes must be > 0".to_string(),
            ));
        }
        if self.store.index_name.trim().is_empty() {
            return Err(GitsyncError::Config(
                "store.index_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Repository path, or `MissingRepositoryConfiguration`.
    pub fn repository_path(&self) -> Result<PathBuf, GitsyncError> {
        match self.repository.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(expand_home(path)),
            _ => Err(GitsyncError::MissingRepositoryConfiguration),
        }
    }

    /// Configured repository id, falling back to the repository path.
    pub fn repository_id(&self) -> Result<String, GitsyncError> {
        match self.repository.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Ok(self.repository_path()?.to_string_lossy().to_string()),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.store.url, "http://localhost:9200");
        assert_eq!(settings.store.index_name, "gitsync-repository");
        assert_eq!(settings.indexing.max_attempts, 10);
        assert_eq!(settings.indexing.batch_size, 100);
        assert_eq!(settings.indexing.max_blob_size, 1_048_576);
        assert_eq!(settings.search.repositories_count, 10);
        assert_eq!(settings.search.languages_count, 20);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gitsync.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[repository]
path = "/srv/git/testme.git"
id = "1"

[indexing]
max_attempts = 3
batch_size = 25
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.indexing.max_attempts, 3);
        assert_eq!(settings.indexing.batch_size, 25);
        assert_eq!(settings.indexing.max_concurrent_writes, 4);
        assert_eq!(
            settings.repository_path().unwrap(),
            PathBuf::from("/srv/git/testme.git")
        );
        assert_eq!(settings.repository_id().unwrap(), "1");
    }

    #[test]
    fn test_missing_repository_path() {
        let settings = Settings::default();
        assert!(matches!(
            settings.repository_path(),
            Err(GitsyncError::MissingRepositoryConfiguration)
        ));
    }

    #[test]
    fn test_repository_id_defaults_to_path() {
        let mut settings = Settings::default();
        settings.repository.path = Some("/srv/git/app".to_string());
        assert_eq!(settings.repository_id().unwrap(), "/srv/git/app");
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.indexing.max_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.indexing.max_concurrent_writes = 0;
        assert!(settings.validate().is_err());
    }
}
