//! Configuration management for anisuggest.
//!
//! Configuration is stored in TOML format. Every section and every field has
//! a default, so an absent file or a partial one is always usable.
//!
//! ## Lookup Order
//!
//! 1. **`ANISUGGEST_CONFIG`**: explicit path to a config file
//! 2. **Platform config directory**: `config.toml` under the project dirs
//! 3. **Built-in defaults**: targeting anidb.net
//!
//! The cache file location can additionally be redirected with
//! `ANISUGGEST_DATA_DIR`.
//!
//! ## Example Configuration File
//!
//! ```toml
//! [site]
//! site_url = "https://anidb.net/"
//! api_url = "https://anidb.net/perl-bin/animedb.pl?show=json&action=search"
//! search_url = "https://anidb.net/perl-bin/animedb.pl?show=search&do.search=search"
//! search_param = "adb.search"
//!
//! [site.no_cache_header]
//! name = "X-LControl"
//! value = "x-no-cache"
//!
//! [cache]
//! max_age_secs = 604800
//! quota_bytes = 5242880
//! key_prefix = "input:"
//!
//! [request]
//! debounce_ms = 200
//! timeout_secs = 30
//!
//! [categories]
//! "" = "anime"
//! c = "character"
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use anisuggest_core::Config;
//!
//! let config: Config = toml::from_str("[request]\ndebounce_ms = 50")?;
//! assert_eq!(config.request.debounce_ms, 50);
//! assert_eq!(config.cache.quota_bytes, 5_242_880);
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::category::CategoryRegistry;
use crate::{Error, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ANISUGGEST_CONFIG";

/// Environment variable naming the directory holding the cache file.
pub const DATA_DIR_ENV: &str = "ANISUGGEST_DATA_DIR";

const CACHE_FILE_NAME: &str = "cache.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote site and search endpoint.
    pub site: SiteConfig,
    /// Result cache.
    pub cache: CacheConfig,
    /// Request scheduling.
    pub request: RequestConfig,
    /// Category selector registry.
    pub categories: CategoryRegistry,
}

/// Remote site and search endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root, used for relative result links and as the fallback
    /// navigation target.
    pub site_url: String,

    /// JSON search endpoint. `type` and `query` parameters are appended.
    pub api_url: String,

    /// Human-facing search page opened on submit.
    pub search_url: String,

    /// Query parameter of `search_url` carrying the search text.
    pub search_param: String,

    /// Header sent with every endpoint request to bypass intermediary caches.
    pub no_cache_header: HeaderSetting,
}

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSetting {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a fetched result in seconds.
    pub max_age_secs: u64,

    /// Byte quota of the store. Eviction starts at half of it.
    pub quota_bytes: u64,

    /// Prefix shared by every cache key.
    pub key_prefix: String,

    /// Cache file. Defaults to `cache.json` in the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Request scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Cool-down before a request is dispatched, in milliseconds.
    pub debounce_ms: u64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "https://anidb.net/".to_string(),
            api_url: "https://anidb.net/perl-bin/animedb.pl?show=json&action=search".to_string(),
            search_url: "https://anidb.net/perl-bin/animedb.pl?show=search&do.search=search"
                .to_string(),
            search_param: "adb.search".to_string(),
            no_cache_header: HeaderSetting::default(),
        }
    }
}

impl Default for HeaderSetting {
    fn default() -> Self {
        Self {
            name: "X-LControl".to_string(),
            value: "x-no-cache".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 7 * 24 * 3600,
            quota_bytes: 5_242_880,
            key_prefix: "input:".to_string(),
            path: None,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            timeout_secs: 30,
        }
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::InvalidUrl(format!("{field} '{value}': {e}")))
}

impl SiteConfig {
    /// Parsed site root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `site_url` is not an absolute URL.
    pub fn site_url(&self) -> Result<Url> {
        parse_url("site_url", &self.site_url)
    }

    /// Parsed search endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `api_url` is not an absolute URL.
    pub fn api_url(&self) -> Result<Url> {
        parse_url("api_url", &self.api_url)
    }

    /// Search page URL for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `search_url` is not an absolute URL.
    pub fn search_page(&self, text: &str) -> Result<Url> {
        let mut url = parse_url("search_url", &self.search_url)?;
        url.query_pairs_mut().append_pair(&self.search_param, text);
        Ok(url)
    }
}

impl CacheConfig {
    /// Lifetime of a fetched result.
    pub fn max_age(&self) -> TimeDelta {
        i64::try_from(self.max_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Location of the cache file.
    ///
    /// `ANISUGGEST_DATA_DIR` takes precedence over `path`, which takes
    /// precedence over the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no location is configured and the platform data
    /// directory cannot be determined.
    pub fn store_path(&self) -> Result<PathBuf> {
        self.store_path_with(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    fn store_path_with(&self, data_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = data_dir {
            return Ok(dir.join(CACHE_FILE_NAME));
        }
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        project_dirs().map(|dirs| dirs.data_dir().join(CACHE_FILE_NAME))
    }
}

impl RequestConfig {
    /// Cool-down before dispatch.
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Per-request timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "anisuggest", "anisuggest")
        .ok_or_else(|| Error::Config("Failed to determine project directories".into()))
}

impl Config {
    /// Load configuration from `ANISUGGEST_CONFIG` or the default location.
    ///
    /// A missing file yields the defaults. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined (unsupported platform)
    /// - The config file exists but cannot be read or parsed
    /// - The configuration fails [`validate`](Self::validate)
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };

        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created, the
    /// configuration cannot be serialized, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Path of `config.toml` in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Check the configuration for values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable URL, an empty search parameter, a
    /// zero quota, or an invalid category registry.
    pub fn validate(&self) -> Result<()> {
        self.site.site_url()?;
        self.site.api_url()?;
        parse_url("search_url", &self.site.search_url)?;
        if self.site.search_param.is_empty() {
            return Err(Error::Config("site.search_param must not be empty".into()));
        }
        if self.cache.quota_bytes == 0 {
            return Err(Error::Config("cache.quota_bytes must be greater than zero".into()));
        }
        self.categories.validate()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.site.site_url, "https://anidb.net/");
        assert_eq!(config.cache.max_age(), TimeDelta::days(7));
        assert_eq!(config.cache.key_prefix, "input:");
        assert_eq!(config.request.debounce(), Duration::from_millis(200));
        assert_eq!(config.request.timeout(), Duration::from_secs(30));
        assert_eq!(config.categories.default_category(), "anime");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_page() {
        let url = Config::default().site.search_page("cowboy bebop").unwrap();
        assert_eq!(
            url.as_str(),
            "https://anidb.net/perl-bin/animedb.pl?show=search&do.search=search&adb.search=cowboy+bebop"
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            quota_bytes = 1024

            [categories]
            "" = "anime"
            c = "character"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.quota_bytes, 1024);
        assert_eq!(config.cache.key_prefix, "input:");
        assert_eq!(config.request.debounce_ms, 200);
        assert_eq!(config.categories.resolve("c"), Some("character"));
        assert_eq!(config.categories.resolve("s"), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.request.debounce_ms = 75;
        config.cache.path = Some(dir.path().join("store.json"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[site\nbroken").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Serialization(_))));

        fs::write(&path, "[cache]\nquota_bytes = 0").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        fs::write(&path, "[site]\napi_url = \"not a url\"").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::InvalidUrl(_))));

        fs::write(&path, "[categories]\nc = \"character\"").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_store_path_precedence() {
        let mut cache = CacheConfig::default();
        let data_dir = PathBuf::from("/tmp/anisuggest-data");

        let explicit = PathBuf::from("/tmp/explicit.json");
        cache.path = Some(explicit.clone());
        assert_eq!(cache.store_path_with(None).unwrap(), explicit);
        assert_eq!(
            cache.store_path_with(Some(data_dir.clone())).unwrap(),
            data_dir.join("cache.json")
        );
    }

    #[test]
    fn test_huge_max_age_saturates() {
        let cache = CacheConfig {
            max_age_secs: u64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(cache.max_age(), TimeDelta::MAX);
    }
}
