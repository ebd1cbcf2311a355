//! Config file parsing for `~/.config/bookshelf/config.toml`, with environment overrides.
//!
//! Environment variables win over the file:
//! - `BOOK_SUBSCRIBER_ENABLED`: `true` enables cover enrichment; anything else disables it
//! - `REDIS_URL`: broker URL for the cover channel
//! - `BOOKSHELF_LOOKUP_TIMEOUT_SECS`: per-request timeout for catalog calls
//! - `GOOGLE_BOOKS_API_KEY`: optional Google Books API key

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::redis::DEFAULT_URL;
use crate::error::ConfigError;
use crate::lookup::{googlebooks, openlibrary, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cover: CoverConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Master switch for the cover pipeline (publish and subscribe).
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_redis_url() -> String {
    DEFAULT_URL.to_string()
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: default_redis_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_openlibrary_url")]
    pub openlibrary_url: String,
    #[serde(default = "default_covers_url")]
    pub covers_url: String,
    #[serde(default = "default_google_books_url")]
    pub google_books_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_books_api_key: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_openlibrary_url() -> String {
    openlibrary::BASE_URL.to_string()
}
fn default_covers_url() -> String {
    openlibrary::COVERS_URL.to_string()
}
fn default_google_books_url() -> String {
    googlebooks::BASE_URL.to_string()
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            openlibrary_url: default_openlibrary_url(),
            covers_url: default_covers_url(),
            google_books_url: default_google_books_url(),
            google_books_api_key: None,
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl AppConfig {
    /// Default config file, then environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(config_path().as_deref(), |key| std::env::var(key).ok())
    }

    /// Read `path` if it exists, then apply overrides. A file that exists but does not parse is an error.
    pub fn load<F>(path: Option<&Path>, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match path {
            Some(path) if path.exists() => load_config_from(path)?,
            _ => AppConfig::default(),
        };
        cfg.apply_overrides(var)?;
        Ok(cfg)
    }

    /// Apply overrides from any key/value source (the process environment in production).
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("BOOK_SUBSCRIBER_ENABLED") {
            self.cover.enabled = v.trim() == "true";
        }
        if let Some(v) = var("REDIS_URL").filter(|v| !v.is_empty()) {
            self.cover.redis_url = v;
        }
        if let Some(v) = var("BOOKSHELF_LOOKUP_TIMEOUT_SECS") {
            self.lookup.timeout_secs = v.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "BOOKSHELF_LOOKUP_TIMEOUT_SECS".to_string(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(v) = var("GOOGLE_BOOKS_API_KEY").filter(|v| !v.is_empty()) {
            self.lookup.google_books_api_key = Some(v);
        }
        Ok(())
    }
}

/// Load config from the default path. A missing file yields defaults; a broken one is an error.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    match config_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Ok(AppConfig::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("bookshelf");
        p.push("config.toml");
        p
    })
}
