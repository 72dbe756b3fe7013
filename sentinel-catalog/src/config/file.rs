//! Configuration file handling for `~/.sentinel-catalog/config.ini`.
//!
//! ```ini
//! [catalog]
//! base_url = https://apihub.copernicus.eu/apihub
//! odata_path = /odata/v1
//! username = alice
//! password = secret
//! timeout = 30
//!
//! [search]
//! page_size = 50
//! ```
//!
//! Missing keys keep their defaults; a missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::catalog::{CatalogConfig, Credentials, MAX_PAGE_SIZE};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to parse config text
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ini::ParseError),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings loaded from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub catalog: CatalogConfig,
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse_str(text: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(text)?;
        parse_ini(&ini)
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut catalog = CatalogConfig::default();

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim();
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid("catalog", "base_url", v, "must be an http(s) URL"));
            }
            catalog = catalog.with_base_url(v);
        }
        if let Some(v) = section.get("odata_path") {
            let v = v.trim();
            if !v.is_empty() && !v.starts_with('/') {
                return Err(invalid("catalog", "odata_path", v, "must start with '/'"));
            }
            catalog = catalog.with_odata_path(v);
        }
        if let Some(v) = section.get("timeout") {
            let secs: u64 = v
                .trim()
                .parse()
                .map_err(|_| invalid("catalog", "timeout", v, "expected seconds as an integer"))?;
            catalog = catalog.with_timeout(Duration::from_secs(secs));
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                catalog = catalog.with_user_agent(v);
            }
        }

        let username = section.get("username").map(str::trim).filter(|s| !s.is_empty());
        let password = section.get("password").map(str::trim).unwrap_or("");
        if let Some(username) = username {
            catalog = catalog.with_credentials(Credentials::new(username, password));
        }
    }

    // [search] section
    if let Some(section) = ini.section(Some("search")) {
        if let Some(v) = section.get("page_size") {
            let size: usize = v.trim().parse().map_err(|_| {
                invalid("search", "page_size", v, "expected a positive integer")
            })?;
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(invalid(
                    "search",
                    "page_size",
                    v,
                    &format!("must be between 1 and {}", MAX_PAGE_SIZE),
                ));
            }
            catalog = catalog.with_page_size(size);
        }
    }

    Ok(ConfigFile { catalog })
}

/// Get the path to the config directory (~/.sentinel-catalog).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sentinel-catalog")
}

/// Get the path to the config file (~/.sentinel-catalog/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
