//! Configuration for the catalog client.
//!
//! [`CatalogConfig`] is the explicit settings struct handed to the
//! transport; [`ConfigFile`] loads it from an INI file.

mod catalog;
mod file;

pub use catalog::{
    CatalogConfig, Credentials, DEFAULT_BASE_URL, DEFAULT_ODATA_PATH, DEFAULT_PAGE_SIZE,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, MAX_PAGE_SIZE,
};
pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
