//! Default configuration values
//!
//! Provides default configuration instances and helper functions.

use super::paths;
use super::schema::Config;
use std::path::PathBuf;

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Install prefix used when `installRoot` is not configured
pub fn default_install_root() -> PathBuf {
    paths::plugins_dir().join("installed")
}
