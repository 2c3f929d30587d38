//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Package manager executable used to install plugins
    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    /// Registry URL used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Install prefix for plugin packages (defaults under the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_root: Option<PathBuf>,

    /// Extra packages whose module requests resolve into the host installation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_modules: Vec<String>,

    /// Plugin validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Plugin validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Treat warnings as failures in `plugins validate`
    #[serde(default)]
    pub fail_on_warning: bool,
}

fn default_package_manager() -> String {
    "npm".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_manager: default_package_manager(),
            registry: None,
            install_root: None,
            shared_modules: Vec::new(),
            validation: ValidationConfig::default(),
        }
    }
}
