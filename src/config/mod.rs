//! Configuration system for plugdeck
//!
//! YAML configuration for the plugin facility: which package manager to run,
//! where plugins are installed, and how strict validation is.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use defaults::default_install_root;
pub use loader::ConfigLoader;
pub use schema::{Config, ValidationConfig};

use std::path::PathBuf;

/// Keys accepted by `config get` and `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "packageManager",
    "registry",
    "installRoot",
    "sharedModules",
    "validation.failOnWarning",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "packageManager" => Ok(config.package_manager.clone()),
        "registry" => Ok(config.registry.clone().unwrap_or_default()),
        "installRoot" => Ok(ConfigLoader::install_root(config).display().to_string()),
        "sharedModules" => Ok(config.shared_modules.join(",")),
        "validation.failOnWarning" => Ok(config.validation.fail_on_warning.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
///
/// An empty value resets optional keys to their default.
pub fn set_config_value(config: &mut schema::Config, key: &str, value: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    match key {
        "packageManager" => {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("packageManager must not be empty"));
            }
            config.package_manager = value.to_string();
        }
        "registry" => {
            if value.is_empty() {
                config.registry = None;
            } else {
                url::Url::parse(value)
                    .with_context(|| format!("registry '{}' is not a valid URL", value))?;
                config.registry = Some(value.to_string());
            }
        }
        "installRoot" => {
            if value.is_empty() {
                config.install_root = None;
            } else {
                let root = PathBuf::from(value);
                if !root.is_absolute() {
                    return Err(anyhow::anyhow!("installRoot must be an absolute path"));
                }
                config.install_root = Some(root);
            }
        }
        "sharedModules" => {
            // Parse as YAML array or comma-separated list
            config.shared_modules = if value.trim_start().starts_with('[') {
                serde_yaml::from_str(value).context(
                    "sharedModules must be a YAML array (e.g., ['@plugdeck/rest'])",
                )?
            } else {
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            };
        }
        "validation.failOnWarning" => {
            config.validation.fail_on_warning = value
                .parse()
                .context("validation.failOnWarning must be 'true' or 'false'")?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}
