//! Configuration loading
//!
//! Handles loading configuration from its sources and applying them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers applied
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Config> {
        let root_path = paths::root_config_path();
        let config = if root_path.exists() {
            Self::load_file(&root_path)?
        } else {
            Self::load_defaults()
        };

        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the root configuration file, if there is one
    ///
    /// Fails on unreadable files, invalid YAML, wrong value types, or values
    /// the plugin facility cannot use.
    pub fn validate() -> Result<()> {
        let root_path = paths::root_config_path();
        if root_path.exists() {
            let config = Self::load_file(&root_path)?;
            Self::check(&config)
                .with_context(|| format!("Invalid configuration in {}", root_path.display()))?;
        }

        let merged = Self::load().context("Failed to load merged configuration")?;
        Self::check(&merged).context("Invalid configuration after environment overrides")?;

        Ok(())
    }

    /// Check values serde cannot check on its own
    pub fn check(config: &Config) -> Result<()> {
        if config.package_manager.trim().is_empty() {
            return Err(anyhow::anyhow!("packageManager must not be empty"));
        }

        if let Some(registry) = &config.registry {
            url::Url::parse(registry)
                .with_context(|| format!("registry '{}' is not a valid URL", registry))?;
        }

        if let Some(root) = &config.install_root {
            if !root.is_absolute() {
                return Err(anyhow::anyhow!(
                    "installRoot must be an absolute path, got '{}'",
                    root.display()
                ));
            }
        }

        if let Some(blank) = config.shared_modules.iter().position(|m| m.trim().is_empty()) {
            return Err(anyhow::anyhow!("sharedModules[{}] is empty", blank));
        }

        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config) -> Config {
        // PLUGDECK_PACKAGE_MANAGER override
        if let Ok(program) = std::env::var("PLUGDECK_PACKAGE_MANAGER") {
            if !program.is_empty() {
                config.package_manager = program;
            }
        }

        // PLUGDECK_REGISTRY override
        if let Ok(registry) = std::env::var("PLUGDECK_REGISTRY") {
            if !registry.is_empty() {
                config.registry = Some(registry);
            }
        }

        config
    }

    /// Install prefix for plugin packages
    pub fn install_root(config: &Config) -> PathBuf {
        config
            .install_root
            .clone()
            .unwrap_or_else(defaults::default_install_root)
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}
