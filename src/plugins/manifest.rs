//! Plugin manifest schema
//!
//! A plugin is a package whose `package.json` carries a `plugdeck` block
//! describing the command group it contributes:
//!
//! ```json
//! {
//!   "name": "@acme/plugdeck-db",
//!   "version": "1.2.0",
//!   "peerDependencies": { "plugdeck": "^0.1.0" },
//!   "plugdeck": {
//!     "name": "db",
//!     "rootCommandDescription": "Database commands",
//!     "pluginHealthCheck": "./lib/healthCheck.js",
//!     "definitions": [
//!       { "name": "query", "type": "command", "description": "Run a query", "handler": "./lib/query.js" }
//!     ],
//!     "profiles": [{ "type": "db", "schema": {} }]
//!   }
//! }
//! ```
//!
//! Every field of the block is optional at this layer so validation can report
//! each missing piece instead of failing the whole parse.

use super::issues::PluginIssueTracker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Key of the extension block inside `package.json`
pub const EXTENSION_KEY: &str = "plugdeck";

/// The subset of `package.json` the loader reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub peer_dependencies: HashMap<String, String>,
    #[serde(rename = "plugdeck")]
    pub extension: Option<ExtensionConfig>,
}

/// The `plugdeck` block as written by plugin authors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    pub name: Option<String>,
    pub root_command_description: Option<String>,
    pub definitions: Option<Vec<CommandDefinition>>,
    #[serde(default)]
    pub profiles: Vec<ProfileTypeDef>,
    pub plugin_health_check: Option<String>,
    #[serde(default)]
    pub plugin_aliases: Vec<String>,
    pub plugin_summary: Option<String>,
}

/// A command or group as declared in the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: Option<String>,

    /// `command` or `group`
    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub aliases: Vec<String>,

    pub summary: Option<String>,

    /// Handler module, relative to the plugin root (commands only)
    pub handler: Option<String>,

    /// Nested definitions (groups only)
    pub children: Option<Vec<CommandDefinition>>,
}

impl CommandDefinition {
    pub fn command(name: &str, description: &str, handler: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some("command".to_string()),
            description: Some(description.to_string()),
            handler: Some(handler.to_string()),
            ..Default::default()
        }
    }

    pub fn group(name: &str, description: &str, children: Vec<CommandDefinition>) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some("group".to_string()),
            description: Some(description.to_string()),
            children: Some(children),
            ..Default::default()
        }
    }
}

/// A profile type contributed by a plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTypeDef {
    #[serde(rename = "type")]
    pub type_name: Option<String>,

    #[serde(default)]
    pub schema: serde_json::Value,
}

impl ProfileTypeDef {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            schema: serde_json::Value::Null,
        }
    }
}

/// A plugin's extension block, resolved against its installed location
#[derive(Debug, Clone, Default)]
pub struct PluginManifest {
    /// Top-level command group name
    pub name: String,
    /// Registry name the plugin was loaded under
    pub plugin: String,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    /// Installed package directory
    pub root: PathBuf,
    pub root_command_description: Option<String>,
    pub definitions: Option<Vec<CommandDefinition>>,
    pub profiles: Vec<ProfileTypeDef>,
    pub health_check: Option<String>,
    pub aliases: Vec<String>,
    pub summary: Option<String>,
    /// Peer dependency range declared for the host package
    pub host_version_range: Option<String>,
    /// Peer dependency range declared for the framework package
    pub framework_version_range: Option<String>,
}

/// Reads plugin manifests out of the install location
pub struct ManifestLoader<'a> {
    modules_dir: &'a Path,
    host_package: &'a str,
    framework_package: &'a str,
}

impl<'a> ManifestLoader<'a> {
    pub fn new(modules_dir: &'a Path, host_package: &'a str, framework_package: &'a str) -> Self {
        Self {
            modules_dir,
            host_package,
            framework_package,
        }
    }

    /// Installed directory of a plugin
    pub fn plugin_root(&self, plugin: &str) -> PathBuf {
        self.modules_dir.join(plugin)
    }

    /// Read a plugin's manifest, recording an error and returning `None` when it is unusable
    pub fn read_manifest(
        &self,
        plugin: &str,
        tracker: &mut PluginIssueTracker,
    ) -> Option<PluginManifest> {
        let root = self.plugin_root(plugin);
        tracing::debug!("Reading manifest for plugin '{}' from {:?}", plugin, root);

        if !root.is_dir() {
            tracker.error(
                plugin,
                format!(
                    "The plugin's install location does not exist: {}",
                    root.display()
                ),
            );
            return None;
        }

        let package_path = root.join("package.json");
        let contents = match std::fs::read_to_string(&package_path) {
            Ok(contents) => contents,
            Err(e) => {
                tracker.error(
                    plugin,
                    format!(
                        "Cannot read the plugin's package manifest {}: {}",
                        package_path.display(),
                        e
                    ),
                );
                return None;
            }
        };

        let package: PackageJson = match serde_json::from_str(&contents) {
            Ok(package) => package,
            Err(e) => {
                tracker.error(
                    plugin,
                    format!(
                        "The plugin's package manifest {} is not valid: {}",
                        package_path.display(),
                        e
                    ),
                );
                return None;
            }
        };

        self.from_package(plugin, root, package, tracker)
    }

    /// Build a manifest from an already parsed `package.json`
    pub fn from_package(
        &self,
        plugin: &str,
        root: PathBuf,
        package: PackageJson,
        tracker: &mut PluginIssueTracker,
    ) -> Option<PluginManifest> {
        let Some(extension) = package.extension else {
            tracker.error(
                plugin,
                format!(
                    "The plugin's package.json has no '{}' property, so it is not a plugdeck plugin",
                    EXTENSION_KEY
                ),
            );
            return None;
        };

        let Some(name) = extension.name.clone().or_else(|| package.name.clone()) else {
            tracker.error(
                plugin,
                format!(
                    "The plugin defines no 'name' in its '{}' block and its package.json has no 'name' property",
                    EXTENSION_KEY
                ),
            );
            return None;
        };

        Some(PluginManifest {
            name,
            plugin: plugin.to_string(),
            host_version_range: package.peer_dependencies.get(self.host_package).cloned(),
            framework_version_range: package
                .peer_dependencies
                .get(self.framework_package)
                .cloned(),
            package_name: package.name,
            package_version: package.version,
            root,
            root_command_description: extension.root_command_description,
            definitions: extension.definitions,
            profiles: extension.profiles,
            health_check: extension.plugin_health_check,
            aliases: extension.plugin_aliases,
            summary: extension.plugin_summary,
        })
    }
}
