//! Plugin registry
//!
//! Durable record of installed plugins, stored as a JSON object keyed by
//! plugin name:
//!
//! ```json
//! { "db": { "package": "@acme/db", "registry": "https://registry.npmjs.org/", "version": "1.2.0" } }
//! ```

use super::{PluginError, PluginResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One installed plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Plugin name (the registry key, not stored inside the entry)
    #[serde(skip)]
    pub name: String,

    /// Locator the package was installed from (registry name, path, URL or archive)
    #[serde(rename = "package")]
    pub package_locator: String,

    /// Registry URL used for the install
    pub registry: String,

    /// Installed version
    pub version: String,
}

impl PluginRecord {
    pub fn new(
        name: impl Into<String>,
        package_locator: impl Into<String>,
        registry: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package_locator: package_locator.into(),
            registry: registry.into(),
            version: version.into(),
        }
    }
}

/// In-memory view of the registry file
///
/// Plugins are kept in name order, which is also the order they load in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    plugins: BTreeMap<String, PluginRecord>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub fn register(&mut self, record: PluginRecord) {
        self.plugins.insert(record.name.clone(), record);
    }

    /// Get a record by plugin name
    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.plugins.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginRecord> {
        self.plugins.get_mut(name)
    }

    /// Get all records in load order
    pub fn all(&self) -> Vec<&PluginRecord> {
        self.plugins.values().collect()
    }

    /// Get plugin names in load order
    pub fn names(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Remove a record by plugin name
    pub fn remove(&mut self, name: &str) -> PluginResult<PluginRecord> {
        self.plugins
            .remove(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// Parse the registry file format
    pub fn from_json(path: &Path, contents: &str) -> PluginResult<Self> {
        let entries: BTreeMap<String, PluginRecord> =
            serde_json::from_str(contents).map_err(|source| PluginError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let plugins = entries
            .into_iter()
            .map(|(name, mut record)| {
                record.name = name.clone();
                (name, record)
            })
            .collect();

        Ok(Self { plugins })
    }

    /// Serialize to the registry file format
    pub fn to_json(&self) -> String {
        // BTreeMap<String, _> with plain string fields cannot fail to serialize
        serde_json::to_string_pretty(&self.plugins).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Reads and writes the registry file
#[derive(Debug, Clone)]
pub struct PluginRegistryStore {
    path: PathBuf,
}

impl PluginRegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, creating an empty file when none exists
    pub fn load(&self) -> PluginResult<Registry> {
        if !self.path.exists() {
            tracing::debug!("Registry file {:?} not found, initializing", self.path);
            let registry = Registry::new();
            self.save(&registry)?;
            return Ok(registry);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|source| PluginError::Io {
            path: self.path.clone(),
            source,
        })?;

        let registry = Registry::from_json(&self.path, &contents)?;
        tracing::debug!(
            "Loaded {} plugin record(s) from {:?}",
            registry.len(),
            self.path
        );
        Ok(registry)
    }

    /// Atomically replace the registry file
    pub fn save(&self, registry: &Registry) -> PluginResult<()> {
        let io_err = |source| PluginError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(io_err)?;

        let mut staged = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        staged
            .write_all(registry.to_json().as_bytes())
            .map_err(io_err)?;
        staged.flush().map_err(io_err)?;
        staged
            .persist(&self.path)
            .map_err(|persist| io_err(persist.error))?;

        tracing::debug!("Saved {} plugin record(s) to {:?}", registry.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str) -> PluginRecord {
        PluginRecord::new(name, name, "https://registry.npmjs.org/", "1.0.0")
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = Registry::new();
        registry.register(record("db"));

        let mut updated = record("db");
        updated.version = "2.0.0".to_string();
        registry.register(updated);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("db").unwrap().version, "2.0.0");
    }

    #[test]
    fn test_remove_record() {
        let mut registry = Registry::new();
        registry.register(record("db"));

        assert!(registry.remove("db").is_ok());
        assert!(registry.is_empty());

        let not_found = registry.remove("db");
        assert!(matches!(not_found, Err(PluginError::NotFound(name)) if name == "db"));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = Registry::new();
        registry.register(record("zos"));
        registry.register(record("cics"));
        registry.register(record("db"));

        assert_eq!(registry.names(), vec!["cics", "db", "zos"]);
    }

    #[test]
    fn test_missing_file_is_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plugins").join("plugins.json");
        let store = PluginRegistryStore::new(path.clone());

        let registry = store.load().unwrap();
        assert!(registry.is_empty());
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = PluginRegistryStore::new(temp_dir.path().join("plugins.json"));

        let mut registry = Registry::new();
        registry.register(record("db"));
        store.save(&registry).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, registry);
        assert_eq!(loaded.get("db").unwrap().name, "db");
    }

    #[test]
    fn test_file_uses_package_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plugins.json");
        let store = PluginRegistryStore::new(path.clone());

        let mut registry = Registry::new();
        registry.register(PluginRecord::new("db", "@acme/db", "https://r.example/", "1.2.0"));
        store.save(&registry).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["db"]["package"], "@acme/db");
        assert_eq!(raw["db"]["registry"], "https://r.example/");
        assert_eq!(raw["db"]["version"], "1.2.0");
        assert!(raw["db"].get("name").is_none());
    }

    #[test]
    fn test_unparseable_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plugins.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = PluginRegistryStore::new(path).load();
        assert!(matches!(result, Err(PluginError::Parse { .. })));
    }
}
