//! Shared fixtures for plugin integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use plugdeck::plugins::installer::{parse_installed_version, read_package_identity};
use plugdeck::plugins::{
    PackageIdentity, PackageInstaller, PluginError, PluginRegistryStore, PluginResult,
};
use plugdeck::{HostDefinition, PluginManagementFacility};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const REGISTRY: &str = "https://registry.npmjs.org/";

/// Installer that copies package directories instead of running a package manager
pub struct FakeInstaller {
    modules_dir: PathBuf,
    /// Packages installable by name, as if published to a registry
    published: Mutex<HashMap<String, PathBuf>>,
}

impl FakeInstaller {
    pub fn new(modules_dir: PathBuf) -> Self {
        Self {
            modules_dir,
            published: Mutex::new(HashMap::new()),
        }
    }

    pub fn publish(&self, name: &str, source: PathBuf) {
        self.published
            .lock()
            .unwrap()
            .insert(name.to_string(), source);
    }

    fn source_for(&self, locator: &str) -> Option<PathBuf> {
        let path = Path::new(locator);
        if path.is_dir() {
            return Some(path.to_path_buf());
        }
        let name = registry_name(locator);
        self.published.lock().unwrap().get(name).cloned()
    }

    fn copy_in(&self, locator: &str) -> PluginResult<PackageIdentity> {
        let source = self.source_for(locator).ok_or_else(|| PluginError::Install {
            command: format!("npm install {}", locator),
            status: "exit status: 1".to_string(),
            output: format!("404 Not Found - {}", locator),
        })?;
        let identity = read_package_identity(&source)?;
        let target = self.modules_dir.join(&identity.name);
        if target.exists() {
            std::fs::remove_dir_all(&target).unwrap();
        }
        copy_dir(&source, &target);
        Ok(identity)
    }
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    fn modules_dir(&self) -> PathBuf {
        self.modules_dir.clone()
    }

    async fn resolve_locator(&self, locator: &str) -> PluginResult<PackageIdentity> {
        match self.source_for(locator) {
            Some(source) => read_package_identity(&source),
            None => Err(PluginError::NotFound(locator.to_string())),
        }
    }

    async fn install(&self, locator: &str, _registry: &str) -> PluginResult<String> {
        let identity = self.copy_in(locator)?;
        Ok(format!("+ {}@{}\nadded 1 package", identity.name, identity.version))
    }

    async fn uninstall(&self, name: &str) -> PluginResult<()> {
        let target = self.modules_dir.join(name);
        if target.exists() {
            std::fs::remove_dir_all(&target).unwrap();
        }
        Ok(())
    }

    async fn update(&self, name: &str, registry: &str) -> PluginResult<String> {
        let output = self.install(name, registry).await?;
        parse_installed_version(&output, name).ok_or(PluginError::VersionNotReported {
            package: name.to_string(),
            output,
        })
    }

    async fn default_registry(&self) -> PluginResult<String> {
        Ok(REGISTRY.to_string())
    }
}

fn registry_name(locator: &str) -> &str {
    // "@scope/name@1.0.0" keeps its leading '@'
    let start = usize::from(locator.starts_with('@'));
    match locator[start..].find('@') {
        Some(index) => &locator[..start + index],
        None => locator,
    }
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// A scratch data directory with plugin sources, an install root, and a registry file
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.dir.path().join("installed/lib/node_modules")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.path().join("plugins/plugins.json")
    }

    pub fn store(&self) -> PluginRegistryStore {
        PluginRegistryStore::new(self.registry_path())
    }

    pub fn host(&self, version: &str) -> HostDefinition {
        let mut host = HostDefinition::builtin(self.dir.path().join("host"));
        host.version = version.to_string();
        host
    }

    pub fn facility(&self, host_version: &str) -> PluginManagementFacility {
        self.facility_with(host_version, FakeInstaller::new(self.modules_dir()))
    }

    pub fn facility_with(
        &self,
        host_version: &str,
        installer: FakeInstaller,
    ) -> PluginManagementFacility {
        PluginManagementFacility::new(self.host(host_version), self.store(), Box::new(installer))
    }

    /// Write a plugin package source under `sources/<dir_name>`, with a handler file per command
    pub fn write_source(&self, dir_name: &str, package: &Value) -> PathBuf {
        let root = self.dir.path().join("sources").join(dir_name);
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("lib/handler.js"), "module.exports = {};").unwrap();
        std::fs::write(root.join("lib/healthCheck.js"), "module.exports = {};").unwrap();
        std::fs::write(
            root.join("package.json"),
            serde_json::to_string_pretty(package).unwrap(),
        )
        .unwrap();
        root
    }
}

/// A plugin package.json contributing `group` with one command per name
pub fn plugin_package(package: &str, group: &str, commands: &[&str]) -> Value {
    let definitions: Vec<Value> = commands
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "type": "command",
                "description": format!("Run {}", name),
                "handler": "./lib/handler"
            })
        })
        .collect();

    json!({
        "name": package,
        "version": "1.0.0",
        "plugdeck": {
            "name": group,
            "rootCommandDescription": format!("{} commands", group),
            "definitions": definitions
        }
    })
}
