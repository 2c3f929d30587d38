//! Plugin management facility
//!
//! Entry point for everything plugin related: loading installed plugins into
//! the host command tree at startup, and the install/uninstall/update/list/
//! validate operations behind the `plugins` commands.

use super::composer::CommandTreeComposer;
use super::installer::{PackageInstaller, PackageLocator};
use super::issues::{Issue, PluginIssueTracker, Severity};
use super::manifest::ManifestLoader;
use super::redirector::ModuleResolutionRedirector;
use super::registry::{PluginRecord, PluginRegistryStore, Registry};
use super::validator::{PluginStatus, ValidationEngine, ValidationStage};
use super::{PluginError, PluginResult};
use crate::host::HostDefinition;
use crate::tree::CommandNode;
use std::path::Path;

/// Validation result for one plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginValidation {
    pub name: String,
    pub status: PluginStatus,
    pub issues: Vec<Issue>,
}

impl PluginValidation {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Validation results for a set of plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub plugins: Vec<PluginValidation>,
}

impl ValidationReport {
    pub fn get(&self, name: &str) -> Option<&PluginValidation> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn error_count(&self) -> usize {
        self.plugins.iter().map(|p| p.count(Severity::Error)).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.plugins.iter().map(|p| p.count(Severity::Warning)).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Whether the report passes under the given strictness
    pub fn is_success(&self, fail_on_error: bool, fail_on_warning: bool) -> bool {
        !(fail_on_error && self.error_count() > 0 || fail_on_warning && self.warning_count() > 0)
    }
}

/// A completed install together with the plugin's validation
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub record: PluginRecord,
    pub validation: ValidationReport,
}

/// Owns the plugin registry, installer, redirector, and issue tracker for one process
pub struct PluginManagementFacility {
    host: HostDefinition,
    store: PluginRegistryStore,
    installer: Box<dyn PackageInstaller>,
    default_registry: Option<String>,
    redirector: ModuleResolutionRedirector,
    tracker: PluginIssueTracker,
}

impl PluginManagementFacility {
    pub fn new(
        host: HostDefinition,
        store: PluginRegistryStore,
        installer: Box<dyn PackageInstaller>,
    ) -> Self {
        let redirector = ModuleResolutionRedirector::new(host.package_name.clone(), host.root.clone());
        Self {
            host,
            store,
            installer,
            default_registry: None,
            redirector,
            tracker: PluginIssueTracker::new(),
        }
    }

    /// Registry URL used when a command does not name one
    pub fn with_default_registry(mut self, registry: Option<String>) -> Self {
        self.default_registry = registry;
        self
    }

    pub fn host(&self) -> &HostDefinition {
        &self.host
    }

    pub fn issues(&self) -> &PluginIssueTracker {
        &self.tracker
    }

    pub fn registry_store(&self) -> &PluginRegistryStore {
        &self.store
    }

    /// Merge every installed plugin that validates into the host tree
    pub fn load_all(&mut self, host_tree: CommandNode) -> PluginResult<CommandNode> {
        let names = self.store.load()?.names();
        tracing::debug!("Loading {} installed plugin(s)", names.len());

        let mut tree = host_tree;
        let results = self.load_pass(&names, &mut tree)?;

        let accepted = results
            .iter()
            .filter(|r| r.status == PluginStatus::Accepted)
            .count();
        tracing::info!(
            "Loaded {} of {} plugin(s) into the command tree",
            accepted,
            results.len()
        );

        Ok(tree)
    }

    /// Validate one plugin, or all of them, against a fresh host tree
    pub fn validate(&mut self, name: Option<&str>) -> PluginResult<ValidationReport> {
        let plugins = self.store.load()?;
        let names = match name {
            Some(name) if !plugins.contains(name) => {
                return Err(PluginError::NotFound(name.to_string()));
            }
            Some(name) => vec![name.to_string()],
            None => plugins.names(),
        };

        let mut tree = self.host.command_tree();
        let results = self.load_pass(&names, &mut tree)?;
        Ok(ValidationReport { plugins: results })
    }

    /// Load plugins in order with module redirection active
    fn load_pass(
        &mut self,
        names: &[String],
        tree: &mut CommandNode,
    ) -> PluginResult<Vec<PluginValidation>> {
        let whitelist = self.host.redirect_whitelist();
        self.redirector.install(&whitelist)?;

        let mut known_profiles = self.host.profile_types.clone();
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let status = self.load_plugin(name, tree, &mut known_profiles);
            results.push(PluginValidation {
                name: name.clone(),
                status,
                issues: self.tracker.issues_for(name).to_vec(),
            });
        }

        self.redirector.teardown()?;
        Ok(results)
    }

    fn load_plugin(
        &mut self,
        name: &str,
        tree: &mut CommandNode,
        known_profiles: &mut Vec<String>,
    ) -> PluginStatus {
        tracing::debug!("Loading plugin '{}'", name);
        self.tracker.clear(name);

        let modules_dir = self.installer.modules_dir();
        let loader = ManifestLoader::new(
            &modules_dir,
            &self.host.package_name,
            &self.host.framework_package,
        );
        let Some(manifest) = loader.read_manifest(name, &mut self.tracker) else {
            tracing::warn!("Plugin '{}' has no usable manifest and was not loaded", name);
            return PluginStatus::Rejected;
        };

        let mut engine =
            ValidationEngine::new(name, &manifest.root, &mut self.tracker, &self.redirector);

        engine.enter(ValidationStage::StructuralCheck);
        engine.validate_manifest(&manifest);
        if let Some(definitions) = manifest.definitions.as_deref() {
            engine.validate_command_tree(definitions, 1);
        }

        let candidate = CommandTreeComposer::build_candidate(&manifest, &self.redirector);
        let conflict = CommandTreeComposer::detect_conflict(&candidate, tree);
        if conflict.has_conflict {
            engine.tracker().error(name, conflict.message);
        }

        // Grafted before the remaining stages; excised again if they fail
        let grafted =
            !engine.has_errors() && CommandTreeComposer::graft(tree, candidate, name, engine.tracker());

        engine.enter(ValidationStage::VersionCheck);
        engine.validate_version_compatibility(
            &self.host.package_name,
            manifest.host_version_range.as_deref(),
            &self.host.version,
        );

        engine.enter(ValidationStage::ProfileCheck);
        engine.validate_profiles(&manifest.profiles, known_profiles.as_slice());

        engine.enter(ValidationStage::FrameworkCheck);
        engine.validate_version_compatibility(
            &self.host.framework_package,
            manifest.framework_version_range.as_deref(),
            &self.host.framework_version,
        );

        let status = engine.finish();
        match status {
            PluginStatus::Accepted => {
                known_profiles.extend(
                    manifest
                        .profiles
                        .iter()
                        .filter_map(|p| p.type_name.clone()),
                );
                tracing::info!("Plugin '{}' loaded as '{}'", name, manifest.name);
            }
            PluginStatus::Rejected => {
                if grafted {
                    CommandTreeComposer::excise(tree, &manifest.name);
                }
                tracing::warn!(
                    "Plugin '{}' was not loaded: {} error(s)",
                    name,
                    self.tracker.count(name, Severity::Error)
                );
            }
        }
        status
    }

    /// Install packages and register them as plugins
    pub async fn install(
        &mut self,
        locators: &[String],
        registry: Option<&str>,
    ) -> PluginResult<Vec<InstallOutcome>> {
        let registry = self.resolve_registry(registry).await?;
        let mut outcomes = Vec::with_capacity(locators.len());
        for locator in locators {
            outcomes.push(self.install_and_validate(locator, &registry).await?);
        }
        Ok(outcomes)
    }

    /// Install every plugin listed in a file in registry format
    ///
    /// Each entry installs from its own registry unless `registry` is given.
    pub async fn install_from_file(
        &mut self,
        file: &Path,
        registry: Option<&str>,
    ) -> PluginResult<Vec<InstallOutcome>> {
        let contents = std::fs::read_to_string(file).map_err(|source| PluginError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let listed = Registry::from_json(file, &contents)?;
        self.install_records(listed, registry).await
    }

    /// Reinstall every registered plugin
    pub async fn reinstall_all(
        &mut self,
        registry: Option<&str>,
    ) -> PluginResult<Vec<InstallOutcome>> {
        let registered = self.store.load()?;
        self.install_records(registered, registry).await
    }

    async fn install_records(
        &mut self,
        records: Registry,
        registry: Option<&str>,
    ) -> PluginResult<Vec<InstallOutcome>> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records.all() {
            let registry = registry.unwrap_or(&record.registry);
            outcomes.push(
                self.install_and_validate(&record.package_locator, registry)
                    .await?,
            );
        }
        Ok(outcomes)
    }

    async fn install_and_validate(
        &mut self,
        locator: &str,
        registry: &str,
    ) -> PluginResult<InstallOutcome> {
        let record = self.install_one(locator, registry).await?;
        let validation = self.validate(Some(&record.name))?;
        Ok(InstallOutcome { record, validation })
    }

    async fn install_one(&mut self, locator: &str, registry: &str) -> PluginResult<PluginRecord> {
        let parsed = PackageLocator::parse(locator)?;
        // The package manager runs inside the install root, so relative locators are pinned here
        let locator = match &parsed {
            PackageLocator::Path(path) | PackageLocator::Archive(path) if is_relative(path) => {
                absolutize(path)?
            }
            PackageLocator::Url(url) if url.scheme() == "file" => {
                match locator.trim().strip_prefix("file:").map(Path::new) {
                    Some(path) if is_relative(path) => format!("file:{}", absolutize(path)?),
                    _ => locator.trim().to_string(),
                }
            }
            _ => locator.trim().to_string(),
        };

        self.installer.install(&locator, registry).await?;
        let identity = self.installer.resolve_locator(&locator).await?;

        // Registry installs are remembered by bare name so updates track the newest version
        let package_locator = match parsed {
            PackageLocator::Registry { name, .. } => name,
            _ => locator,
        };
        let record = PluginRecord::new(
            identity.name,
            package_locator,
            registry,
            identity.version,
        );

        let mut plugins = self.store.load()?;
        plugins.register(record.clone());
        self.store.save(&plugins)?;

        tracing::info!(
            "Installed plugin '{}' v{} from {}",
            record.name,
            record.version,
            record.package_locator
        );
        Ok(record)
    }

    /// Remove a plugin's package and its registry entry
    pub async fn uninstall(&mut self, name: &str) -> PluginResult<PluginRecord> {
        let mut plugins = self.store.load()?;
        if !plugins.contains(name) {
            return Err(PluginError::NotFound(name.to_string()));
        }

        self.installer.uninstall(name).await?;
        let record = plugins.remove(name)?;
        self.store.save(&plugins)?;
        self.tracker.clear(name);

        tracing::info!("Uninstalled plugin '{}'", name);
        Ok(record)
    }

    /// Update a plugin to its newest version, returning that version
    pub async fn update(&mut self, name: &str, registry: Option<&str>) -> PluginResult<String> {
        let mut plugins = self.store.load()?;
        let record = plugins
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        let registry = registry.unwrap_or(&record.registry).to_string();

        let version = match PackageLocator::parse(&record.package_locator) {
            Ok(PackageLocator::Registry { .. }) => self.installer.update(name, &registry).await?,
            _ => {
                self.installer
                    .install(&record.package_locator, &registry)
                    .await?;
                self.installer
                    .resolve_locator(&record.package_locator)
                    .await?
                    .version
            }
        };

        if let Some(entry) = plugins.get_mut(name) {
            entry.version = version.clone();
            entry.registry = registry;
        }
        self.store.save(&plugins)?;

        tracing::info!("Updated plugin '{}' to v{}", name, version);
        Ok(version)
    }

    /// Installed plugins in load order
    pub fn list(&self) -> PluginResult<Vec<PluginRecord>> {
        Ok(self.store.load()?.all().into_iter().cloned().collect())
    }

    async fn resolve_registry(&self, registry: Option<&str>) -> PluginResult<String> {
        if let Some(registry) = registry.or(self.default_registry.as_deref()) {
            return Ok(registry.to_string());
        }
        self.installer.default_registry().await
    }
}

fn is_relative(path: &Path) -> bool {
    path.is_relative() && !path.starts_with("~") && !path.starts_with("/")
}

fn absolutize(path: &Path) -> PluginResult<String> {
    std::path::absolute(path)
        .map(|absolute| absolute.display().to_string())
        .map_err(|source| PluginError::Io {
            path: path.to_path_buf(),
            source,
        })
}
