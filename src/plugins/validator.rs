//! Plugin validation
//!
//! Checks a plugin's manifest, command definitions, profile types, and peer
//! dependency ranges. Findings are recorded in the issue tracker instead of
//! returned, so every stage runs and the full list of problems is reported.

use super::issues::PluginIssueTracker;
use super::manifest::{CommandDefinition, PluginManifest, ProfileTypeDef};
use super::redirector::ModuleResolutionRedirector;
use semver::{Version, VersionReq};
use std::fmt;
use std::path::Path;

/// Validation progress for one plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Loading,
    StructuralCheck,
    VersionCheck,
    ProfileCheck,
    FrameworkCheck,
    Done,
}

/// Terminal validation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Accepted,
    Rejected,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginStatus::Accepted => write!(f, "accepted"),
            PluginStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Validates one plugin, recording findings against it
pub struct ValidationEngine<'a> {
    plugin: &'a str,
    root: &'a Path,
    tracker: &'a mut PluginIssueTracker,
    redirector: &'a ModuleResolutionRedirector,
    stage: ValidationStage,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(
        plugin: &'a str,
        root: &'a Path,
        tracker: &'a mut PluginIssueTracker,
        redirector: &'a ModuleResolutionRedirector,
    ) -> Self {
        Self {
            plugin,
            root,
            tracker,
            redirector,
            stage: ValidationStage::Loading,
        }
    }

    pub fn stage(&self) -> ValidationStage {
        self.stage
    }

    /// Move to the next stage
    pub fn enter(&mut self, stage: ValidationStage) {
        tracing::debug!("Plugin '{}': {:?} -> {:?}", self.plugin, self.stage, stage);
        self.stage = stage;
    }

    /// Tracker the engine records into
    pub fn tracker(&mut self) -> &mut PluginIssueTracker {
        &mut *self.tracker
    }

    /// Whether any blocking error has been recorded so far
    pub fn has_errors(&self) -> bool {
        self.tracker.has_errors(self.plugin)
    }

    /// Check the top-level properties of the extension block
    pub fn validate_manifest(&mut self, manifest: &PluginManifest) {
        if manifest
            .root_command_description
            .as_deref()
            .is_none_or(|d| d.trim().is_empty())
        {
            self.tracker.error(
                self.plugin,
                "The plugin does not define a 'rootCommandDescription' property",
            );
        }

        match manifest.health_check.as_deref() {
            None => self.tracker.warning(
                self.plugin,
                "The plugin does not define a 'pluginHealthCheck' property, so its health cannot be checked",
            ),
            Some(health_check) => {
                if self.redirector.locate(self.root, health_check).is_none() {
                    self.tracker.error(
                        self.plugin,
                        format!(
                            "The pluginHealthCheck file '{}' does not exist in {}",
                            health_check,
                            self.root.display()
                        ),
                    );
                }
            }
        }

        match manifest.definitions.as_deref() {
            None => self.tracker.error(
                self.plugin,
                "The plugin does not define a 'definitions' property, so it contributes no commands",
            ),
            Some([]) => self.tracker.error(
                self.plugin,
                "The plugin's 'definitions' property is empty, so it contributes no commands",
            ),
            Some(_) => {}
        }
    }

    /// Recursively check command definitions, starting at `depth` 1 for top-level definitions
    pub fn validate_command_tree(&mut self, nodes: &[CommandDefinition], depth: usize) {
        for (index, node) in nodes.iter().enumerate() {
            let label = match node.name.as_deref() {
                Some(name) => format!("'{}'", name),
                None => {
                    self.tracker.error(
                        self.plugin,
                        format!(
                            "Command definition #{} at depth {} has no 'name' property",
                            index + 1,
                            depth
                        ),
                    );
                    format!("#{}", index + 1)
                }
            };

            if node.description.is_none() {
                self.tracker.error(
                    self.plugin,
                    format!(
                        "Command {} at depth {} has no 'description' property",
                        label, depth
                    ),
                );
            }

            let Some(kind) = node.kind.as_deref() else {
                self.tracker.error(
                    self.plugin,
                    format!("Command {} at depth {} has no 'type' property", label, depth),
                );
                continue;
            };

            match kind {
                "command" => self.validate_handler(node, &label, depth),
                "group" => match node.children.as_deref() {
                    Some(children) if !children.is_empty() => {
                        self.validate_command_tree(children, depth + 1);
                    }
                    _ => self.tracker.error(
                        self.plugin,
                        format!(
                            "Group {} at depth {} has no children. A group needs a 'children' property with at least one command or group",
                            label, depth
                        ),
                    ),
                },
                other => self.tracker.error(
                    self.plugin,
                    format!(
                        "Command {} at depth {} has unknown type '{}' (expected 'command' or 'group')",
                        label, depth, other
                    ),
                ),
            }
        }
    }

    fn validate_handler(&mut self, node: &CommandDefinition, label: &str, depth: usize) {
        match node.handler.as_deref() {
            None => self.tracker.error(
                self.plugin,
                format!(
                    "Command {} at depth {} has no 'handler' property",
                    label, depth
                ),
            ),
            Some(handler) => {
                if self.redirector.locate(self.root, handler).is_none() {
                    self.tracker.error(
                        self.plugin,
                        format!(
                            "The handler '{}' for command {} does not exist in {}",
                            handler,
                            label,
                            self.root.display()
                        ),
                    );
                }
            }
        }
    }

    /// Check profile types for duplicates within the plugin and against known types
    pub fn validate_profiles(&mut self, plugin_profiles: &[ProfileTypeDef], host_profiles: &[String]) {
        for (index, profile) in plugin_profiles.iter().enumerate() {
            if profile.type_name.is_none() {
                self.tracker.error(
                    self.plugin,
                    format!("The profile definition at index {} has no 'type' property", index),
                );
            }
        }

        for (i, first) in plugin_profiles.iter().enumerate() {
            let Some(first_type) = first.type_name.as_deref() else {
                continue;
            };
            for (j, second) in plugin_profiles.iter().enumerate().skip(i + 1) {
                if second.type_name.as_deref() == Some(first_type) {
                    self.tracker.error(
                        self.plugin,
                        format!(
                            "The profile type '{}' is defined at index {} and again at index {}. Profile types must be unique",
                            first_type, i, j
                        ),
                    );
                }
            }
        }

        for profile in plugin_profiles {
            let Some(type_name) = profile.type_name.as_deref() else {
                continue;
            };
            if host_profiles.iter().any(|existing| existing == type_name) {
                self.tracker.error(
                    self.plugin,
                    format!(
                        "The profile type '{}' conflicts with a profile type already defined by the host or another plugin",
                        type_name
                    ),
                );
            }
        }
    }

    /// Warn when a declared peer dependency range does not admit the installed version
    pub fn validate_version_compatibility(
        &mut self,
        property: &str,
        declared_range: Option<&str>,
        actual_version: &str,
    ) {
        let Some(range) = declared_range else {
            return;
        };

        match version_satisfies(range, actual_version) {
            Ok(true) => {}
            Ok(false) => self.tracker.warning(
                self.plugin,
                format!(
                    "The plugin's peer dependency '{}' requires version '{}', but the installed version is '{}'. The plugin may not be compatible",
                    property, range, actual_version
                ),
            ),
            Err(reason) => self.tracker.warning(
                self.plugin,
                format!(
                    "The plugin's peer dependency '{}' declares '{}', which cannot be checked against the installed version '{}': {}",
                    property, range, actual_version, reason
                ),
            ),
        }
    }

    /// Finish validation and decide whether the plugin is loaded
    pub fn finish(mut self) -> PluginStatus {
        self.enter(ValidationStage::Done);
        let status = if self.has_errors() {
            PluginStatus::Rejected
        } else {
            PluginStatus::Accepted
        };
        tracing::debug!("Plugin '{}' {}", self.plugin, status);
        status
    }
}

/// Evaluate an npm-style range (`^1.0.0`, `>=1.2 <2`, `1.0.0 - 2.0.0`, `a || b`) against a version
pub fn version_satisfies(range: &str, version: &str) -> Result<bool, String> {
    let version = Version::parse(version.trim())
        .map_err(|e| format!("invalid version '{}': {}", version, e))?;

    for alternative in range.split("||") {
        if parse_npm_range(alternative)?.matches(&version) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn parse_npm_range(range: &str) -> Result<VersionReq, String> {
    let range = range.trim();
    if range.is_empty() || range == "*" || range.eq_ignore_ascii_case("x") {
        return Ok(VersionReq::STAR);
    }

    let normalized = match range.split_once(" - ") {
        Some((low, high)) => format!(">={}, <={}", low.trim(), high.trim()),
        None => {
            let mut comparators: Vec<String> = Vec::new();
            let mut pending_op = String::new();
            for token in range.split_whitespace() {
                if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                    pending_op.push_str(token);
                    continue;
                }
                let comparator = format!("{}{}", std::mem::take(&mut pending_op), token);
                comparators.push(normalize_bare(&comparator));
            }
            comparators.join(", ")
        }
    };

    VersionReq::parse(&normalized).map_err(|e| format!("invalid range '{}': {}", range, e))
}

/// Rewrite a bare npm version into the comparator npm means by it
///
/// A full version is an exact match and a partial one is an X-range; the
/// semver crate would read both as caret requirements.
fn normalize_bare(comparator: &str) -> String {
    let comparator = comparator.strip_prefix('v').unwrap_or(comparator);
    if !comparator.starts_with(|c: char| c.is_ascii_digit()) {
        return comparator.to_string();
    }

    // Build metadata never affects matching
    let comparator = comparator.split('+').next().unwrap_or(comparator);

    let core = comparator
        .split('-')
        .next()
        .unwrap_or(comparator);
    if core.contains(['x', 'X', '*']) {
        return comparator.to_string();
    }

    let parts = match core
        .split('.')
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(parts) => parts,
        Err(_) => return comparator.to_string(),
    };
    match parts.as_slice() {
        [major] => format!(">={}.0.0, <{}.0.0", major, major + 1),
        [major, minor] => format!(">={}.{}.0, <{}.{}.0", major, minor, major, minor + 1),
        _ => format!("={}", comparator),
    }
}
