//! Plugin issue tracking
//!
//! Collects validation findings per plugin. Issues are data, not errors: the
//! orchestrator reads them to decide whether a plugin is loaded.

use std::collections::BTreeMap;
use std::fmt;

/// Severity of a plugin issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Excludes the plugin from the command tree
    Error,
    /// Reported, but the plugin still loads
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A single diagnostic recorded against a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub plugin: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*** {}: {}", self.severity, self.message)
    }
}

/// Accumulates issues for every plugin seen during a load or validation pass
#[derive(Debug, Default)]
pub struct PluginIssueTracker {
    issues: BTreeMap<String, Vec<Issue>>,
}

impl PluginIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue for a plugin
    pub fn record(&mut self, plugin: &str, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => tracing::debug!("Plugin '{}' error: {}", plugin, message),
            Severity::Warning => tracing::debug!("Plugin '{}' warning: {}", plugin, message),
        }
        self.issues
            .entry(plugin.to_string())
            .or_default()
            .push(Issue {
                plugin: plugin.to_string(),
                severity,
                message,
            });
    }

    pub fn error(&mut self, plugin: &str, message: impl Into<String>) {
        self.record(plugin, Severity::Error, message);
    }

    pub fn warning(&mut self, plugin: &str, message: impl Into<String>) {
        self.record(plugin, Severity::Warning, message);
    }

    /// Forget everything recorded for a plugin (called when it starts loading)
    pub fn clear(&mut self, plugin: &str) {
        self.issues.remove(plugin);
    }

    /// Issues recorded for a plugin, in recording order
    pub fn issues_for(&self, plugin: &str) -> &[Issue] {
        self.issues.get(plugin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a plugin has at least one blocking error
    pub fn has_errors(&self, plugin: &str) -> bool {
        self.count(plugin, Severity::Error) > 0
    }

    pub fn has_warnings(&self, plugin: &str) -> bool {
        self.count(plugin, Severity::Warning) > 0
    }

    /// Number of issues of a severity recorded for a plugin
    pub fn count(&self, plugin: &str, severity: Severity) -> usize {
        self.issues_for(plugin)
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// Names of plugins that have any issue
    pub fn plugins(&self) -> Vec<&str> {
        self.issues.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.values().all(Vec::is_empty)
    }
}
