// Plugin system for plugdeck
//
// Installs extension packages through an external package manager, validates
// their manifests, and composes their command groups into the host command tree.

pub mod composer;
pub mod facility;
pub mod installer;
pub mod issues;
pub mod manifest;
pub mod redirector;
pub mod registry;
pub mod validator;

pub use composer::{CommandTreeComposer, ConflictCheck};
pub use facility::{PluginManagementFacility, PluginValidation, ValidationReport};
pub use installer::{NpmInstaller, PackageIdentity, PackageInstaller, PackageLocator};
pub use issues::{Issue, PluginIssueTracker, Severity};
pub use manifest::{CommandDefinition, ManifestLoader, PluginManifest, ProfileTypeDef};
pub use redirector::ModuleResolutionRedirector;
pub use registry::{PluginRecord, PluginRegistryStore, Registry};
pub use validator::{PluginStatus, ValidationEngine, ValidationStage};

use std::path::PathBuf;

/// Plugin errors
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Command `{command}` failed ({status}):\n{output}")]
    Install {
        command: String,
        status: String,
        output: String,
    },

    #[error("Failed to start package manager '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Module resolution redirect is already installed")]
    AlreadyInstalled,

    #[error("Module resolution redirect is not installed")]
    NotInstalled,

    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Invalid package locator: {0}")]
    InvalidLocator(String),

    #[error("Package manager did not report an installed version for '{package}':\n{output}")]
    VersionNotReported { package: String, output: String },

    #[error("Invalid package metadata: {0}")]
    InvalidPackageMetadata(String),
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;
