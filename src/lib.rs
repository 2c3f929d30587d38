//! plugdeck library
//!
//! Plugin lifecycle and command-tree composition for modular command-line
//! applications. Used by the `plugdeck` binary and by the integration tests.

pub mod cli;
pub mod config;
pub mod host;
pub mod plugins;
pub mod tree;

// Re-export commonly used types for convenience
pub use host::HostDefinition;
pub use plugins::{PluginError, PluginManagementFacility, PluginResult};
pub use tree::{CommandNode, Handler};
