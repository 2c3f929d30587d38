//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod config;
mod logging;
pub mod plugin;
mod tree;
mod version;

pub use config::{handle_config_command, ConfigSubcommand};
pub use logging::*;
pub use plugin::{build_facility, handle_plugin_command, PluginSubcommand};
pub use tree::display_tree;
pub use version::display_version;
