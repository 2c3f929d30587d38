//! Host CLI description
//!
//! Everything the plugin facility needs to know about the application it is
//! extending: package identity for peer dependency checks, the built-in profile
//! types, and the built-in command tree plugins are merged into.

use crate::tree::{CommandNode, Handler};
use std::path::PathBuf;

/// Package name plugins declare a peer dependency on for the host CLI
pub const HOST_PACKAGE: &str = "plugdeck";

/// Package name plugins declare a peer dependency on for the framework
pub const FRAMEWORK_PACKAGE: &str = "@plugdeck/core";

/// Profile types the host defines itself
pub const HOST_PROFILE_TYPES: &[&str] = &["base"];

/// Identity and built-in surface of the host CLI
#[derive(Debug, Clone)]
pub struct HostDefinition {
    pub package_name: String,
    pub version: String,
    pub framework_package: String,
    pub framework_version: String,
    /// Where the host's own modules live (target of module redirection)
    pub root: PathBuf,
    pub profile_types: Vec<String>,
    /// Extra packages shared with plugins besides the host and framework
    pub shared_modules: Vec<String>,
}

impl HostDefinition {
    /// The plugdeck binary as host
    pub fn builtin(root: PathBuf) -> Self {
        Self {
            package_name: HOST_PACKAGE.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            framework_package: FRAMEWORK_PACKAGE.to_string(),
            framework_version: env!("CARGO_PKG_VERSION").to_string(),
            root,
            profile_types: HOST_PROFILE_TYPES.iter().map(|t| t.to_string()).collect(),
            shared_modules: Vec::new(),
        }
    }

    /// Package names whose module requests resolve into the host installation
    pub fn redirect_whitelist(&self) -> Vec<String> {
        let mut whitelist = vec![self.package_name.clone(), self.framework_package.clone()];
        for module in &self.shared_modules {
            if !whitelist.contains(module) {
                whitelist.push(module.clone());
            }
        }
        whitelist
    }

    /// A freshly resolved copy of the host's own command tree
    pub fn command_tree(&self) -> CommandNode {
        let builtin = |id: &str| Handler::Builtin(id.to_string());

        CommandNode::group(
            &self.package_name,
            "Extensible command-line interface",
            vec![
                CommandNode::group(
                    "config",
                    "Manage configuration",
                    vec![
                        CommandNode::command("get", "Get a configuration value", builtin("config get")),
                        CommandNode::command("set", "Set a configuration value", builtin("config set")),
                        CommandNode::command("list", "List all configuration", builtin("config list")),
                        CommandNode::command("path", "Show the configuration file path", builtin("config path")),
                        CommandNode::command("validate", "Validate configuration", builtin("config validate")),
                    ],
                ),
                CommandNode::group(
                    "plugins",
                    "Install and manage plugins",
                    vec![
                        CommandNode::command("install", "Install plugins", builtin("plugins install")),
                        CommandNode::command("uninstall", "Uninstall a plugin", builtin("plugins uninstall")),
                        CommandNode::command("update", "Update a plugin", builtin("plugins update")),
                        CommandNode::command("list", "List installed plugins", builtin("plugins list"))
                            .with_aliases(&["ls"]),
                        CommandNode::command("validate", "Validate installed plugins", builtin("plugins validate")),
                    ],
                )
                .with_aliases(&["plugin"]),
                CommandNode::command("tree", "Show the merged command tree", builtin("tree")),
                CommandNode::command("version", "Show version information", builtin("version")),
            ],
        )
    }
}
