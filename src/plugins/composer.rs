//! Command tree composition
//!
//! Turns a plugin's declared definitions into a typed command group and
//! merges it into the host tree as a new top-level group.

use super::issues::PluginIssueTracker;
use super::manifest::{CommandDefinition, PluginManifest};
use super::redirector::ModuleResolutionRedirector;
use crate::tree::{CommandNode, Handler};

/// Result of a top-level name collision check
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    pub message: String,
}

/// Merges plugin command groups into the host tree
pub struct CommandTreeComposer;

impl CommandTreeComposer {
    /// Check the candidate's name and aliases against every top-level node, ignoring case
    pub fn detect_conflict(candidate: &CommandNode, host_tree: &CommandNode) -> ConflictCheck {
        let candidate_words = std::iter::once(("name", candidate.name()))
            .chain(candidate.aliases().iter().map(|a| ("alias", a.as_str())));

        for (candidate_kind, candidate_word) in candidate_words {
            for existing in host_tree.children() {
                let existing_words = std::iter::once(("name", existing.name()))
                    .chain(existing.aliases().iter().map(|a| ("alias", a.as_str())));

                for (existing_kind, existing_word) in existing_words {
                    if candidate_word.eq_ignore_ascii_case(existing_word) {
                        return ConflictCheck {
                            has_conflict: true,
                            message: format!(
                                "The plugin's command group {} '{}' conflicts with the {} '{}' of the existing command '{}'",
                                candidate_kind,
                                candidate_word,
                                existing_kind,
                                existing_word,
                                existing.name()
                            ),
                        };
                    }
                }
            }
        }

        ConflictCheck::default()
    }

    /// Append a plugin group under the host root
    pub fn graft(
        host_tree: &mut CommandNode,
        candidate: CommandNode,
        plugin: &str,
        tracker: &mut PluginIssueTracker,
    ) -> bool {
        let root_name = host_tree.name().to_string();
        let Some(children) = host_tree.children_mut() else {
            tracker.error(
                plugin,
                format!(
                    "Cannot add the plugin's commands: the host command tree '{}' is not a group",
                    root_name
                ),
            );
            return false;
        };

        if children.iter().any(|c| c.name() == candidate.name()) {
            tracker.error(
                plugin,
                format!(
                    "Cannot add the plugin's command group '{}': a command with that name already exists",
                    candidate.name()
                ),
            );
            return false;
        }

        tracing::debug!(
            "Grafting command group '{}' from plugin '{}'",
            candidate.name(),
            plugin
        );
        children.push(candidate);
        true
    }

    /// Remove a previously grafted top-level group
    pub fn excise(host_tree: &mut CommandNode, name: &str) -> Option<CommandNode> {
        let children = host_tree.children_mut()?;
        let index = children.iter().position(|c| c.name() == name)?;
        tracing::debug!("Excising command group '{}'", name);
        Some(children.remove(index))
    }

    /// Build the plugin's top-level group from its manifest
    ///
    /// Definitions that cannot be typed are dropped; validation reports them.
    pub fn build_candidate(
        manifest: &PluginManifest,
        redirector: &ModuleResolutionRedirector,
    ) -> CommandNode {
        let children = manifest
            .definitions
            .iter()
            .flatten()
            .filter_map(|def| Self::to_node(def, manifest, redirector))
            .collect();

        CommandNode::Group {
            name: manifest.name.clone(),
            description: manifest
                .root_command_description
                .clone()
                .unwrap_or_default(),
            aliases: manifest.aliases.clone(),
            summary: manifest.summary.clone(),
            children,
        }
    }

    fn to_node(
        def: &CommandDefinition,
        manifest: &PluginManifest,
        redirector: &ModuleResolutionRedirector,
    ) -> Option<CommandNode> {
        let name = def.name.clone()?;
        let description = def.description.clone()?;

        match def.kind.as_deref()? {
            "command" => {
                let request = def.handler.as_deref()?;
                let path = redirector.locate(&manifest.root, request)?;
                Some(CommandNode::Command {
                    name,
                    description,
                    aliases: def.aliases.clone(),
                    summary: def.summary.clone(),
                    handler: Handler::Module(path),
                })
            }
            "group" => {
                let children: Vec<CommandNode> = def
                    .children
                    .iter()
                    .flatten()
                    .filter_map(|child| Self::to_node(child, manifest, redirector))
                    .collect();
                if children.is_empty() {
                    return None;
                }
                Some(CommandNode::Group {
                    name,
                    description,
                    aliases: def.aliases.clone(),
                    summary: def.summary.clone(),
                    children,
                })
            }
            _ => None,
        }
    }
}
