//! Command tree model
//!
//! The host CLI and every plugin describe their commands as a tree of groups
//! and commands. Only groups have children and only commands have handlers.

use std::fmt;
use std::path::PathBuf;

/// What runs when a command is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Implemented inside the host binary
    Builtin(String),
    /// Handler module shipped by a plugin (absolute path)
    Module(PathBuf),
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Builtin(id) => write!(f, "builtin:{}", id),
            Handler::Module(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A node in the command tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNode {
    Command {
        name: String,
        description: String,
        aliases: Vec<String>,
        summary: Option<String>,
        handler: Handler,
    },
    Group {
        name: String,
        description: String,
        aliases: Vec<String>,
        summary: Option<String>,
        children: Vec<CommandNode>,
    },
}

impl CommandNode {
    pub fn command(name: &str, description: &str, handler: Handler) -> Self {
        CommandNode::Command {
            name: name.to_string(),
            description: description.to_string(),
            aliases: Vec::new(),
            summary: None,
            handler,
        }
    }

    pub fn group(name: &str, description: &str, children: Vec<CommandNode>) -> Self {
        CommandNode::Group {
            name: name.to_string(),
            description: description.to_string(),
            aliases: Vec::new(),
            summary: None,
            children,
        }
    }

    /// Builder-style alias assignment
    pub fn with_aliases(mut self, new_aliases: &[&str]) -> Self {
        match &mut self {
            CommandNode::Command { aliases, .. } | CommandNode::Group { aliases, .. } => {
                *aliases = new_aliases.iter().map(|a| a.to_string()).collect();
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            CommandNode::Command { name, .. } | CommandNode::Group { name, .. } => name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CommandNode::Command { description, .. } | CommandNode::Group { description, .. } => {
                description
            }
        }
    }

    pub fn aliases(&self) -> &[String] {
        match self {
            CommandNode::Command { aliases, .. } | CommandNode::Group { aliases, .. } => aliases,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, CommandNode::Group { .. })
    }

    /// Children of a group, empty for commands
    pub fn children(&self) -> &[CommandNode] {
        match self {
            CommandNode::Group { children, .. } => children,
            CommandNode::Command { .. } => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<CommandNode>> {
        match self {
            CommandNode::Group { children, .. } => Some(children),
            CommandNode::Command { .. } => None,
        }
    }

    /// Whether the node answers to `word` by name or alias, ignoring case
    pub fn answers_to(&self, word: &str) -> bool {
        self.name().eq_ignore_ascii_case(word)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(word))
    }

    /// Find a direct child by name or alias
    pub fn child(&self, word: &str) -> Option<&CommandNode> {
        self.children().iter().find(|c| c.answers_to(word))
    }

    /// Walk a path of names/aliases from this node
    pub fn find(&self, path: &[&str]) -> Option<&CommandNode> {
        path.iter().try_fold(self, |node, word| node.child(word))
    }

    /// Number of executable commands below (and including) this node
    pub fn command_count(&self) -> usize {
        match self {
            CommandNode::Command { .. } => 1,
            CommandNode::Group { children, .. } => {
                children.iter().map(CommandNode::command_count).sum()
            }
        }
    }

    /// Indented outline of the tree, one node per line
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        self.render_into(0, &mut lines);
        lines.join("\n")
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let mut line = format!("{}{}", "  ".repeat(depth), self.name());
        if !self.aliases().is_empty() {
            line.push_str(&format!(" ({})", self.aliases().join(", ")));
        }
        if self.is_group() {
            line.push('/');
        }
        lines.push(line);
        for child in self.children() {
            child.render_into(depth + 1, lines);
        }
    }
}
