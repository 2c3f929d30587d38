//! plugdeck - plugin lifecycle and command-tree composition
//!
//! Installs extension packages through a package manager, validates them, and
//! merges their command groups into the host command tree.

use anyhow::Result;
use clap::{Parser, Subcommand};
use plugdeck::cli::{self, ConfigSubcommand, PluginSubcommand};

/// plugdeck - an extensible command-line interface
#[derive(Parser, Debug)]
#[command(name = "plugdeck")]
#[command(about = "An extensible command-line interface with installable plugins", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Install and manage plugins
    #[command(visible_alias = "plugin")]
    Plugins {
        #[command(subcommand)]
        subcommand: PluginSubcommand,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show the merged command tree
    Tree,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Print log file location to stderr so it stays out of command output
    if let Some(log_path) = cli::init_logging(args.debug)? {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
        tracing::debug!("Debug logging enabled");
    }

    match args.command {
        Command::Plugins { subcommand } => cli::handle_plugin_command(subcommand).await,
        Command::Config { subcommand } => cli::handle_config_command(subcommand).await,
        Command::Tree => cli::display_tree().await,
        Command::Version => {
            cli::display_version();
            Ok(())
        }
    }
}
