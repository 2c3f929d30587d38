//! Plugin CLI commands
//!
//! Provides the `plugins` commands for installing and managing plugdeck plugins.

use crate::config::{paths, Config, ConfigLoader};
use crate::host::HostDefinition;
use crate::plugins::{
    NpmInstaller, PluginManagementFacility, PluginRecord, PluginRegistryStore, PluginStatus,
    ValidationReport,
};
use anyhow::{Context, Result};
use clap::{ArgAction, Subcommand};
use std::path::PathBuf;

/// Plugin subcommands
#[derive(Subcommand, Debug)]
pub enum PluginSubcommand {
    /// Install plugins (reinstalls every registered plugin when none are given)
    Install {
        /// Package names, local directories, archives, or URLs
        locators: Vec<String>,

        /// Registry to install from
        #[arg(long)]
        registry: Option<String>,

        /// Install the plugins listed in a plugins.json file
        #[arg(short, long, conflicts_with = "locators")]
        file: Option<PathBuf>,
    },

    /// Uninstall a plugin
    Uninstall {
        /// Plugin name
        name: String,
    },

    /// Update a plugin to its newest version
    Update {
        /// Plugin name
        name: String,

        /// Registry to update from
        #[arg(long)]
        registry: Option<String>,
    },

    /// List installed plugins
    #[command(visible_alias = "ls")]
    List {
        /// Only print name@version
        #[arg(long)]
        short: bool,
    },

    /// Validate installed plugins
    Validate {
        /// Plugin name (all plugins when omitted)
        name: Option<String>,

        /// Fail when a plugin has errors
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        fail_on_error: bool,

        /// Fail when a plugin has warnings
        #[arg(long)]
        fail_on_warning: bool,
    },
}

/// Build the plugin facility for this process from configuration
pub fn build_facility(config: &Config) -> PluginManagementFacility {
    let mut host = HostDefinition::builtin(paths::host_dir());
    host.shared_modules = config.shared_modules.clone();

    let installer = NpmInstaller::new(
        config.package_manager.clone(),
        ConfigLoader::install_root(config),
    );

    PluginManagementFacility::new(
        host,
        PluginRegistryStore::new(paths::registry_path()),
        Box::new(installer),
    )
    .with_default_registry(config.registry.clone())
}

/// Handle plugin CLI commands
pub async fn handle_plugin_command(subcommand: PluginSubcommand) -> Result<()> {
    tracing::debug!("Handling plugin command: {:?}", subcommand);

    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let mut facility = build_facility(&config);

    match subcommand {
        PluginSubcommand::Install {
            locators,
            registry,
            file,
        } => install_plugins(&mut facility, locators, registry.as_deref(), file).await,
        PluginSubcommand::Uninstall { name } => {
            facility
                .uninstall(&name)
                .await
                .with_context(|| format!("Failed to uninstall plugin '{}'", name))?;
            println!("Removal of the plugin '{}' was successful.", name);
            Ok(())
        }
        PluginSubcommand::Update { name, registry } => {
            let version = facility
                .update(&name, registry.as_deref())
                .await
                .with_context(|| format!("Failed to update plugin '{}'", name))?;
            println!("Update of the plugin '{}' to version {} was successful.", name, version);
            Ok(())
        }
        PluginSubcommand::List { short } => {
            let records = facility.list().context("Failed to read the plugin registry")?;
            print!("{}", format_plugin_list(&records, short));
            Ok(())
        }
        PluginSubcommand::Validate {
            name,
            fail_on_error,
            fail_on_warning,
        } => {
            let report = facility
                .validate(name.as_deref())
                .context("Failed to validate plugins")?;
            print!("{}", format_validation(&report));

            let fail_on_warning = fail_on_warning || config.validation.fail_on_warning;
            if !report.is_success(fail_on_error, fail_on_warning) {
                anyhow::bail!(
                    "Plugin validation failed: {} error(s), {} warning(s)",
                    report.error_count(),
                    report.warning_count()
                );
            }
            Ok(())
        }
    }
}

async fn install_plugins(
    facility: &mut PluginManagementFacility,
    locators: Vec<String>,
    registry: Option<&str>,
    file: Option<PathBuf>,
) -> Result<()> {
    let outcomes = match (file, locators.is_empty()) {
        (Some(file), _) => facility
            .install_from_file(&file, registry)
            .await
            .with_context(|| format!("Failed to install plugins listed in {}", file.display()))?,
        (None, true) => facility
            .reinstall_all(registry)
            .await
            .context("Failed to reinstall registered plugins")?,
        (None, false) => facility
            .install(&locators, registry)
            .await
            .context("Failed to install plugins")?,
    };

    if outcomes.is_empty() {
        println!("No plugins to install.");
        return Ok(());
    }

    for outcome in outcomes {
        let record = &outcome.record;
        println!(
            "Installed plugin name = '{}' (version {})",
            record.name, record.version
        );
        print!("{}", format_validation(&outcome.validation));
        if outcome.validation.has_errors() {
            println!(
                "The plugin '{}' will not be loaded until its errors are fixed.",
                record.name
            );
        }
    }

    Ok(())
}

/// Render installed plugins for `plugins list`
pub fn format_plugin_list(records: &[PluginRecord], short: bool) -> String {
    if records.is_empty() {
        return "No plugins have been installed.\n".to_string();
    }

    let mut out = String::new();
    if short {
        for record in records {
            out.push_str(&format!("{}@{}\n", record.name, record.version));
        }
        return out;
    }

    out.push_str("Installed plugins:\n");
    for record in records {
        out.push_str(&format!("\n  -- pluginName: {}\n", record.name));
        out.push_str(&format!("     package: {}\n", record.package_locator));
        out.push_str(&format!("     version: {}\n", record.version));
        out.push_str(&format!("     registry: {}\n", record.registry));
    }
    out
}

/// Render a validation report for `plugins validate` and `plugins install`
pub fn format_validation(report: &ValidationReport) -> String {
    if report.plugins.is_empty() {
        return "No plugins have been installed.\n".to_string();
    }

    let mut out = String::new();
    for plugin in &report.plugins {
        if plugin.issues.is_empty() {
            out.push_str(&format!(
                "Successfully validated plugin '{}'.\n",
                plugin.name
            ));
            continue;
        }

        out.push_str(&format!(
            "\n_____ Validation results for plugin '{}' _____\n",
            plugin.name
        ));
        for issue in &plugin.issues {
            out.push_str(&format!("{}\n", issue));
        }
        match plugin.status {
            PluginStatus::Accepted => out.push_str(&format!(
                "This plugin has warnings but no errors. The plugin '{}' is loaded.\n",
                plugin.name
            )),
            PluginStatus::Rejected => out.push_str(&format!(
                "This plugin has errors and will not be loaded: '{}'.\n",
                plugin.name
            )),
        }
    }
    out
}
