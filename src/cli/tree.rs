//! Tree command handler

use super::plugin::build_facility;
use crate::config::ConfigLoader;
use anyhow::{Context, Result};

/// Print the host command tree with every loadable plugin merged in
pub async fn display_tree() -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let mut facility = build_facility(&config);

    let host_tree = facility.host().command_tree();
    let tree = facility
        .load_all(host_tree)
        .context("Failed to load plugins")?;

    println!("{}", tree.render());

    for plugin in facility.issues().plugins() {
        if facility.issues().has_errors(plugin) {
            eprintln!(
                "Plugin '{}' was not loaded. Run `plugdeck plugins validate {}` for details.",
                plugin, plugin
            );
        }
    }

    Ok(())
}
