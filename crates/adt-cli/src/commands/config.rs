//! Config command implementations

use std::path::Path;

use anyhow::{Context, Result};

use adt_core::config::ClientConfig;

use crate::output::print_info;

/// Print the effective configuration as TOML
pub fn config_show(path: &Path, config: &ClientConfig) -> Result<()> {
    if !path.exists() {
        print_info(&format!("{:?} does not exist, showing defaults", path));
    }
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

pub fn config_path(path: &Path) {
    println!("{}", path.display());
}
