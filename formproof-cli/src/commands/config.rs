//! Config command - show or create the configuration file

use anyhow::{bail, Context as _, Result};
use formproof_lib::NotaryConfig;
use std::path::PathBuf;

use super::{default_config_path, Context};
use crate::ui;

pub fn show(ctx: &Context) -> Result<()> {
    print!("{}", ctx.config.to_toml_string()?);
    Ok(())
}

pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(&path, NotaryConfig::default().to_toml_string()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    ui::success(&format!("Configuration written to {}", path.display()));
    ui::info("Set payment.receiving_address before issuing tokens");
    Ok(())
}
