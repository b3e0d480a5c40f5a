pub mod apply;
pub mod diff;
pub mod parse;
pub mod summarize;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use driftsync_core::{config, Config};

/// Load `~/.driftsync/config.yaml`, falling back to defaults when absent.
pub(crate) fn load_config() -> Result<Config> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    config::load_at(&home).with_context(|| {
        format!(
            "failed to load {}",
            config::config_path_at(&home).display()
        )
    })
}

/// Read a diff or file argument; `-` means stdin.
pub(crate) fn read_input(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("failed to read {}", source.display()))
}
