//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod report;
pub mod scan;

use std::path::{Path, PathBuf};

use ddtscan_core::ScanConfig;

/// Default configuration file, next to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("ddtscan.json")
}

/// Load the configuration from `--config` or the default location;
/// missing files fall back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ScanConfig> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    if path.exists() {
        Ok(ScanConfig::from_file(&path)?)
    } else {
        Ok(ScanConfig::default())
    }
}

/// Ensure a directory exists.
pub fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}
