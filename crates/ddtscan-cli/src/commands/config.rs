//! Config command - manage configuration.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use ddtscan_core::ScanConfig;

use super::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "geo.departure_address")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, &path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn load(path: &PathBuf) -> anyhow::Result<ScanConfig> {
    if path.exists() {
        Ok(ScanConfig::from_file(path)?)
    } else {
        println!(
            "{} No config file found at {}, showing defaults",
            style("ℹ").blue(),
            path.display()
        );
        Ok(ScanConfig::default())
    }
}

fn show_config(path: &PathBuf) -> anyhow::Result<()> {
    let config = load(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(args: InitArgs, default: &PathBuf) -> anyhow::Result<()> {
    let path = args.output.unwrap_or_else(|| default.clone());
    if path.exists() && !args.force {
        anyhow::bail!(
            "config file already exists at {}, use --force to overwrite",
            path.display()
        );
    }
    ScanConfig::default().save(&path)?;
    println!(
        "{} Configuration written to {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

fn get_config(path: &PathBuf, key: &str) -> anyhow::Result<()> {
    let config = load(path)?;
    let value = serde_json::to_value(&config)?;
    let pointer = format!("/{}", key.replace('.', "/"));
    match value.pointer(&pointer) {
        Some(v) => {
            println!("{v}");
            Ok(())
        }
        None => anyhow::bail!("unknown configuration key: {key}"),
    }
}

fn set_config(path: &PathBuf, key: &str, raw: &str) -> anyhow::Result<()> {
    let config = load(path)?;
    let mut value = serde_json::to_value(&config)?;

    let pointer = format!("/{}", key.replace('.', "/"));
    let slot = value
        .pointer_mut(&pointer)
        .ok_or_else(|| anyhow::anyhow!("unknown configuration key: {key}"))?;

    // Numbers and booleans parse as themselves, anything else stays a string.
    *slot = serde_json::from_str(raw).unwrap_or(serde_json::Value::String(raw.to_string()));

    let config: ScanConfig = serde_json::from_value(value)?;
    config.save(path)?;
    println!("{} {} = {}", style("✓").green(), key, raw);
    Ok(())
}
