//! Scan command - process a single DDT document.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use clap::Args;
use console::style;
use tracing::debug;

use ddtscan_core::pdf::PageIsolator;
use ddtscan_core::{OrsClient, ScanOrchestrator, SqliteStore};

use super::{ensure_dir, load_config};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// DDT document to scan
    input: PathBuf,
}

pub fn run(args: ScanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    ensure_dir(&config.paths.discarded_dir)?;

    let store = SqliteStore::open(&config.paths.database)?;
    let geo = OrsClient::new(&config.geo)?;
    let isolator = PageIsolator::new(&config.paths.discarded_dir);
    let orchestrator = ScanOrchestrator::new(&config, &store, &geo, &isolator);

    let job_begin = Local::now().naive_local();
    debug!("Scanning single document {}", args.input.display());
    let report = orchestrator.scan_document(&args.input, job_begin)?;

    if report.is_clean() {
        println!(
            "{} {} pages recorded in {:.1}s",
            style("✓").green(),
            report.pages,
            start.elapsed().as_secs_f64()
        );
    } else {
        println!(
            "{} {} of {} pages discarded, see {}",
            style("⚠").yellow(),
            report.discarded,
            report.pages,
            config.paths.discarded_dir.display()
        );
    }

    Ok(())
}
