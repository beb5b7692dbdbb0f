//! Batch command - the end-of-month run over the working directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use ddtscan_core::extract::patterns::{DISCARD_DOC, WORKING_DOC};
use ddtscan_core::pdf::PageIsolator;
use ddtscan_core::store::DeliveryStore;
use ddtscan_core::{OrsClient, ScanOrchestrator, SqliteStore};

use super::report::{write_monthly_overview, write_yearly_summary};
use super::{ensure_dir, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Skip report regeneration
    #[arg(long)]
    no_reports: bool,

    /// Skip the database backup
    #[arg(long)]
    no_backup: bool,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    ensure_dir(&config.paths.discarded_dir)?;
    ensure_dir(&config.paths.recorded_dir)?;
    ensure_dir(&config.paths.reports_dir)?;
    if let Some(backup_dir) = &config.paths.backup_dir {
        ensure_dir(backup_dir)?;
    }

    let store = SqliteStore::open(&config.paths.database)?;
    let geo = OrsClient::new(&config.geo)?;
    let isolator = PageIsolator::new(&config.paths.discarded_dir);
    let orchestrator = ScanOrchestrator::new(&config, &store, &geo, &isolator);

    // Pending documents in sorted-filename order; anything off the
    // naming convention is skipped with a warning.
    let pattern = config.paths.working_dir.join("*.pdf");
    let mut pending: Vec<String> = Vec::new();
    for entry in glob(&pattern.to_string_lossy())
        .with_context(|| format!("listing {}", config.paths.working_dir.display()))?
    {
        let path = entry?;
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };
        if WORKING_DOC.is_match(&name) {
            pending.push(name);
        } else {
            warn!("Skipping {name}: does not match the document naming convention");
        }
    }
    pending.sort();

    if pending.is_empty() {
        println!("{} Nothing to process", style("ℹ").blue());
        return Ok(());
    }
    println!(
        "{} Found {} documents to process",
        style("ℹ").blue(),
        pending.len()
    );

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")
            .unwrap()
            .progress_chars("=>-"),
    );

    let job_begin = Local::now().naive_local();
    let mut pages = 0u32;
    let mut discarded = 0u32;

    for name in &pending {
        let base = name.trim_end_matches(".pdf");
        let recording = config
            .paths
            .working_dir
            .join(format!("{base}.recording.pdf"));
        fs::rename(config.paths.working_dir.join(name), &recording)
            .with_context(|| format!("marking {name} as in flight"))?;

        let report = orchestrator
            .scan_document(&recording, job_begin)
            .with_context(|| format!("scanning {name}"))?;
        pages += report.pages;
        discarded += report.discarded;

        if wants_backup_copy(name) {
            if let Some(backup_dir) = &config.paths.backup_dir {
                fs::copy(&recording, backup_dir.join(name))
                    .with_context(|| format!("backing up {name}"))?;
            }
        }

        let recorded = config
            .paths
            .recorded_dir
            .join(format!("{base}.recorded.pdf"));
        fs::rename(&recording, &recorded)
            .with_context(|| format!("archiving {name}"))?;
        info!("Archived {name}");
        pb.inc(1);
    }
    pb.finish_and_clear();

    let gaps = orchestrator.sweep_gaps()?;

    if !args.no_reports {
        regenerate_reports(&store, &config.paths.reports_dir, job_begin)?;
    }
    if !args.no_backup {
        backup_database(&store, &config.paths.database)?;
    }

    println!(
        "{} {} documents, {} pages ({} discarded), {} new gaps, in {:.1}s",
        style("✓").green(),
        pending.len(),
        pages,
        discarded,
        gaps,
        start.elapsed().as_secs_f64()
    );
    if discarded > 0 {
        println!(
            "{} Discarded pages await correction in {}",
            style("⚠").yellow(),
            config.paths.discarded_dir.display()
        );
    }
    Ok(())
}

/// Original documents go to the backup location even when some of their
/// pages were discarded; re-fed discard documents stay reconstructible
/// from their source and are never copied.
fn wants_backup_copy(name: &str) -> bool {
    !DISCARD_DOC.is_match(name)
}

/// Rewrite the overview/summary files for every month this job touched.
fn regenerate_reports(
    store: &dyn DeliveryStore,
    reports_dir: &Path,
    job_begin: chrono::NaiveDateTime,
) -> anyhow::Result<()> {
    let months = store.recent_months(job_begin)?;
    let mut years: BTreeSet<i32> = BTreeSet::new();
    for (year, month) in months {
        write_monthly_overview(store, reports_dir, year, month)?;
        years.insert(year);
    }
    for year in years {
        write_yearly_summary(store, reports_dir, year)?;
    }
    Ok(())
}

/// Dump the database next to itself, keeping the previous dump when it
/// is the larger one (a shrunk dump usually means lost data).
fn backup_database(store: &SqliteStore, database: &Path) -> anyhow::Result<()> {
    let target = database.with_extension("db.bak");
    let fresh = database.with_extension("db.bak.new");

    store.backup_to(&fresh)?;
    let old_size = fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
    let new_size = fs::metadata(&fresh)?.len();
    if new_size >= old_size {
        fs::rename(&fresh, &target)?;
        info!("Database backup refreshed at {}", target.display());
    } else {
        fs::remove_file(&fresh)?;
        warn!(
            "New backup is smaller than the previous one, keeping the old dump at {}",
            target.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_documents_are_backed_up_even_with_discarded_pages() {
        assert!(wants_backup_copy("2024_01_DDT_0001_0100.pdf"));
    }

    #[test]
    fn refed_discard_documents_are_not_backed_up() {
        assert!(!wants_backup_copy("2024_01_DDT_0001_0100_P002.pdf"));
        assert!(!wants_backup_copy("2024_01_DDT_0001_0100_P002_P001.pdf"));
    }
}
