//! Report command - CSV overview and summary generation.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::info;

use ddtscan_core::store::DeliveryStore;
use ddtscan_core::SqliteStore;

use super::load_config;

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// Year to report on
    year: i32,

    /// Single month; omitted, every month of the year is written
    #[arg(short, long)]
    month: Option<u32>,

    /// Output directory, defaults to the configured reports directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

pub fn run(args: ReportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = SqliteStore::open(&config.paths.database)?;
    let out_dir = args.output_dir.unwrap_or(config.paths.reports_dir);
    std::fs::create_dir_all(&out_dir)?;

    let months: Vec<u32> = match args.month {
        Some(m) => vec![m],
        None => (1..=12).collect(),
    };

    let mut written = 0usize;
    for month in months {
        if write_monthly_overview(&store, &out_dir, args.year, month)? {
            written += 1;
        }
    }
    if write_yearly_summary(&store, &out_dir, args.year)? {
        written += 1;
    }

    println!(
        "{} {} report file(s) written to {}",
        style("✓").green(),
        written,
        out_dir.display()
    );
    Ok(())
}

/// Write one month's deliveries as `<year>_<month>.csv`; empty months
/// are skipped. Returns whether a file was written.
pub fn write_monthly_overview(
    store: &dyn DeliveryStore,
    out_dir: &Path,
    year: i32,
    month: u32,
) -> anyhow::Result<bool> {
    let rows = store.monthly_overview(year, month)?;
    if rows.is_empty() {
        return Ok(false);
    }

    let path = out_dir.join(format!("{year}_{month:02}.csv"));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "document_number",
        "document_date",
        "company",
        "city",
        "quantity",
        "delivery_date",
        "vehicle",
    ])?;
    for row in rows {
        writer.write_record([
            row.document_number.to_string(),
            row.document_date.to_string(),
            row.company_name.unwrap_or_default(),
            row.delivery_city.unwrap_or_default(),
            row.quantity.to_string(),
            row.delivery_date.map(|d| d.to_string()).unwrap_or_default(),
            row.vehicle,
        ])?;
    }
    writer.flush()?;
    info!("Wrote monthly overview to {}", path.display());
    Ok(true)
}

/// Write the year's farthest-delivery-per-vehicle summary as
/// `summary_<year>.csv`. Returns whether a file was written.
pub fn write_yearly_summary(
    store: &dyn DeliveryStore,
    out_dir: &Path,
    year: i32,
) -> anyhow::Result<bool> {
    let rows = store.yearly_summary(year)?;
    if rows.is_empty() {
        return Ok(false);
    }

    let path = out_dir.join(format!("summary_{year}.csv"));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "vehicle",
        "delivery_date",
        "document_number",
        "document_date",
        "city",
        "distance_km",
    ])?;
    for row in rows {
        writer.write_record([
            row.vehicle,
            row.delivery_date.map(|d| d.to_string()).unwrap_or_default(),
            row.document_number.to_string(),
            row.document_date.to_string(),
            row.delivery_city.unwrap_or_default(),
            format!("{:.1}", row.distance),
        ])?;
    }
    writer.flush()?;
    info!("Wrote yearly summary to {}", path.display());
    Ok(true)
}
