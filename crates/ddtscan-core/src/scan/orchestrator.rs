//! Document-level scan loop and the batch-level gap sweep.

use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{error, info};

use super::engine::{PageDisposition, ReconciliationEngine};
use crate::error::{Result, ScanError};
use crate::extract::SimilarityMatcher;
use crate::geo::{DistanceResolver, GeoLocator};
use crate::models::{DiscardCounter, ScanConfig, WarningKind};
use crate::pdf::{PageSplitter, PageTextSource, PdfTextSource};
use crate::store::DeliveryStore;

/// Outcome of scanning one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanReport {
    pub pages: u32,
    pub discarded: u32,
}

impl ScanReport {
    /// Every page produced a delivery record.
    pub fn is_clean(&self) -> bool {
        self.discarded == 0
    }
}

/// Runs whole documents through the reconciliation engine, one page at
/// a time, strictly in order.
pub struct ScanOrchestrator<'a> {
    store: &'a dyn DeliveryStore,
    engine: ReconciliationEngine<'a>,
}

impl<'a> ScanOrchestrator<'a> {
    pub fn new(
        config: &'a ScanConfig,
        store: &'a dyn DeliveryStore,
        geo: &'a dyn GeoLocator,
        isolator: &'a dyn PageSplitter,
    ) -> Self {
        let engine = ReconciliationEngine::new(
            store,
            SimilarityMatcher::new(config),
            DistanceResolver::new(geo, &config.geo),
            isolator,
        );
        Self { store, engine }
    }

    /// Scan every page of the PDF at `path`.
    ///
    /// `job_begin` stamps each record with the moment the batch
    /// started, so a later report run can find everything this job
    /// touched.
    pub fn scan_document(&self, path: &Path, job_begin: NaiveDateTime) -> Result<ScanReport> {
        let source = clean_source_name(path)?;
        info!("Scanning document {source}");
        let pages = PdfTextSource::open(path)?;
        self.scan_pages(&pages, path, &source, job_begin)
    }

    /// Scan pages already lifted to text, against the identity
    /// (`document`, `source`).
    pub fn scan_pages(
        &self,
        pages: &dyn PageTextSource,
        document: &Path,
        source: &str,
        job_begin: NaiveDateTime,
    ) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let mut counter = DiscardCounter::default();

        for page in 1..=pages.page_count() {
            let text = pages.page_text(page)?;
            let disposition =
                self.engine
                    .process_page(document, source, page, &text, job_begin, &mut counter)?;
            report.pages += 1;
            if disposition == PageDisposition::Discarded {
                report.discarded += 1;
            }
        }

        info!(
            "Finished {source}: {} pages, {} discarded",
            report.pages, report.discarded
        );
        Ok(report)
    }

    /// Report every document number still missing from its year's
    /// sequence; one GAP warning per new hole. Returns how many were
    /// found.
    pub fn sweep_gaps(&self) -> Result<usize> {
        let gaps = self.store.unreported_gaps()?;
        for gap in &gaps {
            info!(
                "Gap in document numbering: {} of year {}",
                gap.document_number, gap.document_year
            );
            let kind = WarningKind::Gap {
                document_number: gap.document_number,
                document_year: gap.document_year,
            };
            if let Err(e) = self.store.insert_warning(&kind) {
                error!("Failed to record gap warning, check the database connection: {e}");
            }
        }
        Ok(gaps.len())
    }
}

/// File name with the in-flight `.recording` mark stripped.
fn clean_source_name(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScanError::Config(format!("unusable document path: {}", path.display())))?;
    Ok(match name.strip_suffix(".recording.pdf") {
        Some(base) => format!("{base}.pdf"),
        None => name.to_string(),
    })
}
