//! Per-page reconciliation: extraction, prior-discard lookup, duplicate
//! and distance handling, persistence, gap resolution.

use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::extract::patterns::DISCARD_DOC;
use crate::extract::{PatternExtractor, SimilarityMatcher};
use crate::geo::DistanceResolver;
use crate::models::{DeliveryRecord, DiscardCounter, WarningKind, WarningLink};
use crate::pdf::PageSplitter;
use crate::store::DeliveryStore;

/// How a page left the reconciliation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDisposition {
    /// A delivery record was written.
    Recorded,
    /// The page was isolated into its own discard document.
    Discarded,
}

/// Drives one page through the reconciliation state machine.
///
/// Collaborators are borrowed for the duration of one document scan;
/// the engine itself holds no per-page state, that lives in the
/// caller's [`DiscardCounter`].
pub struct ReconciliationEngine<'a> {
    store: &'a dyn DeliveryStore,
    extractor: PatternExtractor,
    matcher: SimilarityMatcher<'a>,
    resolver: DistanceResolver<'a>,
    isolator: &'a dyn PageSplitter,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        store: &'a dyn DeliveryStore,
        matcher: SimilarityMatcher<'a>,
        resolver: DistanceResolver<'a>,
        isolator: &'a dyn PageSplitter,
    ) -> Self {
        Self {
            store,
            extractor: PatternExtractor::new(),
            matcher,
            resolver,
            isolator,
        }
    }

    /// Process one page of `document` to completion.
    ///
    /// `source` is the document's clean file name, without the
    /// in-flight `.recording` mark. Query failures against the store
    /// are fatal to the document; write failures are logged and the
    /// page follows the discard path instead.
    pub fn process_page(
        &self,
        document: &Path,
        source: &str,
        page: u32,
        text: &str,
        job_begin: NaiveDateTime,
        counter: &mut DiscardCounter,
    ) -> Result<PageDisposition> {
        // An isolated discard document stands in for one page of its
        // originating document; the record keeps the origin identity so
        // duplicate checks and discard resolution line up.
        let (origin_source, origin_page) = match DISCARD_DOC.captures(source) {
            Some(caps) => {
                let base = format!("{}.pdf", &caps[1]);
                let page: u32 = caps[2].parse().unwrap_or(page);
                (base, page)
            }
            None => (source.to_string(), page),
        };

        let mut record = DeliveryRecord::new(origin_source, origin_page, job_begin);

        // 1. Ordered rule extraction.
        let extraction = self.extractor.extract(text);
        for rule in &extraction.failed {
            counter.record_failure(rule.name());
        }
        let fields = extraction.fields;
        record.document_number = fields.document_number;
        record.document_genre = fields.document_genre;
        record.document_date = fields.document_date;
        record.company_name = fields.company_name;
        record.delivery_city = fields.delivery_city;
        record.quantity = fields.quantity;
        record.delivery_date = fields.delivery_date;

        // Vehicle/driver correction against the roster; shortfalls are
        // reported but never discard the page.
        if let Some(vehicle_token) = fields.vehicle_token.as_deref() {
            let crew = self
                .matcher
                .resolve_crew(vehicle_token, fields.driver_token.as_deref());
            record.vehicle = crew.vehicle;
            record.vehicle_driver = crew.driver;
            for (field, value) in crew.shortfalls {
                let kind = WarningKind::Similarity {
                    field,
                    record: value,
                    page: record.page_number,
                    doc: record.document_source.clone(),
                };
                if let Err(e) = self.store.insert_warning(&kind) {
                    error!("Failed to record similarity warning, check the database connection: {e}");
                }
            }
        }

        // 2. Prior-discard backfill for re-fed isolated pages.
        if !counter.is_clean() {
            if let Some(discard) = self
                .store
                .open_discard(&record.document_source, record.page_number)?
            {
                if discard.backfill(&mut record) {
                    info!(
                        "Manual correction found for page {} of {}, discard fully backfilled",
                        record.page_number, record.document_source
                    );
                    counter.pending.clear();
                } else {
                    // Partial correction: the page stays failed but the
                    // existing warning is reused instead of duplicated.
                    warn!(
                        "Discard backfill incomplete for page {} of {}, keeping page failed",
                        record.page_number, record.document_source
                    );
                }
            }
        }

        // 3. Duplicate check, only for pages clean so far. Duplicates
        // are isolated silently, without a discard row or a warning.
        if counter.is_clean() && self.store.is_duplicate(&record)? {
            warn!(
                "Duplicate page {} of {}, discarding without warning",
                record.page_number, record.document_source
            );
            counter.record_failure("CHECK_DUPLICATE");
            record.warning = WarningLink::Suppressed;
        } else if record.distance.is_none() {
            // 4. Distance resolution; geo failures leave it unresolved.
            record.distance = self
                .resolver
                .resolve(self.store, record.delivery_city.as_deref())?;
        }

        // 5. Persist clean pages.
        if counter.is_clean() {
            match self.store.insert_delivery(&record) {
                Ok(()) => {
                    info!(
                        "Delivery recorded for page {} of {}",
                        record.page_number, record.document_source
                    );
                    if let WarningLink::Created(id) = record.warning {
                        self.close_prior_discard(&record, id);
                    }
                }
                Err(e) => {
                    error!("Failed to insert delivery, check the database connection: {e}");
                    counter.record_failure("INSERT_DELIVERY");
                }
            }
        }

        // 6. Failed pages: write the warning + discard pair (unless one
        // is carried or suppressed), isolate, reset per-page state.
        let disposition = if counter.is_clean() {
            PageDisposition::Recorded
        } else {
            if record.warning == WarningLink::None {
                let kind = WarningKind::Discard {
                    page: record.page_number,
                    doc: record.document_source.clone(),
                    failed_rules: counter.failed_rules(),
                    document_number: record.document_number,
                    document_genre: record.document_genre.clone(),
                    document_date: record.document_date,
                };
                match self.store.insert_warning(&kind) {
                    Ok(id) => {
                        record.warning = WarningLink::Created(id);
                        if let Err(e) = self.store.insert_discard(&record, id) {
                            error!("Failed to insert discard record, check the database connection: {e}");
                        }
                    }
                    Err(e) => {
                        error!("Failed to insert discard warning, check the database connection: {e}");
                        record.warning = WarningLink::Suppressed;
                    }
                }
            }

            match self.isolator.isolate(document, page) {
                Ok(path) => info!("Page isolated into {}", path.display()),
                Err(e) => error!(
                    "Failed to isolate page {} of {}: {e}",
                    record.page_number, record.document_source
                ),
            }
            counter.reset_after_isolation();
            PageDisposition::Discarded
        };

        // 7. A page carrying a number closes any open gap for it.
        if let (Some(number), Some(year)) = (record.document_number, record.document_year()) {
            if let Some(gap_id) = self.store.open_gap(number, year)? {
                info!("Document {number} of year {year} closes a previously detected gap");
                if let Err(e) = self.store.resolve_warning(gap_id) {
                    error!("Failed to resolve gap warning, check the database connection: {e}");
                }
            }
        }

        Ok(disposition)
    }

    /// A successful insert of a backfilled page closes its open
    /// discard row and the warning that covered it.
    fn close_prior_discard(&self, record: &DeliveryRecord, warning_id: i64) {
        if let Err(e) = self.store.resolve_warning(warning_id) {
            error!("Failed to resolve discard warning, check the database connection: {e}");
        }
        if let Err(e) = self
            .store
            .resolve_discard(&record.document_source, record.page_number)
        {
            error!("Failed to resolve discard record, check the database connection: {e}");
        }
    }
}
