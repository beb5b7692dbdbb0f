//! Delivery records, discard records and warning messages.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One delivery extracted from one DDT page.
///
/// `document_number` + `document_genre` + year of `document_date`
/// identify a document; `document_source` + `page_number` identify a
/// page. A record missing any of number/quantity/vehicle is never
/// persisted as a delivery and becomes a discard instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub document_number: Option<i64>,
    /// Two-letter document genre code, upper-cased.
    pub document_genre: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub delivery_city: Option<String>,
    pub quantity: Option<i64>,
    /// Always a copy of `document_date`, by design.
    pub delivery_date: Option<NaiveDate>,
    /// Canonical plate identifier (7 characters).
    pub vehicle: Option<String>,
    pub vehicle_driver: Option<String>,
    /// Driving distance to the delivery city, in kilometers.
    pub distance: Option<f64>,
    /// Originating file name, without the in-flight `.recording` mark.
    pub document_source: String,
    /// 1-based page within the originating file.
    pub page_number: u32,
    /// Timestamp of the scan job that produced this record.
    pub recording_date: NaiveDateTime,
    /// Link to the warning message covering this page, if any.
    #[serde(skip)]
    pub warning: WarningLink,
}

impl DeliveryRecord {
    /// Create an empty record for a page about to be extracted.
    pub fn new(
        document_source: impl Into<String>,
        page_number: u32,
        recording_date: NaiveDateTime,
    ) -> Self {
        Self {
            document_number: None,
            document_genre: None,
            document_date: None,
            company_name: None,
            delivery_city: None,
            quantity: None,
            delivery_date: None,
            vehicle: None,
            vehicle_driver: None,
            distance: None,
            document_source: document_source.into(),
            page_number,
            recording_date,
            warning: WarningLink::None,
        }
    }

    /// Year of the document date, when extracted.
    pub fn document_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.document_date.map(|d| d.year())
    }
}

impl fmt::Display for DeliveryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// Link between a page and its warning message.
///
/// Replaces the historical `-1` sentinel: `Suppressed` means the page is
/// discarded without writing a discard record or a new warning (pure
/// duplicates, or a warning write that itself failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningLink {
    /// No warning involved yet.
    #[default]
    None,
    /// Discard the page but never write a warning or discard row.
    Suppressed,
    /// A warning row with this id covers the page.
    Created(i64),
}

impl WarningLink {
    pub fn id(&self) -> Option<i64> {
        match self {
            WarningLink::Created(id) => Some(*id),
            _ => None,
        }
    }
}

/// A previously discarded page awaiting manual correction.
///
/// Same field shape as [`DeliveryRecord`]; consulted when the same page
/// is re-scanned after correction, to backfill whatever the new scan
/// still misses.
#[derive(Debug, Clone)]
pub struct DiscardRecord {
    pub document_number: Option<i64>,
    pub document_genre: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub delivery_city: Option<String>,
    pub quantity: Option<i64>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle: Option<String>,
    pub vehicle_driver: Option<String>,
    pub distance: Option<f64>,
    pub id_warning_message: i64,
}

impl DiscardRecord {
    /// Copy this discard's fields onto `record` and report whether the
    /// discard row was fully populated.
    ///
    /// Only a fully populated discard clears a page's failure set, and
    /// only then are its fields copied; a partial one keeps the page
    /// failed and leaves the freshly extracted fields untouched, but
    /// still carries the warning id forward so the same condition is
    /// not logged twice.
    pub fn backfill(&self, record: &mut DeliveryRecord) -> bool {
        let complete = self.is_complete();
        if complete {
            record.document_number = self.document_number;
            record.document_genre = self.document_genre.clone();
            record.document_date = self.document_date;
            record.company_name = self.company_name.clone();
            record.delivery_city = self.delivery_city.clone();
            record.quantity = self.quantity;
            record.delivery_date = self.delivery_date;
            record.vehicle = self.vehicle.clone();
            record.vehicle_driver = self.vehicle_driver.clone();
            record.distance = self.distance;
        }
        record.warning = WarningLink::Created(self.id_warning_message);
        complete
    }

    fn is_complete(&self) -> bool {
        self.document_number.is_some()
            && self.document_genre.is_some()
            && self.document_date.is_some()
            && self.company_name.is_some()
            && self.delivery_city.is_some()
            && self.quantity.is_some()
            && self.delivery_date.is_some()
            && self.vehicle.is_some()
            && self.vehicle_driver.is_some()
            && self.distance.is_some()
    }
}

/// Field corrected through similarity matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityField {
    Vehicle,
    Driver,
}

impl fmt::Display for SimilarityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityField::Vehicle => f.write_str("vehicle"),
            SimilarityField::Driver => f.write_str("driver"),
        }
    }
}

/// The three warning message shapes, rendered to text by [`WarningKind::render`].
#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    /// A page failed extraction or validation and was discarded.
    Discard {
        page: u32,
        doc: String,
        failed_rules: String,
        document_number: Option<i64>,
        document_genre: Option<String>,
        document_date: Option<NaiveDate>,
    },
    /// A document number is missing from its year's sequence.
    Gap { document_number: i64, document_year: i32 },
    /// An enumerated field stayed outside its canonical set after
    /// similarity resolution; the record is persisted anyway.
    Similarity {
        field: SimilarityField,
        record: Option<String>,
        page: u32,
        doc: String,
    },
}

impl WarningKind {
    /// Genre tag stored alongside the rendered text.
    pub fn genre(&self) -> &'static str {
        match self {
            WarningKind::Discard { .. } => "DISCARD",
            WarningKind::Gap { .. } => "GAP",
            WarningKind::Similarity { .. } => "WARNING",
        }
    }

    /// Render the message text. Missing fields render as `None`.
    pub fn render(&self) -> String {
        match self {
            WarningKind::Discard {
                page,
                doc,
                failed_rules,
                document_number,
                document_genre,
                document_date,
            } => format!(
                "Page {} of doc {} discarded for error on {} [number: {}, genre: {}, date: {}]",
                page,
                doc,
                failed_rules,
                opt(document_number.as_ref()),
                opt(document_genre.as_ref()),
                opt(document_date.map(|d| d.format("%Y-%m-%d")).as_ref()),
            ),
            WarningKind::Gap {
                document_number,
                document_year,
            } => format!(
                "Found gap for doc number {document_number} of year {document_year}"
            ),
            WarningKind::Similarity {
                field,
                record,
                page,
                doc,
            } => format!(
                "Had similarity crash for {} {} on page {} of doc {}",
                field,
                opt(record.as_ref()),
                page,
                doc,
            ),
        }
    }
}

fn opt<T: fmt::Display>(value: Option<&T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

/// Per-document failure accumulator owned by the orchestrator for the
/// duration of one document scan. Not persisted.
#[derive(Debug, Default)]
pub struct DiscardCounter {
    /// Pages isolated so far in the current document.
    pub count: u32,
    /// Names of the rules that failed on the current page, in rule order.
    pub pending: Vec<String>,
}

impl DiscardCounter {
    pub fn record_failure(&mut self, rule: impl Into<String>) {
        self.pending.push(rule.into());
    }

    /// The page is clean so far.
    pub fn is_clean(&self) -> bool {
        self.pending.is_empty()
    }

    /// Comma-joined failed-rule list for the discard message.
    pub fn failed_rules(&self) -> String {
        self.pending.join(", ")
    }

    /// Bump the discard count and clear per-page state, after the page
    /// has been isolated.
    pub fn reset_after_isolation(&mut self) {
        self.count += 1;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> DeliveryRecord {
        DeliveryRecord::new(
            "2024_01_DDT_0001_0100.pdf",
            3,
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
        )
    }

    fn full_discard() -> DiscardRecord {
        DiscardRecord {
            document_number: Some(145),
            document_genre: Some("TA".to_string()),
            document_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            company_name: Some("ACME SRL".to_string()),
            delivery_city: Some("MILANO".to_string()),
            quantity: Some(3200),
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            vehicle: Some("AB123CD".to_string()),
            vehicle_driver: Some("MARIO ROSSI".to_string()),
            distance: Some(52.4),
            id_warning_message: 7,
        }
    }

    #[test]
    fn backfill_complete_discard() {
        let mut rec = record();
        let complete = full_discard().backfill(&mut rec);

        assert!(complete);
        assert_eq!(rec.document_number, Some(145));
        assert_eq!(rec.vehicle.as_deref(), Some("AB123CD"));
        assert_eq!(rec.warning, WarningLink::Created(7));
    }

    #[test]
    fn backfill_partial_discard_keeps_fresh_fields() {
        let mut discard = full_discard();
        discard.quantity = None;
        discard.document_number = None;

        let mut rec = record();
        rec.document_number = Some(146);
        rec.document_genre = Some("TA".to_string());
        let complete = discard.backfill(&mut rec);

        assert!(!complete);
        // Nothing from the partial row is copied over the new scan.
        assert_eq!(rec.document_number, Some(146));
        assert_eq!(rec.document_genre.as_deref(), Some("TA"));
        assert_eq!(rec.quantity, None);
        // The warning id is carried even when the copy is incomplete.
        assert_eq!(rec.warning, WarningLink::Created(7));
    }

    #[test]
    fn render_discard_message_with_nulls() {
        let kind = WarningKind::Discard {
            page: 2,
            doc: "2024_01_DDT_0001_0100.pdf".to_string(),
            failed_rules: "DOC_NUMBER, CITY".to_string(),
            document_number: None,
            document_genre: None,
            document_date: None,
        };
        assert_eq!(
            kind.render(),
            "Page 2 of doc 2024_01_DDT_0001_0100.pdf discarded for error on \
             DOC_NUMBER, CITY [number: None, genre: None, date: None]"
        );
        assert_eq!(kind.genre(), "DISCARD");
    }

    #[test]
    fn render_gap_message() {
        let kind = WarningKind::Gap {
            document_number: 146,
            document_year: 2024,
        };
        assert_eq!(kind.render(), "Found gap for doc number 146 of year 2024");
        assert_eq!(kind.genre(), "GAP");
    }

    #[test]
    fn render_similarity_message() {
        let kind = WarningKind::Similarity {
            field: SimilarityField::Vehicle,
            record: Some("ZZ000ZZ".to_string()),
            page: 1,
            doc: "2024_01_DDT_0001_0100.pdf".to_string(),
        };
        assert_eq!(
            kind.render(),
            "Had similarity crash for vehicle ZZ000ZZ on page 1 of doc 2024_01_DDT_0001_0100.pdf"
        );
        assert_eq!(kind.genre(), "WARNING");
    }

    #[test]
    fn counter_reset_after_isolation() {
        let mut counter = DiscardCounter::default();
        counter.record_failure("DOC_NUMBER");
        counter.record_failure("QUANTITY");
        assert_eq!(counter.failed_rules(), "DOC_NUMBER, QUANTITY");
        assert!(!counter.is_clean());

        counter.reset_after_isolation();
        assert_eq!(counter.count, 1);
        assert!(counter.is_clean());
    }
}
