//! Persistence collaborator: delivery, discard and warning storage.

mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;
use crate::models::{DeliveryRecord, DiscardRecord, WarningKind};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A missing document number in a year's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub document_number: i64,
    pub document_year: i32,
}

/// One row of the monthly overview report.
#[derive(Debug, Clone)]
pub struct OverviewRow {
    pub document_number: i64,
    pub document_date: NaiveDate,
    pub company_name: Option<String>,
    pub delivery_city: Option<String>,
    pub quantity: i64,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle: String,
}

/// One row of the yearly per-vehicle summary report: the farthest
/// delivery of each vehicle on each delivery date.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub document_number: i64,
    pub document_date: NaiveDate,
    pub delivery_city: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle: String,
    pub distance: f64,
}

/// Query/command contract over the durable tables.
///
/// The reconciliation core treats this purely as a sink; each call
/// commits independently (autocommit), so a failure mid-document never
/// corrupts pages already written.
pub trait DeliveryStore {
    /// Insert a validated delivery record.
    fn insert_delivery(&self, record: &DeliveryRecord) -> Result<()>;

    /// Insert a discard record linked to an existing warning message.
    fn insert_discard(&self, record: &DeliveryRecord, id_warning_message: i64) -> Result<()>;

    /// Append a warning message and return its id.
    fn insert_warning(&self, kind: &WarningKind) -> Result<i64>;

    /// Flip a warning message to resolved.
    fn resolve_warning(&self, id: i64) -> Result<()>;

    /// Whether a record already exists for the same page
    /// (source + page number) or the same document
    /// (number + genre + year).
    fn is_duplicate(&self, record: &DeliveryRecord) -> Result<bool>;

    /// The open discard record for a page, if any.
    fn open_discard(&self, source: &str, page: u32) -> Result<Option<DiscardRecord>>;

    /// Flip a page's open discard record to resolved.
    fn resolve_discard(&self, source: &str, page: u32) -> Result<()>;

    /// Previously stored distance for a city, when history holds
    /// exactly one distinct value. The outer `Option` is the cache
    /// hit; the inner one is the stored value, which may itself be
    /// unresolved.
    fn cached_distance(&self, city: &str) -> Result<Option<Option<f64>>>;

    /// Id of an open GAP warning for a document number/year, if any.
    fn open_gap(&self, document_number: i64, document_year: i32) -> Result<Option<i64>>;

    /// Missing document numbers per year with no open GAP warning yet,
    /// excluding numbers already known as discards.
    fn unreported_gaps(&self) -> Result<Vec<Gap>>;

    /// Deliveries of one month, ordered by document number.
    fn monthly_overview(&self, year: i32, month: u32) -> Result<Vec<OverviewRow>>;

    /// Farthest delivery per vehicle and delivery date for one year.
    fn yearly_summary(&self, year: i32) -> Result<Vec<SummaryRow>>;

    /// Year/month pairs touched by scans recorded since `since`.
    fn recent_months(&self, since: NaiveDateTime) -> Result<Vec<(i32, u32)>>;
}
