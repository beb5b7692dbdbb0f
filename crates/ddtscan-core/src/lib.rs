//! Core library for DDT (delivery note) page scanning and reconciliation.
//!
//! This crate provides:
//! - Per-page field extraction from delivery-note PDFs (document number,
//!   genre, date, city, quantity, vehicle)
//! - Similarity correction of vehicle/driver tokens against the fleet roster
//! - Driving-distance resolution with a persisted per-city cache
//! - Page reconciliation: duplicates, discards, manual-correction round
//!   trips and document-numbering gap tracking over SQLite

pub mod error;
pub mod extract;
pub mod geo;
pub mod models;
pub mod pdf;
pub mod scan;
pub mod store;

pub use error::{GeoError, PdfError, Result, ScanError, StoreError};
pub use extract::{PageExtraction, PatternExtractor, SimilarityMatcher};
pub use geo::{DistanceResolver, GeoLocator, OrsClient};
pub use models::{DeliveryRecord, DiscardCounter, DiscardRecord, ScanConfig, WarningKind, WarningLink};
pub use pdf::{PageIsolator, PageSplitter, PageTextSource, PdfTextSource};
pub use scan::{ScanOrchestrator, ScanReport};
pub use store::{DeliveryStore, SqliteStore};
