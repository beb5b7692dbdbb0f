//! Error types for the ddtscan-core library.

use thiserror::Error;

/// Main error type for the ddtscan library.
#[derive(Error, Debug)]
pub enum ScanError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Geocoding/routing error.
    #[error("geocoding error: {0}")]
    Geo(#[from] GeoError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF handling.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from the PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Failed to write an isolated single-page document.
    #[error("failed to save isolated page: {0}")]
    Isolation(String),
}

/// Errors raised by the persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database or create the schema.
    #[error("failed to open database: {0}")]
    Open(String),

    /// A query or statement failed.
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A write affected an unexpected number of rows.
    #[error("statement affected {actual} rows, expected {expected}")]
    RowCount { expected: usize, actual: usize },

    /// Database backup failed.
    #[error("backup failed: {0}")]
    Backup(String),
}

/// Errors raised by the geocoding/routing collaborator.
///
/// The distance resolver converts every variant to "unresolved"; these
/// never travel past it.
#[derive(Error, Debug)]
pub enum GeoError {
    /// The service answered with an error status.
    #[error("service error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure, including timeouts.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Result type for the ddtscan library.
pub type Result<T> = std::result::Result<T, ScanError>;
