//! PDF collaborators: per-page text extraction and page isolation.

mod isolator;
mod source;

pub use isolator::{discard_name, PageIsolator};
pub use source::PdfTextSource;

use std::path::{Path, PathBuf};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Plain text for each page of a document.
///
/// Implementations must preserve the whitespace conventions the
/// extraction patterns are written against: CRLF line breaks and
/// literal tab characters.
pub trait PageTextSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Text of a 1-based page.
    fn page_text(&self, page: u32) -> Result<String>;
}

/// Splits one page out of a document into its own single-page file.
pub trait PageSplitter {
    /// Copy only the given 1-based page of `document` into a new file
    /// and return its path. The source document is never mutated.
    fn isolate(&self, document: &Path, page: u32) -> Result<PathBuf>;
}
