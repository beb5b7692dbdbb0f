//! PDF per-page text extraction using lopdf and pdf-extract.

use lopdf::Document;
use std::path::Path;
use tracing::debug;

use super::{PageTextSource, Result};
use crate::error::PdfError;

/// Text source backed by a PDF file.
///
/// `pdf-extract` produces the full document text; pages are split by
/// line count and re-joined with CRLF, which is the convention the
/// extraction patterns expect.
pub struct PdfTextSource {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfTextSource {
    /// Load a PDF from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let raw_data = std::fs::read(path)
            .map_err(|e| PdfError::Parse(format!("{}: {e}", path.display())))?;
        let document =
            Document::load_mem(&raw_data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }
        debug!("loaded PDF with {} pages", page_count);

        Ok(Self { document, raw_data })
    }

    fn extract_text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

impl PageTextSource for PdfTextSource {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page));
        }

        let full_text = self.extract_text()?;
        let lines: Vec<&str> = full_text.lines().collect();

        let lines_per_page = lines.len() / page_count as usize;
        let start = (page - 1) as usize * lines_per_page;
        let end = if page == page_count {
            lines.len()
        } else {
            page as usize * lines_per_page
        };

        Ok(lines[start.min(lines.len())..end.min(lines.len())].join("\r\n"))
    }
}
