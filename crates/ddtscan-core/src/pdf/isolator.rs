//! Single-page isolation of failed DDT pages.

use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{PageSplitter, Result};
use crate::error::PdfError;

/// File name for an isolated page: base document name plus a
/// zero-padded 3-digit page suffix, parseable back by the
/// discard-recognition pattern.
pub fn discard_name(base: &str, page: u32) -> String {
    format!("{base}_P{page:03}.pdf")
}

/// Writes isolated single-page documents into the discarded directory.
pub struct PageIsolator {
    discarded_dir: PathBuf,
}

impl PageIsolator {
    pub fn new(discarded_dir: impl Into<PathBuf>) -> Self {
        Self {
            discarded_dir: discarded_dir.into(),
        }
    }

    fn base_name(document: &Path) -> String {
        let name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // The working copy carries an in-flight ".recording" mark.
        name.trim_end_matches(".pdf")
            .trim_end_matches(".recording")
            .to_string()
    }
}

impl PageSplitter for PageIsolator {
    fn isolate(&self, document: &Path, page: u32) -> Result<PathBuf> {
        let mut doc =
            Document::load(document).map_err(|e| PdfError::Parse(e.to_string()))?;

        let page_count = doc.get_pages().len() as u32;
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page));
        }

        // Keep only the offending page.
        let others: Vec<u32> = (1..=page_count).filter(|&p| p != page).collect();
        doc.delete_pages(&others);
        doc.prune_objects();

        let target = self
            .discarded_dir
            .join(discard_name(&Self::base_name(document), page));
        doc.save(&target)
            .map_err(|e| PdfError::Isolation(format!("{}: {e}", target.display())))?;

        debug!("isolated page {} into {}", page, target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use lopdf::{Object, Stream};
    use pretty_assertions::assert_eq;

    #[test]
    fn discard_names_are_zero_padded() {
        assert_eq!(
            discard_name("2024_01_DDT_0001_0100", 3),
            "2024_01_DDT_0001_0100_P003.pdf"
        );
        assert_eq!(
            discard_name("2024_01_DDT_0001_0100", 120),
            "2024_01_DDT_0001_0100_P120.pdf"
        );
    }

    #[test]
    fn base_name_strips_recording_mark() {
        assert_eq!(
            PageIsolator::base_name(Path::new("/tmp/2024_01_DDT_0001_0100.recording.pdf")),
            "2024_01_DDT_0001_0100"
        );
        assert_eq!(
            PageIsolator::base_name(Path::new("2024_01_DDT_0001_0100_P003.pdf")),
            "2024_01_DDT_0001_0100_P003"
        );
    }

    /// Build a minimal document with the given number of empty pages.
    fn pdf_with_pages(count: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(count);
        for _ in 0..count {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn isolates_a_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("2024_01_DDT_0001_0100.recording.pdf");
        pdf_with_pages(3).save(&source).unwrap();

        let isolator = PageIsolator::new(dir.path());
        let target = isolator.isolate(&source, 2).unwrap();

        assert_eq!(
            target.file_name().unwrap().to_string_lossy(),
            "2024_01_DDT_0001_0100_P002.pdf"
        );
        let isolated = Document::load(&target).unwrap();
        assert_eq!(isolated.get_pages().len(), 1);
        // Source untouched.
        let original = Document::load(&source).unwrap();
        assert_eq!(original.get_pages().len(), 3);
    }

    #[test]
    fn rejects_out_of_range_page() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("2024_01_DDT_0001_0100.recording.pdf");
        pdf_with_pages(2).save(&source).unwrap();

        let isolator = PageIsolator::new(dir.path());
        assert!(isolator.isolate(&source, 5).is_err());
    }
}
