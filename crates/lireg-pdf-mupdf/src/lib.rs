use mupdf::{Document, TextPageFlags};
use tracing::debug;

use lireg_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island. It isolates the mupdf dependency
/// (AGPL-3.0) so that the scanning and lookup code does not transitively
/// depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, BackendError> {
        let document = Document::from_bytes(bytes, "application/pdf")
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        let pages = document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        let mut pages_text = Vec::new();
        for (index, page_result) in pages.enumerate() {
            match page_result.and_then(|page| page_text(&page)) {
                Ok(text) => pages_text.push(text),
                Err(e) => {
                    debug!(page = index, error = %e, "page yielded no text");
                    pages_text.push(String::new());
                }
            }
        }

        Ok(pages_text)
    }
}

// Block/line iteration, one output line per text line.
fn page_text(page: &mupdf::Page) -> Result<String, mupdf::Error> {
    let text_page = page.to_text_page(TextPageFlags::empty())?;

    let mut text = String::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let line_text: String = line
                .chars()
                .map(|c| c.char().unwrap_or('\u{FFFD}'))
                .collect();
            text.push_str(&line_text);
            text.push('\n');
        }
    }
    Ok(text)
}
