use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Trait for PDF text extraction backends.
///
/// Implementors decode an in-memory PDF and return the text of every page in
/// page order. A page that fails to extract must come back as an empty string
/// rather than an error; only a document that cannot be opened at all is an
/// error.
pub trait PdfBackend: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, BackendError>;
}

/// Concatenate page texts, appending a newline after each page that has text.
///
/// Pages with no text contribute nothing, not even a separator.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut text = String::new();
    for page in pages {
        let page = page.as_ref();
        if page.is_empty() {
            continue;
        }
        text.push_str(page);
        text.push('\n');
    }
    text
}

/// Extract the full document text from a PDF held in memory.
pub fn extract_text(backend: &dyn PdfBackend, bytes: &[u8]) -> Result<String, BackendError> {
    let pages = backend.extract_pages(bytes)?;
    Ok(join_pages(&pages))
}
