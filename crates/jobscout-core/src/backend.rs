use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for resume text extraction backends.
///
/// Implementors turn a document on disk into plain text; keyword
/// extraction and scraping live in [`crate::orchestrator`]. The file-type
/// dispatch and the PDF/DOCX readers are provided by `jobscout-ingest`.
pub trait DocumentBackend: Send + Sync {
    /// Extract the full text content of a resume file.
    fn extract_text(&self, path: &Path) -> Result<String, BackendError>;
}
