use std::path::Path;

pub mod docx;
pub mod pdf;

// Re-export domain types for convenience
pub use jobscout_core::{BackendError, DocumentBackend};

/// Resume formats that yield text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Classify by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
        }
    }
}

/// Whether uploads with this file name should be accepted.
pub fn is_supported(path: &Path) -> bool {
    DocumentKind::from_path(path).is_some()
}

/// [`DocumentBackend`] that dispatches on file extension:
/// - `.pdf` → [`pdf::extract_text`]
/// - `.docx` → [`docx::extract_text`]
/// - anything else → empty text
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeExtractor;

impl DocumentBackend for ResumeExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Pdf) => pdf::extract_text(path),
            Some(DocumentKind::Docx) => docx::extract_text(path),
            None => {
                tracing::debug!(path = %path.display(), "unsupported resume format, no text");
                Ok(String::new())
            }
        }
    }
}

/// Extract a resume's text, degrading every failure to empty text.
pub fn extract_text(path: &Path) -> String {
    ResumeExtractor.extract_text(path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "failed to extract resume text");
        String::new()
    })
}
