use std::path::Path;

use lopdf::Document;

use jobscout_core::BackendError;

/// Extract the text of every page, concatenated in page order.
pub fn extract_text(path: &Path) -> Result<String, BackendError> {
    let doc = Document::load(path).map_err(|e| BackendError::OpenError(e.to_string()))?;

    let mut text = String::new();
    // get_pages() is a BTreeMap keyed by 1-based page number.
    for page_num in doc.get_pages().into_keys() {
        let page_text = doc
            .extract_text(&[page_num])
            .map_err(|e| BackendError::ExtractionError(format!("page {page_num}: {e}")))?;
        text.push_str(&page_text);
    }

    tracing::debug!(path = %path.display(), chars = text.len(), "extracted PDF text");
    Ok(text)
}
