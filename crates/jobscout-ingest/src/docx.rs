//! DOCX text extraction.
//!
//! A DOCX file is a ZIP archive whose body lives in `word/document.xml`.
//! Paragraphs (`<w:p>`) are emitted in document order, one per line; inside
//! a paragraph the `<w:t>` runs are concatenated, `<w:tab/>` becomes a tab
//! and `<w:br/>` a newline. Formatting, headers and footers are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use jobscout_core::BackendError;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_text(path: &Path) -> Result<String, BackendError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| BackendError::OpenError(format!("not a DOCX archive: {e}")))?;
    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| BackendError::OpenError(format!("missing {DOCUMENT_PART}: {e}")))?;

    let text = paragraphs_from_xml(BufReader::new(part))?;
    tracing::debug!(path = %path.display(), chars = text.len(), "extracted DOCX text");
    Ok(text)
}

/// Collect paragraph text from a WordprocessingML body.
pub fn paragraphs_from_xml<R: BufRead>(source: R) -> Result<String, BackendError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" if in_paragraph => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" if in_paragraph => current.push('\t'),
                b"br" | b"cr" if in_paragraph => current.push('\n'),
                // <w:p/> is an empty paragraph.
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_paragraph => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BackendError::ExtractionError(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    fn parse(inner: &str) -> String {
        paragraphs_from_xml(body(inner).as_bytes()).unwrap()
    }

    #[test]
    fn runs_concatenate_and_paragraphs_join_with_newline() {
        let text = parse(
            r#"<w:p><w:r><w:t>Senior </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Rust</w:t></w:r></w:p>
               <w:p><w:r><w:t>Engineer</w:t></w:r></w:p>"#,
        );
        assert_eq!(text, "Senior Rust\nEngineer");
    }

    #[test]
    fn preserved_spaces_tabs_and_breaks() {
        let text = parse(
            r#"<w:p><w:r><w:t xml:space="preserve">Skills: </w:t><w:tab/><w:t>Go</w:t><w:br/><w:t>SQL</w:t></w:r></w:p>"#,
        );
        assert_eq!(text, "Skills: \tGo\nSQL");
    }

    #[test]
    fn entities_are_unescaped() {
        assert_eq!(parse(r#"<w:p><w:r><w:t>R&amp;D &lt;C++&gt;</w:t></w:r></w:p>"#), "R&D <C++>");
    }

    #[test]
    fn empty_paragraphs_are_kept_as_blank_lines() {
        let text = parse(r#"<w:p><w:r><w:t>a</w:t></w:r></w:p><w:p/><w:p></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p>"#);
        assert_eq!(text, "a\n\n\nb");
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let text = parse(r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>"#);
        assert_eq!(text, "Title");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = paragraphs_from_xml(body("<w:p><w:r><w:t>oops</w:r></w:p>").as_bytes());
        assert!(matches!(err, Err(BackendError::ExtractionError(_))));
    }
}
