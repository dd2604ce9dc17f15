use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use jobscout_ingest::DocumentKind;

/// A resume received in a multipart upload.
pub struct ResumeUpload {
    pub filename: String,
    pub data: Vec<u8>,
    pub kind: DocumentKind,
    /// Overrides the configured location when non-empty.
    pub location: Option<String>,
}

/// Parse a multipart form upload. The file is expected in the `resume` field.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<ResumeUpload, String> {
    let mut file: Option<(String, Vec<u8>, DocumentKind)> = None;
    let mut location: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or("").to_string();
                if filename.is_empty() {
                    return Err("No file selected".to_string());
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();

                let kind = detect_kind(&filename, &data)?;
                file = Some((filename, data, kind));
            }
            "location" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read location: {}", e))?;
                let val = val.trim();
                if !val.is_empty() {
                    location = Some(val.to_string());
                }
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let (filename, data, kind) = file.ok_or("No resume file uploaded")?;

    Ok(ResumeUpload {
        filename,
        data,
        kind,
        location,
    })
}

/// Accept PDF and DOCX by extension, then check the magic bytes agree.
fn detect_kind(filename: &str, data: &[u8]) -> Result<DocumentKind, String> {
    match DocumentKind::from_path(Path::new(filename)) {
        Some(DocumentKind::Pdf) if !data.starts_with(b"%PDF-") => {
            Err("File has .pdf extension but doesn't appear to be a valid PDF".to_string())
        }
        // DOCX is a ZIP container.
        Some(DocumentKind::Docx) if !data.starts_with(b"PK") => {
            Err("File has .docx extension but doesn't appear to be a valid DOCX".to_string())
        }
        Some(kind) => Ok(kind),
        None => Err("Invalid file type. Please upload a PDF or DOCX resume.".to_string()),
    }
}

/// Write the upload under `upload_dir` with a fresh unique name.
pub async fn save(upload_dir: &Path, upload: &ResumeUpload) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let path = upload_dir.join(format!(
        "{}.{}",
        uuid::Uuid::new_v4(),
        upload.kind.extension()
    ));
    tokio::fs::write(&path, &upload.data).await?;
    tracing::debug!(original = %upload.filename, path = %path.display(), bytes = upload.data.len(), "resume saved");
    Ok(path)
}
