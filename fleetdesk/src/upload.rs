//! Validation of files uploaded through the dashboard.

use bytes::Bytes;
use thiserror::Error;

use crate::backend::UploadFile;

/// Multipart field the browser sends the file under.
pub const UPLOAD_FIELD: &str = "file";

/// MIME types the backend accepts.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("No file provided in field 'file'")]
    MissingFile,

    #[error("File type '{0}' is not allowed")]
    DisallowedType(String),

    #[error("File is empty")]
    Empty,

    #[error("File exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },
}

/// Check a received part and package it for forwarding.
///
/// Parameters after the MIME essence (`; charset=...`) are ignored and the
/// comparison is case-insensitive.
pub fn validate_upload(
    file_name: Option<&str>,
    content_type: Option<&str>,
    bytes: Bytes,
    max_bytes: usize,
) -> Result<UploadFile, UploadError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_MIME_TYPES.contains(&essence.as_str()) {
        return Err(UploadError::DisallowedType(if essence.is_empty() {
            "unknown".to_string()
        } else {
            essence
        }));
    }

    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }

    if bytes.len() > max_bytes {
        return Err(UploadError::TooLarge { max_bytes });
    }

    Ok(UploadFile {
        field: UPLOAD_FIELD.to_string(),
        file_name: file_name
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string(),
        content_type: essence,
        bytes,
    })
}
