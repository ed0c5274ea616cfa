//! Document upload relay.
//!
//! Checks run in a fixed order so that nothing reaches the backend unless the
//! caller holds a token and the file is acceptable: token, field, type, size.

use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::Method,
    response::Response,
};
use fleetdesk::{
    backend::{ApiRequest, UploadFile, endpoints},
    upload::{UPLOAD_FIELD, UploadError, validate_upload},
};

use super::{
    AppState,
    errors::ApiError,
    session::{SessionCookies, call_backend, require_tokens, respond},
};
use crate::{logging, metrics};

/// `POST /api/upload` with a single file under the `file` field.
///
/// # Response
///
/// The backend's `{ data, message }` for the stored file.
///
/// # Errors
///
/// - `401 Unauthorized`: no access token cookie
/// - `400 Bad Request`: missing field, disallowed type, empty file
/// - `413 Payload Too Large`: file above the configured limit
pub async fn upload_document(
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    require_tokens(&session)?;

    let mut multipart =
        multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let file = match read_file_field(&mut multipart, state.config.max_upload_bytes).await {
        Ok(file) => file,
        Err(ApiError::Upload(e)) => {
            metrics::uploads_rejected_total(rejection_reason(&e));
            logging::log_security_event(
                "upload_rejected",
                session.user_id.as_deref(),
                &e.to_string(),
            );
            return Err(ApiError::Upload(e));
        }
        Err(e) => return Err(e),
    };

    tracing::info!(
        file_name = %file.file_name,
        content_type = %file.content_type,
        size = file.bytes.len(),
        "Forwarding upload"
    );

    let request = ApiRequest::new(Method::POST, endpoints::FILE_UPLOAD).with_file(file);
    let outcome = call_backend(&state, &session, "upload", &request).await?;
    Ok(respond(&state, outcome))
}

/// Find the `file` field and validate it; other fields are skipped.
async fn read_file_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<UploadFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(validate_upload(
            file_name.as_deref(),
            content_type.as_deref(),
            bytes,
            max_bytes,
        )?);
    }

    Err(UploadError::MissingFile.into())
}

fn rejection_reason(error: &UploadError) -> &'static str {
    match error {
        UploadError::MissingFile => "missing",
        UploadError::DisallowedType(_) => "type",
        UploadError::Empty => "empty",
        UploadError::TooLarge { .. } => "size",
    }
}
