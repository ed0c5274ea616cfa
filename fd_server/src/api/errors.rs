//! Translation of every failure into the `{ message }` response shape.

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fleetdesk::{BackendError, TokenPair, upload::UploadError};
use serde::Serialize;
use thiserror::Error;

/// Failure body sent to the browser.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Marker placed on responses whose session can no longer be refreshed.
///
/// [`super::session::sync_session_cookies`] turns it into cookie removal.
#[derive(Debug, Clone, Copy)]
pub struct ExpiredSession;

/// Tokens refreshed by a call that then failed; written back as cookies.
#[derive(Debug, Clone)]
pub struct RefreshedSession(pub TokenPair);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Backend failure after the tokens were refreshed
    #[error("{error}")]
    Refreshed { error: BackendError, tokens: TokenPair },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Backend(e) | ApiError::Refreshed { error: e, .. } => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upload(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message safe to show in the dashboard.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Backend(e) | ApiError::Refreshed { error: e, .. } => e.client_message(),
            ApiError::Multipart(e) => e.body_text(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut response = (
            status,
            Json(ErrorResponse {
                message: self.client_message(),
            }),
        )
            .into_response();

        match self {
            ApiError::Backend(BackendError::SessionExpired) => {
                response.extensions_mut().insert(ExpiredSession);
            }
            ApiError::Refreshed { tokens, .. } => {
                response.extensions_mut().insert(RefreshedSession(tokens));
            }
            _ => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_statuses_are_mapped() {
        let err = ApiError::from(BackendError::Status {
            status: 422,
            message: "Plate number already registered".to_string(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.client_message(), "Plate number already registered");

        let err = ApiError::from(BackendError::Status {
            status: 503,
            message: "upstream connect error".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_session_expired_is_marked() {
        let response = ApiError::from(BackendError::SessionExpired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.extensions().get::<ExpiredSession>().is_some());

        let response = ApiError::from(BackendError::MissingToken).into_response();
        assert!(response.extensions().get::<ExpiredSession>().is_none());
    }

    #[test]
    fn test_failure_after_refresh_keeps_tokens() {
        let err = ApiError::Refreshed {
            error: BackendError::Status {
                status: 422,
                message: "Price must be positive".to_string(),
            },
            tokens: TokenPair::new("a2", Some("r2".to_string())),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.client_message(), "Price must be positive");

        let response = err.into_response();
        let RefreshedSession(tokens) = response.extensions().get::<RefreshedSession>().unwrap();
        assert_eq!(tokens.access_token, "a2");
        assert!(response.extensions().get::<ExpiredSession>().is_none());
    }

    #[test]
    fn test_upload_errors() {
        let err = ApiError::from(UploadError::DisallowedType("text/plain".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "File type 'text/plain' is not allowed");

        let err = ApiError::from(UploadError::TooLarge { max_bytes: 10 });
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
