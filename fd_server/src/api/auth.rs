//! Authentication API handlers.
//!
//! These endpoints relay credentials to the backend without a bearer token.
//! Tokens returned by the backend never reach page scripts: they are written
//! into HttpOnly cookies and only the user record is returned.
//!
//! # Examples
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:3000/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ops@example.com", "password": "Pass123!"}'
//! ```
//!
//! Start a password reset:
//! ```bash
//! curl -X POST http://localhost:3000/api/auth/forgot-password \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ops@example.com"}'
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fleetdesk::{
    BackendError,
    backend::{ApiRequest, Envelope, endpoints},
    session::LoginGrant,
};
use serde_json::Value;

use super::{
    AppState,
    errors::ApiError,
    session::{SessionCookies, append_cookies},
};
use crate::{logging, metrics};

/// Send an unauthenticated request and return the backend envelope.
async fn relay(state: &AppState, path: &str, body: Value) -> Result<(StatusCode, Envelope), ApiError> {
    let reply = state
        .caller
        .backend()
        .send(&ApiRequest::post(path, body), None)
        .await?;

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    Ok((status, reply.envelope))
}

/// Authenticate a user and start their session.
///
/// # Request Body
///
/// Passed to the backend unchanged (typically `{ "email", "password" }`).
///
/// # Response
///
/// On success, returns the backend status with `{ "data": <user>, "message" }`
/// and sets the `id`, `accessToken` and `refreshToken` cookies. The user's
/// notification subscription is (re)started.
///
/// # Errors
///
/// - `400`/`401`/`422`: Rejected credentials, message from the backend
/// - `500 Internal Server Error`: Backend unavailable or malformed reply
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let (status, envelope) = relay(&state, endpoints::LOGIN, body).await?;

    let grant: LoginGrant = serde_json::from_value(envelope.data)
        .map_err(|e| BackendError::Decode(format!("login grant: {}", e)))?;

    let tokens = grant.tokens();
    if let Err(e) = state.hub.sign_in(&grant.user, &tokens.access_token).await {
        tracing::warn!(user_id = %grant.user.id, "Notification subscription failed: {}", e);
    }
    metrics::active_subscriptions(state.hub.active_count().await);

    tracing::info!(user_id = %grant.user.id, "User signed in");

    let cookies = state.config.cookies.login_cookies(&grant.user.id, &tokens);
    let user = serde_json::to_value(&grant.user)
        .map_err(|e| BackendError::Decode(format!("user record: {}", e)))?;

    let mut response = (
        status,
        Json(Envelope::new(user, envelope.message)),
    )
        .into_response();
    append_cookies(&mut response, cookies);
    Ok(response)
}

/// End the session.
///
/// The backend is told about the logout when a token is present, but its
/// answer does not matter: cookies are always cleared. The notification
/// subscription is stopped when the token is the one it is bound to.
pub async fn logout(
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
) -> Response {
    let tokens = session.tokens();

    if let Some(tokens) = &tokens {
        let request = ApiRequest::new(axum::http::Method::POST, endpoints::LOGOUT);
        if let Err(e) = state
            .caller
            .backend()
            .send(&request, Some(&tokens.access_token))
            .await
        {
            tracing::warn!("Backend logout failed: {}", e);
        }
    }

    if let (Some(user_id), Some(tokens)) = (session.user_id.as_deref(), &tokens) {
        if state.hub.sign_out(user_id, &tokens.access_token).await {
            logging::log_security_event("logout", Some(user_id), "User signed out");
        } else {
            logging::log_security_event(
                "logout_foreign_session",
                Some(user_id),
                "Sign-out token does not own the notification subscription",
            );
        }
    }
    metrics::active_subscriptions(state.hub.active_count().await);

    let mut response = (
        StatusCode::OK,
        Json(Envelope::new(Value::Null, "Signed out")),
    )
        .into_response();
    append_cookies(&mut response, state.config.cookies.cleared_cookies());
    response
}

/// Request a password reset code.
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let (status, envelope) = relay(&state, endpoints::FORGOT_PASSWORD, body).await?;
    Ok((status, Json(envelope)))
}

/// Check a reset code.
pub async fn verify_code(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let (status, envelope) = relay(&state, endpoints::VERIFY_CODE, body).await?;
    Ok((status, Json(envelope)))
}

/// Set a new password with a verified code.
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let (status, envelope) = relay(&state, endpoints::RESET_PASSWORD, body).await?;
    Ok((status, Json(envelope)))
}
