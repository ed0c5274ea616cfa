//! Notification feed endpoints.
//!
//! The feed belongs to the user named by the `id` cookie and lives only as
//! long as their subscription. It is only handed out to the session whose
//! access token the subscription is bound to. A user without a subscription
//! has an empty feed.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use fleetdesk::{BackendError, Session, backend::Envelope, notifications::NotificationFeed};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    AppState,
    errors::ApiError,
    session::{SessionCookies, require_tokens},
};
use crate::logging;

/// Resolve the caller's feed; a token is required like for any data call.
async fn caller_feed(
    state: &AppState,
    session: &Session,
) -> Result<Option<Arc<NotificationFeed>>, ApiError> {
    let tokens = require_tokens(session)?;
    let user_id = session
        .user_id
        .as_deref()
        .ok_or(ApiError::Backend(BackendError::MissingToken))?;

    match state.hub.authorize(user_id, &tokens.access_token).await {
        Ok(subscriber) => Ok(subscriber.map(|s| s.feed().clone())),
        Err(e) => {
            logging::log_security_event("notification_access_denied", Some(user_id), &e.to_string());
            Err(ApiError::Backend(BackendError::MissingToken))
        }
    }
}

/// `GET /api/notifications`, oldest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
) -> Result<impl IntoResponse, ApiError> {
    let items = match caller_feed(&state, &session).await? {
        Some(feed) => feed.list().await,
        None => Vec::new(),
    };

    Ok(Json(json!({ "data": items, "message": "Notifications fetched" })))
}

/// `DELETE /api/notifications/{id}`
pub async fn remove_notification(
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let feed = caller_feed(&state, &session).await?;
    let not_found = || ApiError::NotFound(format!("Notification '{}' not found", id));

    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let removed = match feed {
        Some(feed) => feed.remove(id).await,
        None => false,
    };
    if !removed {
        return Err(not_found());
    }

    Ok(Json(Envelope::new(Value::Null, "Notification removed")))
}

/// `DELETE /api/notifications`
pub async fn clear_notifications(
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(feed) = caller_feed(&state, &session).await? {
        feed.clear().await;
    }

    Ok(Json(Envelope::new(Value::Null, "Notifications cleared")))
}
