//! WebSocket stream of live notification toasts.
//!
//! # Connection Flow
//!
//! 1. The browser connects to `GET /ws/notifications`; the session cookies
//!    travel with the upgrade request
//! 2. The server finds the user's active subscription and checks that the
//!    token cookie is the one it is bound to
//! 3. Every notification appended to the feed from then on is sent as one
//!    JSON text frame
//! 4. The socket closes when the browser leaves or the subscription ends
//!    (sign-out, broker connection lost); the dashboard reconnects after the
//!    next session bootstrap
//!
//! Incoming frames are ignored apart from close.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws/notifications');
//!
//! ws.onmessage = (event) => {
//!   const toast = JSON.parse(event.data);
//!   showToast(toast.severity, toast.message, toast.link);
//! };
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use fleetdesk::{
    BackendError,
    notifications::{Notification, SubscriberState},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use tokio::sync::{broadcast, watch};

use super::{
    AppState,
    errors::ApiError,
    session::{SessionCookies, require_tokens},
};
use crate::{logging, metrics};

/// Upgrade to a toast stream for the signed-in user.
///
/// # Response
///
/// `101 Switching Protocols` on success.
///
/// # Errors
///
/// - `401 Unauthorized`: no token or `id` cookie, or the token does not own
///   the subscription
/// - `404 Not Found`: the user has no active subscription
pub async fn notifications_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
) -> Response {
    let tokens = match require_tokens(&session) {
        Ok(tokens) => tokens,
        Err(e) => return e.into_response(),
    };
    let Some(user_id) = session.user_id else {
        return ApiError::Backend(BackendError::MissingToken).into_response();
    };

    let subscriber = match state.hub.authorize(&user_id, &tokens.access_token).await {
        Ok(Some(subscriber)) if subscriber.is_active() => subscriber,
        Ok(_) => {
            return ApiError::NotFound("No active notification subscription".to_string())
                .into_response();
        }
        Err(e) => {
            logging::log_security_event("notification_access_denied", Some(&user_id), &e.to_string());
            return ApiError::Backend(BackendError::MissingToken).into_response();
        }
    };

    // Subscribe before upgrading so nothing appended in between is missed
    let toasts = subscriber.feed().toasts();
    let subscription_state = subscriber.watch_state();

    ws.on_upgrade(move |socket| stream_toasts(socket, user_id, toasts, subscription_state))
}

async fn stream_toasts(
    socket: WebSocket,
    user_id: String,
    mut toasts: broadcast::Receiver<Notification>,
    mut subscription_state: watch::Receiver<SubscriberState>,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("Toast stream opened for user {}", user_id);

    loop {
        tokio::select! {
            toast = toasts.recv() => match toast {
                Ok(notification) => {
                    let json = match serde_json::to_string(&notification) {
                        Ok(j) => j,
                        Err(e) => {
                            error!("Failed to serialize notification: {}", e);
                            continue;
                        }
                    };

                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                    metrics::notifications_pushed_total();
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Toast stream for user {} lagged, {} dropped", user_id, skipped);
                    metrics::notifications_dropped_total(skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = subscription_state.changed() => {
                if changed.is_err()
                    || *subscription_state.borrow_and_update() == SubscriberState::Disconnected
                {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.send(Message::Close(None)).await;

    info!("Toast stream closed for user {}", user_id);
}
