//! Session cookie plumbing and the session bootstrap endpoint.

use std::{convert::Infallible, time::Instant};

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fleetdesk::{
    BackendError, Session, TokenPair, UserProfile,
    backend::{ApiRequest, CallFailure, CallOutcome, Resource},
};

use super::{
    AppState,
    errors::{ApiError, ExpiredSession, RefreshedSession},
};
use crate::{logging, metrics};

/// Identity cookies of the current request.
#[derive(Debug, Clone, Default)]
pub struct SessionCookies(pub Session);

impl<S> FromRequestParts<S> for SessionCookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionCookies(session_from_headers(&parts.headers)))
    }
}

/// Collect every `Cookie` header (HTTP/2 may split them) into a [`Session`].
pub fn session_from_headers(headers: &axum::http::HeaderMap) -> Session {
    let joined = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    Session::from_cookie_header((!joined.is_empty()).then_some(joined.as_str()))
}

/// Token pair for an authenticated call, or 401 before any network traffic.
pub fn require_tokens(session: &Session) -> Result<TokenPair, ApiError> {
    session
        .tokens()
        .ok_or(ApiError::Backend(BackendError::MissingToken))
}

/// Run `request` through the refresh wrapper, recording metrics and logs.
///
/// A refresh moves the user's notification binding to the new token. An
/// expired session also ends the user's notification subscription.
///
/// `label` names the resource in metrics.
pub async fn call_backend(
    state: &AppState,
    session: &Session,
    label: &str,
    request: &ApiRequest,
) -> Result<CallOutcome, ApiError> {
    let tokens = require_tokens(session)?;

    let started = Instant::now();
    let result = state.caller.call(request, &tokens).await;
    let elapsed = started.elapsed();

    let (status, refreshed) = match &result {
        Ok(outcome) => (outcome.reply.status, outcome.refreshed.as_ref()),
        Err(failure) => (failure.error.status_code(), failure.refreshed.as_ref()),
    };

    metrics::proxied_requests_total(label, status);
    metrics::backend_duration_ms(label, elapsed.as_secs_f64() * 1000.0);
    logging::log_backend_call(
        request.method.as_str(),
        &request.path,
        status,
        elapsed.as_millis() as u64,
        refreshed.is_some(),
    );

    if let Some(fresh) = refreshed {
        metrics::token_refreshes_total(true);
        if let Some(user_id) = session.user_id.as_deref() {
            state
                .hub
                .rotate_token(user_id, &tokens.access_token, &fresh.access_token)
                .await;
        }
    }

    match result {
        Ok(outcome) => Ok(outcome),
        Err(CallFailure {
            error: BackendError::SessionExpired,
            ..
        }) => {
            if tokens.refresh_token.is_some() {
                metrics::token_refreshes_total(false);
            }
            logging::log_security_event(
                "session_expired",
                session.user_id.as_deref(),
                "Access token rejected and could not be refreshed",
            );
            if let Some(user_id) = session.user_id.as_deref() {
                state.hub.sign_out(user_id, &tokens.access_token).await;
                metrics::active_subscriptions(state.hub.active_count().await);
            }
            Err(BackendError::SessionExpired.into())
        }
        Err(CallFailure {
            error,
            refreshed: Some(fresh),
        }) => Err(ApiError::Refreshed {
            error,
            tokens: fresh,
        }),
        Err(CallFailure { error, .. }) => Err(error.into()),
    }
}

/// Turn a successful backend call into the `{ data, message }` response,
/// rewriting the token cookies when the call refreshed them.
pub fn respond(state: &AppState, outcome: CallOutcome) -> Response {
    // The envelope is always sent, so an empty-body status cannot be mirrored
    let status = StatusCode::from_u16(outcome.reply.status)
        .ok()
        .filter(|status| *status != StatusCode::NO_CONTENT)
        .unwrap_or(StatusCode::OK);

    let mut response = (status, Json(outcome.reply.envelope)).into_response();
    if let Some(tokens) = outcome.refreshed {
        append_cookies(&mut response, state.config.cookies.refreshed_cookies(&tokens));
    }
    response
}

/// Append `Set-Cookie` headers to a response.
pub fn append_cookies(response: &mut Response, cookies: Vec<String>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Refusing to send malformed cookie: {}", e),
        }
    }
}

/// Apply session changes carried by error responses: clear the cookies of
/// an [`ExpiredSession`], rewrite them for a [`RefreshedSession`].
pub async fn sync_session_cookies(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if response.extensions().get::<ExpiredSession>().is_some() {
        append_cookies(&mut response, state.config.cookies.cleared_cookies());
    } else if let Some(RefreshedSession(tokens)) =
        response.extensions_mut().remove::<RefreshedSession>()
    {
        append_cookies(&mut response, state.config.cookies.refreshed_cookies(&tokens));
    }
    response
}

/// Load the signed-in user and make sure their notifications are flowing.
///
/// # Response
///
/// `200 OK` with `{ "data": <user>, "message": ... }`.
///
/// # Errors
///
/// - `401 Unauthorized`: missing `id` or token cookie, or the session expired
/// - backend errors mapped as for any proxied call
pub async fn bootstrap(
    State(state): State<AppState>,
    SessionCookies(session): SessionCookies,
) -> Result<Response, ApiError> {
    let user_id = session
        .user_id
        .clone()
        .ok_or(ApiError::Backend(BackendError::MissingToken))?;
    let tokens = require_tokens(&session)?;

    let request = ApiRequest::get(Resource::Users.item_path(&user_id)?);
    let outcome = call_backend(&state, &session, Resource::Users.slug(), &request).await?;

    let user: UserProfile = serde_json::from_value(outcome.reply.envelope.data.clone())
        .map_err(|e| BackendError::Decode(format!("user record: {}", e)))?;

    let access_token = match &outcome.refreshed {
        Some(fresh) => fresh.access_token.as_str(),
        None => tokens.access_token.as_str(),
    };
    if let Err(e) = state.hub.ensure_started(&user, access_token).await {
        // The dashboard works without live notifications
        tracing::warn!(user_id = %user.id, "Notification subscription failed: {}", e);
    }
    metrics::active_subscriptions(state.hub.active_count().await);

    Ok(respond(&state, outcome))
}
