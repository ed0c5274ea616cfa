//! Page request gate middleware.
//!
//! Runs in front of everything; API, socket, health and asset paths pass
//! straight through, page paths get locale and sign-in redirects.

use axum::{
    extract::{Request, State},
    http::header::ACCEPT_LANGUAGE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use fleetdesk::GateDecision;

use super::{AppState, session::session_from_headers};

/// Apply the gate decision for the request path.
///
/// Redirects are temporary (`307`) so the browser re-evaluates them after
/// signing in or switching language.
pub async fn gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = session_from_headers(request.headers());
    let accept_language = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());

    let decision = state.gate.evaluate(
        request.uri().path(),
        request.uri().query(),
        &session,
        accept_language,
    );

    match decision {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(target) => {
            tracing::debug!(path = %request.uri().path(), target = %target, "Gate redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}
