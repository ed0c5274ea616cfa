//! HTTP/WebSocket API for the FleetDesk dashboard server.
//!
//! The browser never talks to the backend REST API directly. Every data call
//! goes through this server, which reads the session cookies, attaches the
//! bearer token, refreshes it once when the backend rejects it, and rewrites
//! the cookies when the tokens change.
//!
//! # Modules
//!
//! - [`auth`]: sign-in, sign-out and password recovery relays
//! - [`proxy`]: generic resource CRUD, trip offer actions and statistics
//! - [`session`]: cookie extraction, session bootstrap, cookie rewriting
//! - [`upload`]: multipart document upload
//! - [`notifications`]: the signed-in user's notification feed
//! - [`websocket`]: live toast stream
//! - [`gate`]: locale and auth routing for page requests
//! - [`request_id`]: request correlation
//!
//! # Endpoints Overview
//!
//! ## Authentication (No Token Required)
//! - `POST /api/auth/login` - Sign in, sets session cookies
//! - `POST /api/auth/logout` - Sign out, clears session cookies
//! - `POST /api/auth/forgot-password` - Request a reset code
//! - `POST /api/auth/verify-code` - Verify a reset code
//! - `POST /api/auth/reset-password` - Set a new password
//!
//! ## Resources (Token Required)
//! - `GET|POST /api/{resource}` - List / create
//! - `GET|PATCH|DELETE /api/{resource}/{id}` - Read / update / delete
//! - `POST /api/trip-offers/{id}/{accept|reject|counter}` - Offer negotiation
//! - `GET /api/statistics` - Dashboard statistics
//! - `GET /api/session` - Current user, starts notifications
//! - `POST /api/upload` - Document upload
//!
//! ## Notifications
//! - `GET /api/notifications` - Feed
//! - `DELETE /api/notifications/{id}` - Dismiss one
//! - `DELETE /api/notifications` - Dismiss all
//! - `GET /ws/notifications` - Live toasts
//!
//! ## Health Check
//! - `GET /health` - Server health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fd_server::api::{create_router, AppState};
//! use fd_server::config::{ConfigOverrides, ServerConfig};
//! use fleetdesk::notifications::{ChannelConnector, NotificationHub};
//! use fleetdesk::HttpBackend;
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let config = ServerConfig::from_env(ConfigOverrides::default())?;
//! let backend = HttpBackend::new(&config.backend.base_url, config.backend.timeout())?;
//! let hub = NotificationHub::new(Arc::new(ChannelConnector::new()));
//!
//! let state = AppState::new(Arc::new(backend), Arc::new(hub), config);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod errors;
pub mod gate;
pub mod notifications;
pub mod proxy;
pub mod request_id;
pub mod session;
pub mod upload;
pub mod websocket;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use fleetdesk::{AuthenticatedCaller, Backend, Gate, NotificationHub};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::config::ServerConfig;

/// Multipart framing allowance on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    /// Backend client with the refresh-once policy
    pub caller: AuthenticatedCaller,
    /// Per-user notification subscriptions
    pub hub: Arc<NotificationHub>,
    /// Page request gate
    pub gate: Arc<Gate>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, hub: Arc<NotificationHub>, config: ServerConfig) -> Self {
        let gate = Gate::new(
            config.locales.supported.clone(),
            config.locales.default.clone(),
        );

        Self {
            caller: AuthenticatedCaller::new(backend),
            hub,
            gate: Arc::new(gate),
            config: Arc::new(config),
        }
    }
}

/// Create the complete router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health                             - Health check
/// POST   /api/auth/{login,logout}            - Session lifecycle
/// POST   /api/auth/{forgot-password,...}     - Password recovery
/// GET    /api/session                        - Session bootstrap
/// GET    /api/statistics                     - Dashboard statistics
/// POST   /api/upload                         - Document upload
/// GET    /api/notifications                  - Notification feed
/// DELETE /api/notifications[/{id}]           - Dismiss notifications
/// POST   /api/trip-offers/{id}/{action}      - Offer negotiation
/// *      /api/{resource}[/{id}]              - Resource CRUD
/// GET    /ws/notifications                   - Live toasts
/// *      everything else                     - Dashboard pages (gated)
/// ```
pub fn create_router(state: AppState) -> Router {
    let api_routes = create_api_router(&state);

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/notifications", get(websocket::notifications_socket));

    // Pages are only served when a build directory is configured
    let pages = match &state.config.static_dir {
        Some(dir) => Router::new().fallback_service(ServeDir::new(dir)),
        None => Router::new().fallback(page_not_found),
    };

    Router::new()
        .merge(root_routes)
        .nest("/api", api_routes)
        .merge(pages)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        ))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Routes under `/api`.
///
/// Fixed routes take precedence over the `{resource}` captures.
fn create_api_router(state: &AppState) -> Router<AppState> {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-code", post(auth::verify_code))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/session", get(session::bootstrap))
        .route("/statistics", get(proxy::statistics))
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/notifications",
            get(notifications::list_notifications).delete(notifications::clear_notifications),
        )
        .route(
            "/notifications/{id}",
            delete(notifications::remove_notification),
        )
        .route("/trip-offers/{id}/{action}", post(proxy::offer_action))
        .route(
            "/{resource}",
            get(proxy::list_resources).post(proxy::create_resource),
        )
        .route(
            "/{resource}/{id}",
            get(proxy::get_resource)
                .patch(proxy::update_resource)
                .delete(proxy::delete_resource),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::sync_session_cookies,
        ))
}

/// Health check endpoint for monitoring and load balancers.
///
/// The server holds no backend connection of its own, so it reports healthy
/// whenever it can answer.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.4.0","subscriptions":3,"timestamp":"2026-10-16T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let subscriptions = state.hub.active_count().await;
    crate::metrics::active_subscriptions(subscriptions);

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "subscriptions": subscriptions,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}

async fn page_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}
