//! Structured logging configuration.
//!
//! This module provides structured logging with request correlation,
//! backend call timing, and security event tracking.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var. Records emitted
/// through the `log` facade (the core library) are captured as well.
///
/// # Example
///
/// ```no_run
/// use fd_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn,rumqttc=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - Optional user ID
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use fd_server::logging::log_security_event;
///
/// log_security_event("refresh_failed", Some("42"), "Refresh token rejected by backend");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<&str>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

/// Log a proxied backend call
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Backend path
/// * `status_code` - Status the proxy answered with
/// * `duration_ms` - Time spent waiting on the backend
/// * `refreshed` - Whether the call went through a token refresh
pub fn log_backend_call(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    refreshed: bool,
) {
    if duration_ms > 1000 {
        tracing::warn!(
            http_method = method,
            backend_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            refreshed = refreshed,
            "PERFORMANCE: Slow backend call"
        );
    } else {
        tracing::info!(
            http_method = method,
            backend_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            refreshed = refreshed,
            "Backend call completed"
        );
    }
}
