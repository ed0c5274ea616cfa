//! Prometheus metrics for the proxy and notification relay.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener.
//! When no exporter is installed the recording calls are no-ops.
//!
//! # Metrics Categories
//!
//! - **Proxy Metrics**: Proxied requests by resource and status, backend latency
//! - **Auth Metrics**: Refresh exchanges by outcome
//! - **Notification Metrics**: Toasts pushed and dropped, active subscriptions
//! - **Upload Metrics**: Rejected uploads
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use fd_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::proxied_requests_total("cars", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Proxy Metrics
// ============================================================================

/// Record a proxied request and the status the browser received.
pub fn proxied_requests_total(resource: &str, status: u16) {
    metrics::counter!("proxied_requests_total",
        "resource" => resource.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record time spent waiting on the backend in milliseconds.
pub fn backend_duration_ms(resource: &str, duration_ms: f64) {
    metrics::histogram!("backend_duration_ms",
        "resource" => resource.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a refresh exchange.
pub fn token_refreshes_total(success: bool) {
    metrics::counter!("token_refreshes_total",
        "success" => success.to_string()
    )
    .increment(1);
}

// ============================================================================
// Notification Metrics
// ============================================================================

/// Set current active broker subscriptions count.
pub fn active_subscriptions(count: usize) {
    metrics::gauge!("active_subscriptions").set(count as f64);
}

/// Increment toasts delivered to a browser.
pub fn notifications_pushed_total() {
    metrics::counter!("notifications_pushed_total").increment(1);
}

/// Record toasts skipped because a socket fell behind.
pub fn notifications_dropped_total(count: u64) {
    metrics::counter!("notifications_dropped_total").increment(count);
}

// ============================================================================
// Upload Metrics
// ============================================================================

/// Increment rejected upload counter.
pub fn uploads_rejected_total(reason: &str) {
    metrics::counter!("uploads_rejected_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}
