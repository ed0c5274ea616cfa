//! FleetDesk dashboard server.
//!
//! Serves the dashboard pages behind the locale/sign-in gate, proxies data
//! calls to the backend REST API with cookie-held credentials, and relays
//! broker notifications to signed-in browsers.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
