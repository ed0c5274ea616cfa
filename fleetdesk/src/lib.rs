//! # FleetDesk
//!
//! Core of the FleetDesk rental admin dashboard server: everything between the
//! browser and the backend REST API that is not HTTP routing.
//!
//! ## Core Modules
//!
//! - [`session`]: identity cookies (`id`, `accessToken`, `refreshToken`) and
//!   the current user record
//! - [`backend`]: backend transport and the single-refresh retry wrapper
//! - [`gate`]: locale negotiation and auth routing for page requests
//! - [`notifications`]: broker subscription, topic derivation and the
//!   per-session notification feed
//! - [`upload`]: MIME allow-list for uploaded documents
//!
//! ## Example
//!
//! ```
//! use fleetdesk::session::Session;
//!
//! let session = Session::from_cookie_header(Some("accessToken=abc; id=7"));
//! assert!(session.is_present());
//! assert_eq!(session.user_id.as_deref(), Some("7"));
//! ```

/// Backend REST API client and retry policy.
pub mod backend;

/// Page request gate.
pub mod gate;

/// Live notifications.
pub mod notifications;

/// Browser session cookies and identity.
pub mod session;

/// Upload validation.
pub mod upload;

pub use backend::{AuthenticatedCaller, Backend, BackendError, HttpBackend};
pub use gate::{Gate, GateDecision};
pub use notifications::NotificationHub;
pub use session::{Session, TokenPair, UserProfile};
