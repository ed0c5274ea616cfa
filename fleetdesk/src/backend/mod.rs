//! Client side of the backend REST API.
//!
//! This module provides:
//! - [`Backend`]: the seam between the proxy and the backend, implemented over
//!   HTTP by [`HttpBackend`]
//! - [`AuthenticatedCaller`]: the single-refresh retry policy shared by every
//!   authenticated proxy route
//! - [`endpoints`]: backend paths and the CRUD resources the dashboard manages
//!
//! ## Example
//!
//! ```no_run
//! use fleetdesk::backend::{ApiRequest, AuthenticatedCaller, HttpBackend};
//! use fleetdesk::session::TokenPair;
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpBackend::new("https://api.example.com", Duration::from_secs(15))?;
//!     let caller = AuthenticatedCaller::new(Arc::new(backend));
//!
//!     let tokens = TokenPair::new("access", Some("refresh".to_string()));
//!     let outcome = caller.call(&ApiRequest::get("/cars"), &tokens).await?;
//!     println!("{}", outcome.reply.envelope.data);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod endpoints;
pub mod errors;
pub mod models;
pub mod refresh;

pub use client::{Backend, HttpBackend};
pub use endpoints::{OfferAction, Resource};
pub use errors::{BackendError, BackendResult};
pub use models::{ApiRequest, BackendReply, Envelope, RequestBody, UploadFile};
pub use refresh::{AuthenticatedCaller, CallFailure, CallOutcome};
