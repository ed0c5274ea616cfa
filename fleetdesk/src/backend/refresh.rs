//! Token-refreshing wrapper around backend calls.
//!
//! Every authenticated call goes through [`AuthenticatedCaller::call`]. When
//! the backend rejects the access token, the caller exchanges the refresh
//! token once and replays the original request once with the new token. No
//! other failure is retried.
//!
//! New credentials are reported on success and on failure alike: once the
//! exchange succeeded the old refresh token may already be revoked.

use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use super::{
    client::Backend,
    errors::BackendError,
    models::{ApiRequest, BackendReply},
};
use crate::session::TokenPair;

/// Result of an authenticated call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub reply: BackendReply,
    /// New credentials when the call had to refresh; the caller must persist them
    pub refreshed: Option<TokenPair>,
}

/// Failed authenticated call.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CallFailure {
    pub error: BackendError,
    /// Credentials obtained before the replayed request failed
    pub refreshed: Option<TokenPair>,
}

impl From<BackendError> for CallFailure {
    fn from(error: BackendError) -> Self {
        Self {
            error,
            refreshed: None,
        }
    }
}

/// Wraps a [`Backend`] with the single-refresh retry policy.
#[derive(Clone)]
pub struct AuthenticatedCaller {
    backend: Arc<dyn Backend>,
}

impl AuthenticatedCaller {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Call the backend with `tokens`, refreshing at most once.
    ///
    /// # Errors
    ///
    /// - [`BackendError::SessionExpired`] when the token was rejected and the
    ///   refresh exchange failed or no refresh token was available
    /// - any error of the retried request, unchanged (a second rejection is
    ///   not refreshed again), together with the refreshed credentials
    pub async fn call(
        &self,
        request: &ApiRequest,
        tokens: &TokenPair,
    ) -> Result<CallOutcome, CallFailure> {
        match self.backend.send(request, Some(&tokens.access_token)).await {
            Ok(reply) => Ok(CallOutcome {
                reply,
                refreshed: None,
            }),
            Err(err) if err.is_token_rejected() => self.refresh_and_retry(request, tokens).await,
            Err(err) => Err(err.into()),
        }
    }

    async fn refresh_and_retry(
        &self,
        request: &ApiRequest,
        tokens: &TokenPair,
    ) -> Result<CallOutcome, CallFailure> {
        let Some(refresh_token) = tokens.refresh_token.as_deref() else {
            warn!("Access token rejected for {} and no refresh token present", request.path);
            return Err(BackendError::SessionExpired.into());
        };

        let fresh = match self.backend.refresh(refresh_token).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Refresh exchange failed for {}: {}", request.path, e);
                return Err(BackendError::SessionExpired.into());
            }
        };

        info!("Access token refreshed, replaying {} {}", request.method, request.path);

        match self.backend.send(request, Some(&fresh.access_token)).await {
            Ok(reply) => Ok(CallOutcome {
                reply,
                refreshed: Some(fresh),
            }),
            Err(error) => Err(CallFailure {
                error,
                refreshed: Some(fresh),
            }),
        }
    }
}
