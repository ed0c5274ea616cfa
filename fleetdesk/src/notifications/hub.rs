//! Registry of live notification subscriptions, one per signed-in user.
//!
//! Each subscription is bound to the access token of the session that opened
//! it. The `id` cookie alone names a user but proves nothing, so reads and
//! sign-out require the bound token; a refresh moves the binding along.

use std::{collections::HashMap, sync::Arc};

use log::{info, warn};
use tokio::sync::RwLock;

use super::{
    broker::BrokerConnector, errors::SubscriberError, feed::NotificationFeed,
    subscriber::NotificationSubscriber,
};
use crate::session::{UserId, UserProfile};

struct Binding {
    subscriber: Arc<NotificationSubscriber>,
    access_token: String,
}

/// Owns every user's subscriber and the connector they open connections with.
pub struct NotificationHub {
    connector: Arc<dyn BrokerConnector>,
    subscribers: RwLock<HashMap<UserId, Binding>>,
}

impl NotificationHub {
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self {
            connector,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Start a fresh subscription at sign-in, replacing any previous one.
    ///
    /// `access_token` was just issued by the backend for `user`.
    pub async fn sign_in(&self, user: &UserProfile, access_token: &str) -> Result<(), SubscriberError> {
        let subscriber = Arc::new(NotificationSubscriber::new(user.id.clone()));
        let previous = self.subscribers.write().await.insert(
            user.id.clone(),
            Binding {
                subscriber: subscriber.clone(),
                access_token: access_token.to_string(),
            },
        );

        if let Some(previous) = previous {
            previous.subscriber.stop().await;
        }

        subscriber.start(user, self.connector.as_ref()).await
    }

    /// Make sure `user` has a running subscription, keeping an existing feed.
    ///
    /// Used by session bootstrap on every page load; a subscription lost to a
    /// connection error is reopened here. An existing subscription is only
    /// reused by the session it is bound to.
    ///
    /// # Errors
    ///
    /// - [`SubscriberError::TokenMismatch`] if another session owns it
    /// - connector errors from starting the subscription
    pub async fn ensure_started(
        &self,
        user: &UserProfile,
        access_token: &str,
    ) -> Result<(), SubscriberError> {
        let subscriber = {
            let mut subscribers = self.subscribers.write().await;
            let binding = subscribers.entry(user.id.clone()).or_insert_with(|| Binding {
                subscriber: Arc::new(NotificationSubscriber::new(user.id.clone())),
                access_token: access_token.to_string(),
            });
            if binding.access_token != access_token {
                return Err(SubscriberError::TokenMismatch);
            }
            binding.subscriber.clone()
        };

        if subscriber.is_active() {
            return Ok(());
        }

        match subscriber.start(user, self.connector.as_ref()).await {
            Err(SubscriberError::AlreadyRunning) => Ok(()),
            other => other,
        }
    }

    /// Subscriber of `user_id`, if `access_token` is the one it is bound to.
    ///
    /// `Ok(None)` when the user has no subscription.
    pub async fn authorize(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<Arc<NotificationSubscriber>>, SubscriberError> {
        match self.subscribers.read().await.get(user_id) {
            None => Ok(None),
            Some(binding) if binding.access_token == access_token => {
                Ok(Some(binding.subscriber.clone()))
            }
            Some(_) => Err(SubscriberError::TokenMismatch),
        }
    }

    /// Follow a token refresh. Only the session holding the bound token can
    /// move the binding.
    pub async fn rotate_token(&self, user_id: &str, previous: &str, fresh: &str) {
        if let Some(binding) = self.subscribers.write().await.get_mut(user_id) {
            if binding.access_token == previous {
                binding.access_token = fresh.to_string();
            }
        }
    }

    /// Tear down a user's subscription at sign-out or session expiry.
    ///
    /// Returns `false` without touching anything when `access_token` is not
    /// the bound one.
    pub async fn sign_out(&self, user_id: &str, access_token: &str) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.write().await;
            match subscribers.get(user_id) {
                Some(binding) if binding.access_token == access_token => subscribers.remove(user_id),
                Some(_) => {
                    warn!("Refusing to stop notifications of user {} for a foreign token", user_id);
                    return false;
                }
                None => None,
            }
        };

        if let Some(binding) = removed {
            binding.subscriber.stop().await;
            info!("Notification subscription for user {} stopped", user_id);
        }
        true
    }

    pub async fn subscriber(&self, user_id: &str) -> Option<Arc<NotificationSubscriber>> {
        self.subscribers
            .read()
            .await
            .get(user_id)
            .map(|b| b.subscriber.clone())
    }

    pub async fn feed(&self, user_id: &str) -> Option<Arc<NotificationFeed>> {
        self.subscriber(user_id).await.map(|s| s.feed().clone())
    }

    /// Number of users with a connected (or connecting) subscription.
    pub async fn active_count(&self) -> usize {
        self.subscribers
            .read()
            .await
            .values()
            .filter(|b| b.subscriber.is_active())
            .count()
    }

    /// Stop every subscription, e.g. at server shutdown.
    pub async fn shutdown(&self) {
        let drained: Vec<_> = self.subscribers.write().await.drain().collect();
        for (_, binding) in drained {
            binding.subscriber.stop().await;
        }
    }
}
