//! Live notification subscription for one signed-in user.
//!
//! State machine:
//!
//! ```text
//! Disconnected --start--> Connecting --subscribed--> Subscribed(topics)
//!      ^                      |                            |
//!      +------ connect error -+---- stop / stream closed --+
//! ```
//!
//! There is no resumption: a new subscription starts from whatever the
//! broker delivers after it connects.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use uuid::Uuid;

use super::{
    broker::BrokerConnector, errors::SubscriberError, feed::NotificationFeed, topics::topics_for,
};
use crate::session::{UserId, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "topics", rename_all = "snake_case")]
pub enum SubscriberState {
    Disconnected,
    Connecting,
    Subscribed(Vec<String>),
}

/// Broker subscription feeding one user's [`NotificationFeed`].
pub struct NotificationSubscriber {
    user_id: UserId,
    feed: Arc<NotificationFeed>,
    state: Arc<watch::Sender<SubscriberState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationSubscriber {
    pub fn new(user_id: UserId) -> Self {
        let (state, _) = watch::channel(SubscriberState::Disconnected);
        Self {
            user_id,
            feed: Arc::new(NotificationFeed::new()),
            state: Arc::new(state),
            task: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn feed(&self) -> &Arc<NotificationFeed> {
        &self.feed
    }

    pub fn state(&self) -> SubscriberState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.state() != SubscriberState::Disconnected
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SubscriberState> {
        self.state.subscribe()
    }

    /// Connect and start appending messages for `user` to the feed.
    ///
    /// # Errors
    ///
    /// - [`SubscriberError::AlreadyRunning`] if a subscription is active
    /// - connector errors; the state returns to `Disconnected`
    pub async fn start(
        &self,
        user: &UserProfile,
        connector: &dyn BrokerConnector,
    ) -> Result<(), SubscriberError> {
        let mut task = self.task.lock().await;
        if self.is_active() {
            return Err(SubscriberError::AlreadyRunning);
        }

        self.state.send_replace(SubscriberState::Connecting);

        let topics = topics_for(user);
        let client_id = format!("fleetdesk-{}-{}", user.id, Uuid::new_v4().simple());

        let mut subscription = match connector.subscribe(&client_id, &topics).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.state.send_replace(SubscriberState::Disconnected);
                return Err(e);
            }
        };

        info!("User {} subscribed to {:?}", user.id, topics);
        self.state.send_replace(SubscriberState::Subscribed(topics));

        let feed = self.feed.clone();
        let state = self.state.clone();
        let user_id = self.user_id.clone();
        *task = Some(tokio::spawn(async move {
            while let Some(message) = subscription.messages.recv().await {
                feed.ingest(&message).await;
            }
            warn!("Notification stream for user {} closed", user_id);
            state.send_replace(SubscriberState::Disconnected);
        }));

        Ok(())
    }

    /// Tear the subscription down and drop the session's notifications.
    pub async fn stop(&self) {
        let running = self.task.lock().await.take();
        if let Some(task) = running {
            task.abort();
            // Wait for the task to drop its subscription (and connection).
            let _ = task.await;
        }
        self.state.send_replace(SubscriberState::Disconnected);
        self.feed.clear().await;
    }
}
