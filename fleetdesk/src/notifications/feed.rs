//! Per-session notification list and live toast channel.

use std::collections::VecDeque;

use log::warn;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::models::{BrokerMessage, Notification, NotificationEvent};

/// Toasts buffered for slow listeners before they start lagging.
const TOAST_BUFFER: usize = 64;

/// Notifications kept per session; the oldest is dropped beyond this.
pub const MAX_FEED_ITEMS: usize = 200;

/// Ordered notification list for one signed-in session.
///
/// Notifications are appended in arrival order and every append is also
/// broadcast as a toast to live listeners. At most `capacity` are kept.
pub struct NotificationFeed {
    items: RwLock<VecDeque<Notification>>,
    capacity: usize,
    toasts: broadcast::Sender<Notification>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::with_capacity(MAX_FEED_ITEMS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (toasts, _) = broadcast::channel(TOAST_BUFFER);
        Self {
            items: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
            toasts,
        }
    }

    /// Parse a broker message and append it.
    ///
    /// Malformed payloads are logged and dropped; `None` is returned for them.
    pub async fn ingest(&self, message: &BrokerMessage) -> Option<Notification> {
        let event: NotificationEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed notification on {}: {}", message.topic, e);
                return None;
            }
        };

        let notification = Notification::from_event(event, message.topic.clone());
        self.push(notification.clone()).await;
        Some(notification)
    }

    pub async fn push(&self, notification: Notification) {
        {
            let mut items = self.items.write().await;
            if items.len() >= self.capacity {
                items.pop_front();
            }
            items.push_back(notification.clone());
        }
        // No listener is not an error; the list still holds it.
        let _ = self.toasts.send(notification);
    }

    /// Snapshot of the list in arrival order.
    pub async fn list(&self) -> Vec<Notification> {
        self.items.read().await.iter().cloned().collect()
    }

    /// Remove one notification. Returns `false` if it was not in the list.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|n| n.id != id);
        items.len() != before
    }

    pub async fn clear(&self) {
        self.items.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Listen for notifications appended from now on.
    pub fn toasts(&self) -> broadcast::Receiver<Notification> {
        self.toasts.subscribe()
    }
}
