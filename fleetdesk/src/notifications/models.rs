//! Notification data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Payload published on a notification topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationEvent {
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub link: Option<String>,
}

/// Notification held in a session's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub topic: String,
    pub received_at: DateTime<Utc>,
}

impl Notification {
    /// Stamp an event with a fresh id at receipt.
    pub fn from_event(event: NotificationEvent, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: event.message,
            severity: event.severity,
            link: event.link,
            topic: topic.into(),
            received_at: Utc::now(),
        }
    }
}

/// Raw message as delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: bytes::Bytes,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<bytes::Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
