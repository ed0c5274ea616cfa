//! Notification subscriber error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriberError {
    /// Could not reach or authenticate with the broker
    #[error("Broker connection failed: {0}")]
    Connect(String),

    /// The broker refused a topic subscription
    #[error("Topic subscription failed: {0}")]
    Subscribe(String),

    /// A subscription is already active for this session
    #[error("Subscriber already running")]
    AlreadyRunning,

    /// The presented access token is not the one the subscription belongs to
    #[error("Subscription belongs to another session")]
    TokenMismatch,
}
