//! Live notifications from the message broker.
//!
//! Each signed-in user gets one broker subscription. Its topics are derived
//! from the user's role and company ([`topics_for`]); every well-formed
//! message is appended to the user's [`NotificationFeed`] and broadcast as a
//! toast. Malformed payloads are logged and dropped.
//!
//! Topic naming follows `notifications/<scope>[/<id>]`.

pub mod broker;
pub mod errors;
pub mod feed;
pub mod hub;
pub mod models;
pub mod subscriber;
pub mod topics;

pub use broker::{BrokerConnector, BrokerSubscription, ChannelConnector, MqttConnector, MqttSettings};
pub use errors::SubscriberError;
pub use feed::NotificationFeed;
pub use hub::NotificationHub;
pub use models::{BrokerMessage, Notification, NotificationEvent, Severity};
pub use subscriber::{NotificationSubscriber, SubscriberState};
pub use topics::topics_for;
