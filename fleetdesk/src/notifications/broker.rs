//! Broker connections delivering notification messages.
//!
//! [`MqttConnector`] talks to the real broker. [`ChannelConnector`] routes
//! messages published in-process; the server uses it when no broker is
//! configured, and tests use it to inject traffic.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use super::{errors::SubscriberError, models::BrokerMessage};

/// Messages buffered between the broker connection and the feed.
const MESSAGE_BUFFER: usize = 128;

/// An open subscription. Dropping it closes the connection.
pub struct BrokerSubscription {
    pub messages: mpsc::Receiver<BrokerMessage>,
    driver: Option<JoinHandle<()>>,
}

impl BrokerSubscription {
    pub fn new(messages: mpsc::Receiver<BrokerMessage>, driver: Option<JoinHandle<()>>) -> Self {
        Self { messages, driver }
    }
}

impl Drop for BrokerSubscription {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Opens subscriptions on a publish/subscribe broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect as `client_id` and subscribe to every topic in `topics`.
    async fn subscribe(
        &self,
        client_id: &str,
        topics: &[String],
    ) -> Result<BrokerSubscription, SubscriberError>;
}

/// MQTT broker settings.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Connector backed by an MQTT broker via `rumqttc`.
pub struct MqttConnector {
    settings: MqttSettings,
}

impl MqttConnector {
    pub fn new(settings: MqttSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrokerConnector for MqttConnector {
    async fn subscribe(
        &self,
        client_id: &str,
        topics: &[String],
    ) -> Result<BrokerSubscription, SubscriberError> {
        let mut options = MqttOptions::new(client_id, &self.settings.host, self.settings.port);
        options.set_keep_alive(Duration::from_secs(self.settings.keep_alive_secs));
        options.set_clean_session(true);
        if let (Some(user), Some(pass)) = (&self.settings.username, &self.settings.password) {
            options.set_credentials(user, pass);
        }

        let (client, mut event_loop) = AsyncClient::new(options, topics.len().max(1) * 2);

        for topic in topics {
            client
                .subscribe(topic.as_str(), QoS::AtMostOnce)
                .await
                .map_err(|e| SubscriberError::Subscribe(e.to_string()))?;
        }

        // Drive the event loop until the broker acknowledges the connection.
        let connect = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(SubscriberError::Connect(e.to_string())),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(self.settings.connect_timeout_secs), connect)
            .await
            .map_err(|_| SubscriberError::Connect("timed out waiting for CONNACK".to_string()))??;

        info!("Connected to broker as {} ({} topics)", client_id, topics.len());

        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let client_id = client_id.to_string();
        let driver = tokio::spawn(async move {
            // Keeps the client (and so the request channel) alive for the loop.
            let _client = client;
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = BrokerMessage::new(publish.topic, publish.payload);
                        if tx.send(message).await.is_err() {
                            debug!("Subscriber for {} went away", client_id);
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // No reconnect: the session subscribes afresh on next sign-in.
                        warn!("Broker connection for {} lost: {}", client_id, e);
                        break;
                    }
                }
            }
        });

        Ok(BrokerSubscription::new(rx, Some(driver)))
    }
}

struct ChannelSubscriber {
    topics: Vec<String>,
    sender: mpsc::Sender<BrokerMessage>,
}

/// In-process connector: messages passed to [`ChannelConnector::publish`] are
/// delivered to every open subscription listening on that exact topic.
#[derive(Default)]
pub struct ChannelConnector {
    subscribers: Mutex<Vec<ChannelSubscriber>>,
}

impl ChannelConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` on `topic`. Returns the number of subscriptions reached.
    pub async fn publish(&self, topic: &str, payload: impl Into<bytes::Bytes>) -> usize {
        let payload = payload.into();
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|s| !s.sender.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| s.topics.iter().any(|t| t == topic)) {
            if subscriber
                .sender
                .send(BrokerMessage::new(topic, payload.clone()))
                .await
                .is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Drop every open connection, as a broker outage would.
    pub async fn disconnect_all(&self) {
        self.subscribers.lock().await.clear();
    }

    /// Number of subscriptions still open.
    pub async fn open_subscriptions(&self) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl BrokerConnector for ChannelConnector {
    async fn subscribe(
        &self,
        _client_id: &str,
        topics: &[String],
    ) -> Result<BrokerSubscription, SubscriberError> {
        let (sender, messages) = mpsc::channel(MESSAGE_BUFFER);
        self.subscribers.lock().await.push(ChannelSubscriber {
            topics: topics.to_vec(),
            sender,
        });
        Ok(BrokerSubscription::new(messages, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_connector_routes_by_topic() {
        let connector = ChannelConnector::new();
        let mut sub = connector
            .subscribe("c1", &["notifications/all".to_string()])
            .await
            .unwrap();

        assert_eq!(connector.publish("notifications/admins", "x").await, 0);
        assert_eq!(connector.publish("notifications/all", "hello").await, 1);

        let message = sub.messages.recv().await.unwrap();
        assert_eq!(message.topic, "notifications/all");
        assert_eq!(&message.payload[..], b"hello");
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let connector = ChannelConnector::new();
        let sub = connector
            .subscribe("c1", &["notifications/all".to_string()])
            .await
            .unwrap();
        assert_eq!(connector.open_subscriptions().await, 1);

        drop(sub);
        assert_eq!(connector.open_subscriptions().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_all_closes_streams() {
        let connector = ChannelConnector::new();
        let mut sub = connector
            .subscribe("c1", &["notifications/all".to_string()])
            .await
            .unwrap();

        connector.disconnect_all().await;
        assert!(sub.messages.recv().await.is_none());
    }
}
