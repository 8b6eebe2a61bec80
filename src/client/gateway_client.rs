use std::collections::HashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::hub::ChannelHandle;
use crate::multiplexer::Subscription;
use crate::transport::message::ServerMessage;
use crate::utils::error::{GatewayError, MultiplexError};

/// A topic this client holds, and the task copying its events to the client.
struct HeldTopic {
    subscription: Subscription<ChannelHandle>,
    forwarder: JoinHandle<()>,
}

/// Represents a connected WebSocket client of the gateway.
///
/// Each client is uniquely identified by an `id`, has a channel (`sender`)
/// for outbound WebSocket messages, and owns one multiplexer reference per
/// topic it is subscribed to.
pub struct Client {
    /// Unique identifier for the client (`client-<uuid>`).
    pub id: String,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,

    topics: HashMap<String, HeldTopic>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
            topics: HashMap::new(),
        }
    }

    /// Queues a message for the client. Fails only if encoding fails; a
    /// closed outbound queue means the client is gone and is ignored.
    pub fn send(&self, msg: &ServerMessage) -> Result<(), GatewayError> {
        let text = serde_json::to_string(msg)?;
        if self.sender.send(WsMessage::text(text)).is_err() {
            debug!(client = %self.id, "outbound queue closed; message dropped");
        }
        Ok(())
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Returns sorted list of topics the client holds.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    /// Takes ownership of `subscription` and starts forwarding its events.
    ///
    /// Replaces (and releases) a previous subscription to the same topic.
    pub fn attach(&mut self, subscription: Subscription<ChannelHandle>) {
        let topic = subscription.topic().to_string();
        let forwarder = spawn_forwarder(
            self.id.clone(),
            topic.clone(),
            subscription.listen(),
            self.sender.clone(),
        );

        if let Some(previous) = self.topics.insert(
            topic,
            HeldTopic {
                subscription,
                forwarder,
            },
        ) {
            previous.forwarder.abort();
        }
    }

    /// Stops forwarding `topic` and releases its reference.
    ///
    /// Returns `None` if the client was not subscribed.
    pub async fn detach(&mut self, topic: &str) -> Option<Result<(), MultiplexError>> {
        let held = self.topics.remove(topic)?;
        held.forwarder.abort();
        Some(held.subscription.release().await)
    }

    /// Releases every topic the client still holds. Returns how many were held.
    pub async fn detach_all(&mut self) -> usize {
        let held: Vec<String> = self.topics.keys().cloned().collect();
        for topic in &held {
            if let Some(Err(e)) = self.detach(topic).await {
                warn!(client = %self.id, topic = %topic, error = %e, "release on disconnect failed");
            }
        }
        held.len()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Subscriptions release themselves; the forwarders would otherwise
        // keep running until their channel closes.
        for held in self.topics.values() {
            held.forwarder.abort();
        }
    }
}

fn spawn_forwarder(
    client_id: String,
    topic: String,
    mut events: tokio::sync::broadcast::Receiver<crate::hub::Message>,
    sender: UnboundedSender<WsMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(msg) => {
                    let text = match serde_json::to_string(&ServerMessage::from(msg)) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(client = %client_id, error = %e, "failed to encode event");
                            continue;
                        }
                    };
                    if sender.send(WsMessage::text(text)).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(client = %client_id, topic = %topic, skipped, "client fell behind; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(client = %client_id, topic = %topic, "event forwarder stopped");
    })
}
