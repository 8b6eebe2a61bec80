use serde::{Deserialize, Serialize};

/// A message published on the realtime hub.
///
/// # Fields
///
/// - `topic` - The topic this message belongs to.
/// - `payload` - Opaque content, usually a JSON-encoded string.
/// - `timestamp` - Unix timestamp in milliseconds, stamped by the hub on publish.
/// - `message_id` - Unique id; generated by the hub when left empty.
///
/// # Example
///
/// ```rust
/// use submux::hub::Message;
///
/// let msg = Message::new("events:global", "{\"event_id\":12,\"change\":\"update\"}");
/// assert_eq!(msg.topic, "events:global");
/// assert!(msg.message_id.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub message_id: String,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: 0,
            message_id: String::new(),
        }
    }
}
