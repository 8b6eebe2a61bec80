use serde::{Deserialize, Serialize};

use crate::hub::Message;

/// Messages a gateway client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Publish { topic: String, payload: String },
}

/// Messages the gateway sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed {
        topic: String,
    },
    Unsubscribed {
        topic: String,
    },
    Event {
        topic: String,
        payload: String,
        timestamp: i64,
        message_id: String,
    },
    Published {
        topic: String,
        delivered: usize,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

impl From<Message> for ServerMessage {
    fn from(msg: Message) -> Self {
        ServerMessage::Event {
            topic: msg.topic,
            payload: msg.payload,
            timestamp: msg.timestamp,
            message_id: msg.message_id,
        }
    }
}
