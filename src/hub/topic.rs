use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::hub::message::Message;

pub type ChannelId = String;

/// Channels currently open on one hub topic.
///
/// Each channel is a broadcast sender; publishing on the topic sends to all
/// of them.
#[derive(Debug, Default)]
pub struct TopicChannels {
    pub name: String,
    pub channels: HashMap<ChannelId, broadcast::Sender<Message>>,
}

impl TopicChannels {
    /// Creates a new instance with no open channels.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            channels: HashMap::new(),
        }
    }

    /// Registers a channel. An id that is already present is replaced.
    pub fn open(&mut self, id: ChannelId, sender: broadcast::Sender<Message>) {
        self.channels.insert(id, sender);
    }

    /// Removes a channel, returning whether it was open.
    pub fn close(&mut self, id: &str) -> bool {
        self.channels.remove(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
