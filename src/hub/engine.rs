//! Hub engine
//!
//! In-process stand-in for an external realtime service.
//! It is responsible for:
//! - opening and closing channels on a topic
//! - publishing messages to every open channel on a topic
//! - counting opens and closes, so callers can check how many transport-level
//!   channels were really created
//!
//! Concurrency and usage notes:
//! - `Hub` is a cheap `Clone` over a mutex-guarded state. The lock is only
//!   held for map updates and non-blocking broadcast sends.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::HubSettings;
use crate::hub::channel::ChannelHandle;
use crate::hub::message::Message;
use crate::hub::topic::TopicChannels;
use crate::utils::error::TransportError;

/// Running totals of channel activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub opened: u64,
    pub closed: u64,
    pub published: u64,
}

#[derive(Debug, Default)]
struct HubState {
    topics: HashMap<String, TopicChannels>,
    stats: HubStats,
}

#[derive(Debug, Clone)]
pub struct Hub {
    state: Arc<Mutex<HubState>>,
    channel_capacity: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Hub {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            // broadcast::channel panics on zero capacity
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn from_settings(settings: &HubSettings) -> Self {
        Self::new(settings.channel_capacity)
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().expect("hub state lock poisoned")
    }

    /// Opens a new channel on `topic`.
    pub fn open_channel(&self, topic: &str) -> ChannelHandle {
        let id = Uuid::new_v4().to_string();
        let (sender, _) = broadcast::channel(self.channel_capacity);

        let mut state = self.lock();
        state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicChannels::new(topic))
            .open(id.clone(), sender.clone());
        state.stats.opened += 1;
        debug!(topic, channel = %id, "hub channel opened");

        ChannelHandle::new(id, topic.to_string(), sender)
    }

    /// Closes a channel. Topics with no channel left are forgotten.
    pub fn close_channel(&self, handle: &ChannelHandle) -> Result<(), TransportError> {
        let mut state = self.lock();
        let Some(channels) = state.topics.get_mut(handle.topic()) else {
            return Err(TransportError::ChannelNotFound(handle.id().to_string()));
        };
        if !channels.close(handle.id()) {
            return Err(TransportError::ChannelNotFound(handle.id().to_string()));
        }
        if channels.is_empty() {
            state.topics.remove(handle.topic());
        }
        state.stats.closed += 1;
        debug!(topic = handle.topic(), channel = handle.id(), "hub channel closed");
        Ok(())
    }

    /// Publishes a message to every channel open on its topic.
    ///
    /// Stamps the timestamp (milliseconds) and fills in a message id if
    /// missing. Returns how many channels had at least one listener.
    pub fn publish(&self, mut msg: Message) -> usize {
        msg.timestamp = chrono::Utc::now().timestamp_millis();
        if msg.message_id.is_empty() {
            msg.message_id = Uuid::new_v4().to_string();
        }

        let mut state = self.lock();
        state.stats.published += 1;
        let Some(channels) = state.topics.get(&msg.topic) else {
            debug!(topic = %msg.topic, "no open channel for topic");
            return 0;
        };

        let mut delivered = 0;
        for (id, sender) in &channels.channels {
            match sender.send(msg.clone()) {
                Ok(listeners) => {
                    trace!(channel = %id, listeners, "message delivered");
                    delivered += 1;
                }
                Err(_) => trace!(channel = %id, "channel has no listeners"),
            }
        }
        delivered
    }

    /// Number of channels currently open on `topic`.
    pub fn open_channel_count(&self, topic: &str) -> usize {
        self.lock()
            .topics
            .get(topic)
            .map_or(0, |channels| channels.channels.len())
    }

    /// Returns sorted list of topics with at least one open channel.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.lock().topics.keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    pub fn stats(&self) -> HubStats {
        self.lock().stats
    }
}
