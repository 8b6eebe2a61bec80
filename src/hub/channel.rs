use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::hub::engine::Hub;
use crate::hub::message::Message;
use crate::hub::topic::ChannelId;
use crate::multiplexer::{ChannelFactory, Topic};
use crate::utils::error::TransportError;

/// A channel opened on the hub.
///
/// Clones share the same underlying channel; every logical subscriber calls
/// [`ChannelHandle::listen`] to get its own receiver.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    topic: String,
    sender: broadcast::Sender<Message>,
}

impl ChannelHandle {
    pub(crate) fn new(id: ChannelId, topic: String, sender: broadcast::Sender<Message>) -> Self {
        Self { id, topic, sender }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns a receiver for every message published on the channel from now on.
    pub fn listen(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl PartialEq for ChannelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChannelHandle {}

/// Opens and closes hub channels on behalf of the multiplexer.
#[derive(Debug, Clone)]
pub struct HubChannelFactory {
    hub: Hub,
}

impl HubChannelFactory {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl ChannelFactory<ChannelHandle> for HubChannelFactory {
    async fn open(
        &self,
        topic: &Topic,
        cancel: CancellationToken,
    ) -> Result<ChannelHandle, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Unavailable(
                "open cancelled before it started".to_string(),
            ));
        }
        Ok(self.hub.open_channel(topic.as_str()))
    }

    async fn close(&self, handle: ChannelHandle) -> Result<(), TransportError> {
        self.hub.close_channel(&handle)
    }
}
