use std::fmt;
use std::ops::Deref;

use crate::multiplexer::engine::SubscriptionMultiplexer;
use crate::multiplexer::topic::Topic;
use crate::utils::error::MultiplexError;

/// Scoped reference to a shared channel.
///
/// Holds one unit of the topic's reference count and gives it back exactly
/// once: through [`Subscription::release`], or on drop (the teardown then
/// runs in the background on the current tokio runtime).
///
/// The guard is tied to the lifecycle it was acquired in. If the topic was
/// force-closed by `cleanup_all` and later reopened, releasing this guard
/// does not touch the new lifecycle.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription<H>
where
    H: Clone + Send + Sync + 'static,
{
    multiplexer: SubscriptionMultiplexer<H>,
    topic: Topic,
    generation: u64,
    handle: H,
    released: bool,
}

impl<H> Subscription<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        multiplexer: SubscriptionMultiplexer<H>,
        topic: Topic,
        generation: u64,
        handle: H,
    ) -> Self {
        Self {
            multiplexer,
            topic,
            generation,
            handle,
            released: false,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Releases the reference and waits for the teardown if this was the
    /// last one.
    pub async fn release(mut self) -> Result<(), MultiplexError> {
        self.released = true;
        self.multiplexer
            .release_generation(&self.topic, Some(self.generation))
            .await
    }
}

impl<H> Deref for Subscription<H>
where
    H: Clone + Send + Sync + 'static,
{
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H> Drop for Subscription<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.released {
            self.multiplexer
                .registry
                .release_in_background(&self.topic, self.generation);
        }
    }
}

impl<H> fmt::Debug for Subscription<H>
where
    H: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("generation", &self.generation)
            .field("handle", &self.handle)
            .finish()
    }
}
