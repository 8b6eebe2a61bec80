//! Subscription multiplexer engine
//!
//! This module contains the public handle callers use to share real-time
//! channels:
//! - `acquire` / `release` pair up one unit of interest in a topic
//! - `subscribe` wraps the pair in a scoped [`Subscription`] guard
//! - `cleanup_all` / `shutdown` tear everything down at process exit
//!
//! Concurrency and usage notes:
//! - `SubscriptionMultiplexer` is a cheap `Clone` over shared state. Build one
//!   at start-up and hand clones to every caller; tests build their own.
//! - Joining an Active topic never suspends. Joining a Pending topic awaits
//!   the creation already in flight instead of starting another.
//! - Callers pair their own `acquire`/`release` calls. The registry counts
//!   references per topic, not per caller.

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MultiplexerSettings;
use crate::multiplexer::entry::{TopicState, TopicStatus};
use crate::multiplexer::factory::ChannelFactory;
use crate::multiplexer::registry::{Joined, Registry, Waiter};
use crate::multiplexer::subscription::Subscription;
use crate::multiplexer::topic::Topic;
use crate::utils::error::{MultiplexError, TransportError};

pub struct SubscriptionMultiplexer<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub(crate) registry: Arc<Registry<H>>,
}

impl<H> Clone for SubscriptionMultiplexer<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<H> fmt::Debug for SubscriptionMultiplexer<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionMultiplexer")
            .field("topics", &self.len())
            .field("open_timeout", &self.registry.open_timeout)
            .field("close_timeout", &self.registry.close_timeout)
            .finish()
    }
}

impl<H> SubscriptionMultiplexer<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new(open_timeout: Duration, close_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(Registry::new(open_timeout, close_timeout)),
        }
    }

    pub fn from_settings(settings: &MultiplexerSettings) -> Self {
        Self::new(settings.open_timeout(), settings.close_timeout())
    }

    /// Acquires the shared handle for `topic`, opening it through `factory`
    /// if nobody holds it yet.
    ///
    /// Every successful call must be matched by one [`release`](Self::release).
    /// When the topic is already Active, `factory` is not used.
    pub async fn acquire<F>(&self, topic: &str, factory: F) -> Result<H, MultiplexError>
    where
        F: ChannelFactory<H>,
    {
        let topic = Topic::parse(topic)?;
        self.acquire_topic(topic, Arc::new(factory))
            .await
            .map(|(handle, _)| handle)
    }

    /// Like [`acquire`](Self::acquire), but returns a guard that releases the
    /// reference when dropped.
    pub async fn subscribe<F>(
        &self,
        topic: &str,
        factory: F,
    ) -> Result<Subscription<H>, MultiplexError>
    where
        F: ChannelFactory<H>,
    {
        let topic = Topic::parse(topic)?;
        let (handle, generation) = self.acquire_topic(topic.clone(), Arc::new(factory)).await?;
        Ok(Subscription::new(self.clone(), topic, generation, handle))
    }

    async fn acquire_topic(
        &self,
        topic: Topic,
        factory: Arc<dyn ChannelFactory<H>>,
    ) -> Result<(H, u64), MultiplexError> {
        let (creation, generation) = match self.registry.join(&topic, factory)? {
            Joined::Ready { handle, generation } => return Ok((handle, generation)),
            Joined::Waiting {
                creation,
                generation,
            } => (creation, generation),
        };

        let waiter = Waiter::new(Arc::clone(&self.registry), topic, generation);
        let outcome = creation.await;
        waiter.disarm();
        outcome.map(|handle| (handle, generation))
    }

    /// Gives back one reference to `topic`.
    ///
    /// Releasing a topic that is not Active is a no-op. When the last
    /// reference goes, the entry is removed first and the channel closed
    /// afterwards; a failed close is reported as `TeardownFailed` but the
    /// entry stays removed.
    pub async fn release(&self, topic: &str) -> Result<(), MultiplexError> {
        // Nothing can be registered under an invalid name.
        let Ok(topic) = Topic::parse(topic) else {
            return Ok(());
        };
        self.release_generation(&topic, None).await
    }

    pub(crate) async fn release_generation(
        &self,
        topic: &Topic,
        generation: Option<u64>,
    ) -> Result<(), MultiplexError> {
        let Some(active) = self.registry.drop_reference(topic.as_str(), generation) else {
            return Ok(());
        };
        let Some(teardown) = self.registry.spawn_teardown(topic.clone(), active) else {
            return Ok(());
        };
        match teardown.await {
            Ok(closed) => closed,
            Err(join_err) => Err(MultiplexError::TeardownFailed {
                topic: topic.to_string(),
                source: TransportError::Unavailable(join_err.to_string()),
            }),
        }
    }

    /// Closes every channel and empties the registry.
    ///
    /// Creations already in flight when the call starts are awaited first;
    /// their outcomes still go to the callers that were waiting. Creations
    /// started after that are left to their callers, so steady `acquire`
    /// traffic cannot hold cleanup up. Use [`shutdown`](Self::shutdown) to
    /// refuse them as well. Each Active handle is closed exactly once.
    pub async fn cleanup_all(&self) -> Result<(), MultiplexError> {
        let in_flight = self.registry.in_flight();
        if !in_flight.is_empty() {
            debug!(
                count = in_flight.len(),
                "waiting for in-flight channels before cleanup"
            );
            join_all(in_flight).await;
        }
        let drained = self.registry.drain_active();

        let count = drained.len();
        let teardowns: Vec<_> = drained
            .into_iter()
            .map(|(topic, active)| {
                let teardown = self.registry.spawn_teardown(topic.clone(), active);
                (topic, teardown)
            })
            .collect();

        let mut failed = Vec::new();
        for (topic, teardown) in teardowns {
            let closed = match teardown {
                Some(teardown) => matches!(teardown.await, Ok(Ok(()))),
                None => false,
            };
            if !closed {
                failed.push(topic.into_string());
            }
        }

        info!(closed = count - failed.len(), failed = failed.len(), "registry cleaned up");
        if failed.is_empty() {
            Ok(())
        } else {
            failed.sort_unstable();
            Err(MultiplexError::CleanupIncomplete { failed })
        }
    }

    /// Cancels in-flight creations, closes everything and refuses further
    /// acquisitions.
    pub async fn shutdown(&self) -> Result<(), MultiplexError> {
        info!("shutting down subscription multiplexer");
        self.registry.root.cancel();
        self.cleanup_all().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.registry.root.is_cancelled()
    }

    /// Current lifecycle state of `topic`.
    pub fn state(&self, topic: &str) -> TopicState {
        self.registry
            .lock_entries()
            .get(topic)
            .map_or(TopicState::Absent, |slot| slot.state())
    }

    /// Reference count of an Active topic.
    pub fn ref_count(&self, topic: &str) -> Option<usize> {
        match self.state(topic) {
            TopicState::Active { ref_count } => Some(ref_count),
            _ => None,
        }
    }

    /// Returns sorted list of topics with a Pending or Active entry.
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.registry.lock_entries().keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    pub fn len(&self) -> usize {
        self.registry.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock_entries().is_empty()
    }

    /// Per-topic status, sorted by topic.
    pub fn snapshot(&self) -> Vec<TopicStatus> {
        let mut statuses: Vec<TopicStatus> = self
            .registry
            .lock_entries()
            .iter()
            .map(|(topic, slot)| TopicStatus {
                topic: topic.clone(),
                generation: slot.generation(),
                state: slot.state(),
            })
            .collect();
        statuses.sort_unstable_by(|a, b| a.topic.cmp(&b.topic));
        statuses
    }
}
