//! # Registry internals.
//!
//! Owns the topic map and every state transition on it. The map is guarded by
//! a plain mutex that is only held for bookkeeping, never across a factory
//! call. Slow I/O happens in spawned tasks:
//! - one **creation task** per Pending lifecycle (open, then Pending → Active
//!   or Pending → Absent);
//! - one **teardown task** per Active lifecycle that reached zero references.
//!
//! ## Rules
//! - Every slot carries a generation number. Late bookkeeping for an older
//!   lifecycle of the same topic is ignored.
//! - A Pending slot stays in the map until its creation task finishes, even
//!   when every waiter has left, so a second `open` can never overlap the first.
//! - An Active slot is removed from the map before its handle is closed.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::multiplexer::entry::{ActiveEntry, Creation, PendingEntry, Slot};
use crate::multiplexer::factory::ChannelFactory;
use crate::multiplexer::topic::Topic;
use crate::utils::error::{MultiplexError, TransportError};

pub(crate) struct Registry<H> {
    entries: Mutex<HashMap<Topic, Slot<H>>>,
    generation: AtomicU64,
    pub(crate) open_timeout: Duration,
    pub(crate) close_timeout: Duration,
    pub(crate) root: CancellationToken,
}

/// What a caller learned when it registered interest in a topic.
pub(crate) enum Joined<H> {
    /// Topic was Active; the handle is available right away.
    Ready { handle: H, generation: u64 },
    /// Topic is Pending; await the shared creation.
    Waiting {
        creation: Creation<H>,
        generation: u64,
    },
}

impl<H> Registry<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(open_timeout: Duration, close_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            open_timeout,
            close_timeout,
            root: CancellationToken::new(),
        }
    }

    pub(crate) fn lock_entries(&self) -> MutexGuard<'_, HashMap<Topic, Slot<H>>> {
        // A poisoned lock means a transition was interrupted half way; the
        // registry can no longer be trusted to be serialized.
        self.entries
            .lock()
            .expect("subscription registry lock poisoned")
    }

    /// Registers one unit of interest in `topic`, starting a creation if the
    /// topic is Absent.
    pub(crate) fn join(
        self: &Arc<Self>,
        topic: &Topic,
        factory: Arc<dyn ChannelFactory<H>>,
    ) -> Result<Joined<H>, MultiplexError> {
        let mut entries = self.lock_entries();

        if self.root.is_cancelled() {
            return Err(MultiplexError::ShutDown);
        }

        match entries.get_mut(topic) {
            Some(Slot::Active(active)) => {
                active.ref_count += 1;
                debug!(topic = %topic, ref_count = active.ref_count, "joined active channel");
                Ok(Joined::Ready {
                    handle: active.handle.clone(),
                    generation: active.generation,
                })
            }
            Some(Slot::Pending(pending)) => {
                pending.waiters += 1;
                debug!(topic = %topic, waiters = pending.waiters, "joined pending channel");
                Ok(Joined::Waiting {
                    creation: pending.creation.clone(),
                    generation: pending.generation,
                })
            }
            None => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                let creation = self.spawn_creation(topic.clone(), generation, factory);
                entries.insert(
                    topic.clone(),
                    Slot::Pending(PendingEntry {
                        generation,
                        waiters: 1,
                        creation: creation.clone(),
                    }),
                );
                debug!(topic = %topic, generation, "opening channel");
                Ok(Joined::Waiting {
                    creation,
                    generation,
                })
            }
        }
    }

    fn spawn_creation(
        self: &Arc<Self>,
        topic: Topic,
        generation: u64,
        factory: Arc<dyn ChannelFactory<H>>,
    ) -> Creation<H> {
        let registry = Arc::clone(self);
        let task_topic = topic.clone();
        let task = tokio::spawn(async move {
            let outcome = registry.open_channel(&task_topic, factory.as_ref()).await;
            registry
                .finish_creation(task_topic, generation, factory, outcome)
                .await
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    warn!(topic = %topic, error = %join_err, "creation task did not complete");
                    Err(MultiplexError::Cancelled {
                        topic: topic.into_string(),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Runs the factory's `open` under the open deadline and the root token.
    async fn open_channel(
        &self,
        topic: &Topic,
        factory: &dyn ChannelFactory<H>,
    ) -> Result<H, MultiplexError> {
        let cancel = self.root.child_token();
        let open = AssertUnwindSafe(factory.open(topic, cancel.clone())).catch_unwind();

        let outcome = tokio::select! {
            biased;
            _ = self.root.cancelled() => Err(MultiplexError::Cancelled {
                topic: topic.to_string(),
            }),
            opened = tokio::time::timeout(self.open_timeout, open) => match opened {
                Ok(Ok(Ok(handle))) => Ok(handle),
                Ok(Ok(Err(source))) => Err(MultiplexError::CreationFailed {
                    topic: topic.to_string(),
                    source,
                }),
                Ok(Err(_panic)) => Err(MultiplexError::CreationFailed {
                    topic: topic.to_string(),
                    source: TransportError::Unavailable("factory panicked while opening".to_string()),
                }),
                Err(_elapsed) => Err(MultiplexError::OpenTimedOut {
                    topic: topic.to_string(),
                    timeout: self.open_timeout,
                }),
            },
        };

        if outcome.is_err() {
            cancel.cancel();
        }
        outcome
    }

    /// Applies the creation outcome: Pending → Active, or Pending → Absent.
    async fn finish_creation(
        &self,
        topic: Topic,
        generation: u64,
        factory: Arc<dyn ChannelFactory<H>>,
        outcome: Result<H, MultiplexError>,
    ) -> Result<H, MultiplexError> {
        let orphan = {
            let mut entries = self.lock_entries();
            let waiters = match entries.get(&topic) {
                Some(Slot::Pending(pending)) if pending.generation == generation => {
                    Some(pending.waiters)
                }
                _ => None,
            };

            match (outcome, waiters) {
                (Ok(handle), Some(waiters)) if waiters > 0 => {
                    entries.insert(
                        topic.clone(),
                        Slot::Active(ActiveEntry {
                            generation,
                            handle: handle.clone(),
                            ref_count: waiters,
                            factory: Arc::clone(&factory),
                        }),
                    );
                    info!(topic = %topic, generation, ref_count = waiters, "channel opened");
                    return Ok(handle);
                }
                (Ok(handle), waiters) => {
                    if waiters.is_some() {
                        entries.remove(&topic);
                    }
                    handle
                }
                (Err(err), waiters) => {
                    if waiters.is_some() {
                        entries.remove(&topic);
                    }
                    warn!(topic = %topic, error = %err, label = err.as_label(), "failed to open channel");
                    return Err(err);
                }
            }
        };

        debug!(topic = %topic, generation, "every waiter left before the channel opened; closing it");
        let _ = self.close_channel(&topic, factory.as_ref(), orphan).await;
        Err(MultiplexError::Cancelled {
            topic: topic.into_string(),
        })
    }

    /// Runs the factory's `close` under the close deadline.
    pub(crate) async fn close_channel(
        &self,
        topic: &Topic,
        factory: &dyn ChannelFactory<H>,
        handle: H,
    ) -> Result<(), MultiplexError> {
        let outcome = match tokio::time::timeout(self.close_timeout, factory.close(handle)).await
        {
            Ok(closed) => closed,
            Err(_elapsed) => Err(TransportError::TimedOut(self.close_timeout)),
        };

        match outcome {
            Ok(()) => {
                info!(topic = %topic, "channel closed");
                Ok(())
            }
            Err(source) => {
                warn!(topic = %topic, error = %source, "failed to close channel; entry removed anyway");
                Err(MultiplexError::TeardownFailed {
                    topic: topic.to_string(),
                    source,
                })
            }
        }
    }

    /// Drops one reference to an Active topic. Returns the detached entry
    /// when that was the last one.
    ///
    /// With `generation` set, only that lifecycle is affected.
    pub(crate) fn drop_reference(
        &self,
        topic: &str,
        generation: Option<u64>,
    ) -> Option<ActiveEntry<H>> {
        let mut entries = self.lock_entries();
        let Some(Slot::Active(active)) = entries.get_mut(topic) else {
            return None;
        };
        if generation.is_some_and(|g| g != active.generation) {
            return None;
        }
        if active.ref_count > 1 {
            active.ref_count -= 1;
            debug!(topic = %topic, ref_count = active.ref_count, "released reference");
            return None;
        }

        match entries.remove(topic) {
            Some(Slot::Active(active)) => {
                debug!(topic = %topic, generation = active.generation, "last reference released");
                Some(active)
            }
            _ => None,
        }
    }

    /// Closes a detached entry on its own task so the close always runs to
    /// completion, even if whoever triggered it goes away.
    pub(crate) fn spawn_teardown(
        self: &Arc<Self>,
        topic: Topic,
        active: ActiveEntry<H>,
    ) -> Option<JoinHandle<Result<(), MultiplexError>>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(topic = %topic, "no tokio runtime available; channel left open");
                return None;
            }
        };
        let registry = Arc::clone(self);
        Some(runtime.spawn(async move {
            registry
                .close_channel(&topic, active.factory.as_ref(), active.handle)
                .await
        }))
    }

    /// Gives back a unit of interest registered by [`Registry::join`] whose
    /// caller stopped waiting before it saw the creation outcome.
    pub(crate) fn withdraw(self: &Arc<Self>, topic: &Topic, generation: u64) {
        {
            let mut entries = self.lock_entries();
            if let Some(Slot::Pending(pending)) = entries.get_mut(topic) {
                if pending.generation == generation {
                    pending.waiters = pending.waiters.saturating_sub(1);
                    debug!(topic = %topic, waiters = pending.waiters, "waiter left pending channel");
                    return;
                }
            }
        }
        self.release_in_background(topic, generation);
    }

    /// Releases one reference of a specific lifecycle without awaiting the
    /// teardown. Used from `Drop`.
    pub(crate) fn release_in_background(self: &Arc<Self>, topic: &Topic, generation: u64) {
        if let Some(active) = self.drop_reference(topic.as_str(), Some(generation)) {
            let _ = self.spawn_teardown(topic.clone(), active);
        }
    }

    /// Creations currently in flight.
    pub(crate) fn in_flight(&self) -> Vec<Creation<H>> {
        self.lock_entries()
            .values()
            .filter_map(|slot| match slot {
                Slot::Pending(pending) => Some(pending.creation.clone()),
                Slot::Active(_) => None,
            })
            .collect()
    }

    /// Detaches every Active entry. Pending entries stay with their waiters.
    pub(crate) fn drain_active(&self) -> Vec<(Topic, ActiveEntry<H>)> {
        let mut entries = self.lock_entries();
        let active: Vec<Topic> = entries
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(topic, _)| topic.clone())
            .collect();

        active
            .into_iter()
            .filter_map(|topic| match entries.remove(&topic) {
                Some(Slot::Active(entry)) => Some((topic, entry)),
                _ => None,
            })
            .collect()
    }
}

/// Withdraws a caller's interest if its `acquire` future is dropped before
/// the creation outcome was delivered.
pub(crate) struct Waiter<H>
where
    H: Clone + Send + Sync + 'static,
{
    registry: Option<Arc<Registry<H>>>,
    topic: Topic,
    generation: u64,
}

impl<H> Waiter<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(registry: Arc<Registry<H>>, topic: Topic, generation: u64) -> Self {
        Self {
            registry: Some(registry),
            topic,
            generation,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.registry = None;
    }
}

impl<H> Drop for Waiter<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.withdraw(&self.topic, self.generation);
        }
    }
}
