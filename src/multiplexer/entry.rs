use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::sync::Arc;

use crate::multiplexer::factory::ChannelFactory;
use crate::multiplexer::topic::Topic;
use crate::utils::error::MultiplexError;

/// In-flight creation awaited by every caller of a Pending topic.
pub(crate) type Creation<H> = Shared<BoxFuture<'static, Result<H, MultiplexError>>>;

/// Registry slot for a topic. A topic with no slot is Absent.
pub(crate) enum Slot<H> {
    Pending(PendingEntry<H>),
    Active(ActiveEntry<H>),
}

impl<H> Slot<H> {
    pub(crate) fn generation(&self) -> u64 {
        match self {
            Slot::Pending(pending) => pending.generation,
            Slot::Active(active) => active.generation,
        }
    }

    pub(crate) fn state(&self) -> TopicState {
        match self {
            Slot::Pending(pending) => TopicState::Pending {
                waiters: pending.waiters,
            },
            Slot::Active(active) => TopicState::Active {
                ref_count: active.ref_count,
            },
        }
    }
}

pub(crate) struct PendingEntry<H> {
    pub generation: u64,
    /// Callers currently awaiting `creation`. Becomes the initial ref count.
    pub waiters: usize,
    pub creation: Creation<H>,
}

pub(crate) struct ActiveEntry<H> {
    pub generation: u64,
    pub handle: H,
    pub ref_count: usize,
    /// Factory that opened `handle`; the only one allowed to close it.
    pub factory: Arc<dyn ChannelFactory<H>>,
}

/// Observable lifecycle state of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TopicState {
    Absent,
    Pending { waiters: usize },
    Active { ref_count: usize },
}

/// Diagnostic view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStatus {
    pub topic: Topic,
    pub generation: u64,
    #[serde(flatten)]
    pub state: TopicState,
}
