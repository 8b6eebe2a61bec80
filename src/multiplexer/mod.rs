//! The `multiplexer` module shares one transport-level channel per topic
//! between any number of callers.
//!
//! Per topic the lifecycle is `Absent → Pending → Active → Absent`:
//! the first `acquire` opens the channel through the caller's
//! [`ChannelFactory`], concurrent callers join that same creation, and the
//! channel is closed when the last reference is released.

pub mod engine;
mod entry;
pub mod factory;
mod registry;
pub mod subscription;
pub mod topic;

pub use engine::SubscriptionMultiplexer;
pub use entry::{TopicState, TopicStatus};
pub use factory::ChannelFactory;
pub use subscription::Subscription;
pub use topic::Topic;
