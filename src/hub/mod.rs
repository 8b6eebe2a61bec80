//! The `hub` module is an in-process realtime transport.
//!
//! It plays the part of the external realtime service: callers open a
//! channel per topic through [`HubChannelFactory`], and every message
//! published on the topic is broadcast to each open channel. Fan-out to the
//! logical subscribers sharing one channel happens in [`ChannelHandle`].

pub mod channel;
pub mod engine;
pub mod message;
pub mod topic;

pub use channel::{ChannelHandle, HubChannelFactory};
pub use engine::{Hub, HubStats};
pub use message::Message;
