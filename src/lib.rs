//! # submux
//!
//! `submux` shares real-time subscription channels between many callers.
//! However many callers ask for the same topic, at most one underlying
//! channel is ever open for it: the first caller opens it, later callers
//! reuse it, and the last release closes it exactly once.
//!
//! ## Core Modules
//!
//! - `multiplexer`: the shared-subscription registry (acquire, release, cleanup).
//! - `hub`: an in-process broadcast hub whose channels the multiplexer shares.
//! - `transport`: the WebSocket gateway that puts browser sessions on the hub.
//! - `client`: one gateway session and the subscriptions it holds.
//! - `config`: layered settings from a config file and `SUBMUX__*` variables.
//! - `utils`: error types and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod multiplexer;
pub mod transport;
pub mod utils;

pub use multiplexer::{ChannelFactory, Subscription, SubscriptionMultiplexer, Topic};
pub use utils::error::{MultiplexError, TransportError};
