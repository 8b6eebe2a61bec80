//! The `client` module defines a client session of the WebSocket gateway.
//!
//! It provides the `Client` struct: the client's identifier, its outbound
//! message channel, and the multiplexer subscriptions it currently holds.

pub mod gateway_client;
pub use gateway_client::Client;
