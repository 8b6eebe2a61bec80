//! The `transport` module is the gateway browser sessions talk to over
//! WebSockets.
//!
//! It defines the JSON protocol between clients and the gateway and runs the
//! server itself. Each connection is one multiplexer caller: it acquires a
//! topic on `subscribe`, releases it on `unsubscribe`, and releases whatever
//! it still holds when it disconnects.

pub mod message;
pub mod websocket;

pub use websocket::{GatewayContext, serve, start_websocket_server};
