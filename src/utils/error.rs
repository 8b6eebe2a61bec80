//! The `error` module defines the error types used across `submux`.
//!
//! - [`TransportError`] is what a channel factory (the transport side) reports.
//! - [`MultiplexError`] is what callers of the multiplexer see.
//! - [`GatewayError`] covers the WebSocket gateway's own failures.
//!
//! `MultiplexError` and `TransportError` are `Clone` because a single creation
//! outcome is handed to every caller that waited on it.

use std::time::Duration;
use thiserror::Error;

/// Errors reported by a transport while opening or closing a channel.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport refused to open the channel.
    #[error("channel rejected: {0}")]
    Rejected(String),

    /// The transport could not be reached or failed internally.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The channel to close is not known to the transport.
    #[error("channel {0} not found")]
    ChannelNotFound(String),

    /// The operation did not finish within its deadline.
    #[error("transport operation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors produced by the subscription multiplexer.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum MultiplexError {
    /// Topic was empty or malformed; rejected before touching the registry.
    #[error("invalid topic: {reason}")]
    InvalidTopic { reason: &'static str },

    /// The factory's `open` returned an error.
    #[error("failed to open channel for topic '{topic}': {source}")]
    CreationFailed {
        topic: String,
        #[source]
        source: TransportError,
    },

    /// The factory's `open` did not resolve within the configured deadline.
    #[error("opening channel for topic '{topic}' timed out after {timeout:?}")]
    OpenTimedOut { topic: String, timeout: Duration },

    /// Creation was cancelled before it resolved.
    #[error("opening channel for topic '{topic}' was cancelled")]
    Cancelled { topic: String },

    /// The factory's `close` failed. The entry is removed regardless.
    #[error("failed to close channel for topic '{topic}': {source}")]
    TeardownFailed {
        topic: String,
        #[source]
        source: TransportError,
    },

    /// `cleanup_all` emptied the registry but some channels failed to close.
    #[error("cleanup finished with {} failed teardown(s): {failed:?}", .failed.len())]
    CleanupIncomplete { failed: Vec<String> },

    /// The multiplexer has been shut down.
    #[error("multiplexer is shut down")]
    ShutDown,
}

impl MultiplexError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            MultiplexError::InvalidTopic { .. } => "invalid_topic",
            MultiplexError::CreationFailed { .. } => "creation_failed",
            MultiplexError::OpenTimedOut { .. } => "open_timed_out",
            MultiplexError::Cancelled { .. } => "cancelled",
            MultiplexError::TeardownFailed { .. } => "teardown_failed",
            MultiplexError::CleanupIncomplete { .. } => "cleanup_incomplete",
            MultiplexError::ShutDown => "shut_down",
        }
    }

    /// Whether a later `acquire` for the same topic may succeed.
    ///
    /// The multiplexer never retries on its own; this only informs the caller's policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MultiplexError::CreationFailed { .. }
                | MultiplexError::OpenTimedOut { .. }
                | MultiplexError::Cancelled { .. }
        )
    }
}

/// Errors raised by the WebSocket gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to encode server message: {0}")]
    Encode(#[from] serde_json::Error),
}
