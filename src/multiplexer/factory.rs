//! # Channel factory: the multiplexer's outbound boundary.
//!
//! A factory knows how to open one transport-level channel for a topic and
//! how to close it again. Callers implement it per kind of topic
//! (per-user notifications, global event changes, ...). It is also where
//! message delivery is wired: the handle returned by `open` is what every
//! logical subscriber of the topic listens on.
//!
//! ## Rules
//! - `open` is invoked at most once per Active lifetime of a topic, no matter
//!   how many callers raced to acquire it.
//! - `close` is invoked exactly once per Active lifetime, after the last release.
//! - `open` receives a [`CancellationToken`] that fires when the open deadline
//!   passes or the multiplexer shuts down. Long-running opens should watch it.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::multiplexer::topic::Topic;
use crate::utils::error::TransportError;

/// Opens and closes transport channels of handle type `H`.
///
/// ### Implementation requirements
/// - Side effects of `open` are limited to opening the channel and
///   registering message delivery with it.
/// - `close` is best effort. A failure is logged by the multiplexer and the
///   registry entry is dropped anyway.
#[async_trait]
pub trait ChannelFactory<H>: Send + Sync + 'static {
    /// Opens one channel for `topic`.
    async fn open(&self, topic: &Topic, cancel: CancellationToken) -> Result<H, TransportError>;

    /// Tears down a channel previously returned by [`ChannelFactory::open`].
    async fn close(&self, handle: H) -> Result<(), TransportError>;
}
