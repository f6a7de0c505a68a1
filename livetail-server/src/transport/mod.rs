//! Push transport
//!
//! A connection is one viewer's duplex channel: the server pushes events
//! into it, and its `done` signal fires once the viewer has gone away.

mod sse;

use async_trait::async_trait;
use livetail_core::domain::event::Event;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use sse::{SseBroker, SseConnection, ViewerStream};

/// Errors raised while opening a viewer connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("server is shutting down")]
    ShuttingDown,

    #[error("too many live viewers (limit {0})")]
    TooManyConnections(usize),
}

/// One viewer connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Unique identifier of this connection
    fn id(&self) -> &str;

    /// Fires once the viewer has disconnected
    fn done(&self) -> &CancellationToken;

    /// Push one event to the viewer
    async fn send(&self, event: Event);
}
