//! Server-Sent Events broker
//!
//! Each connection is a bounded channel. The sending half stays with the
//! streaming session; the receiving half becomes the HTTP response body.
//! Dropping the body, which is what happens when the viewer disconnects,
//! fires the connection's `done` token.

use async_trait::async_trait;
use axum::response::sse::Event as SseEvent;
use futures::Stream;
use livetail_core::domain::event::Event;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use super::{Connection, TransportError};

/// Hands out viewer connections, process-wide
#[derive(Debug)]
pub struct SseBroker {
    shutdown: CancellationToken,
    buffer: usize,
    max_connections: usize,
    active: Arc<AtomicUsize>,
}

impl SseBroker {
    /// Creates a new broker
    ///
    /// # Arguments
    /// * `shutdown` - Once cancelled, new connections are refused
    /// * `buffer` - Events buffered per connection
    /// * `max_connections` - Maximum number of open connections
    pub fn new(shutdown: CancellationToken, buffer: usize, max_connections: usize) -> Self {
        Self {
            shutdown,
            buffer: buffer.max(1),
            max_connections,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of viewers currently connected
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Open a connection for one viewer
    ///
    /// # Arguments
    /// * `client_id` - Unique identifier of the viewer
    /// * `request` - Cancellation token of the originating request
    ///
    /// # Returns
    /// The sending half for the session and the stream to serve as response body
    pub fn connect(
        &self,
        client_id: String,
        request: &CancellationToken,
    ) -> Result<(SseConnection, ViewerStream), TransportError> {
        if self.shutdown.is_cancelled() || request.is_cancelled() {
            return Err(TransportError::ShuttingDown);
        }

        let previous = self.active.fetch_add(1, Ordering::SeqCst);
        if previous >= self.max_connections {
            self.active.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::TooManyConnections(self.max_connections));
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        let done = CancellationToken::new();

        debug!("Viewer {} connected ({} active)", client_id, previous + 1);

        let viewer = ViewerStream {
            rx,
            _done_on_drop: done.clone().drop_guard(),
            _slot: ConnectionSlot(Arc::clone(&self.active)),
        };
        let connection = SseConnection {
            id: client_id,
            tx,
            done,
        };

        Ok((connection, viewer))
    }
}

/// Sending half of a viewer connection
#[derive(Debug)]
pub struct SseConnection {
    id: String,
    tx: mpsc::Sender<Event>,
    done: CancellationToken,
}

#[async_trait]
impl Connection for SseConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn done(&self) -> &CancellationToken {
        &self.done
    }

    async fn send(&self, event: Event) {
        if self.tx.send(event).await.is_err() {
            debug!("Viewer {} is gone, event dropped", self.id);
            self.done.cancel();
        }
    }
}

/// Response body of a viewer connection
#[derive(Debug)]
pub struct ViewerStream {
    rx: mpsc::Receiver<Event>,
    _done_on_drop: DropGuard,
    _slot: ConnectionSlot,
}

impl Stream for ViewerStream {
    type Item = Result<SseEvent, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|event| event.map(|event| Ok(to_sse_event(event))))
    }
}

/// Releases a connection slot when the viewer stream is dropped
#[derive(Debug)]
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn to_sse_event(event: Event) -> SseEvent {
    SseEvent::default()
        .id(event.id)
        .event(event.kind.as_str())
        .data(event.data)
}
