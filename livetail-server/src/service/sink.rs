//! Event Sink
//!
//! Wraps a connection so nothing is pushed to a viewer that has already
//! disconnected or to a request that has already been cancelled. A send
//! blocked on a viewer that stopped reading gives up as soon as either
//! signal fires.

use livetail_core::domain::event::{Event, EventKind};
use tokio_util::sync::CancellationToken;

use crate::transport::Connection;

/// Cancellation-aware sender for one viewer
pub struct EventSink<'a, C: Connection + ?Sized> {
    connection: &'a C,
    request: &'a CancellationToken,
}

impl<'a, C: Connection + ?Sized> EventSink<'a, C> {
    pub fn new(connection: &'a C, request: &'a CancellationToken) -> Self {
        Self {
            connection,
            request,
        }
    }

    /// Whether the viewer or the request is gone
    pub fn is_closed(&self) -> bool {
        self.connection.done().is_cancelled() || self.request.is_cancelled()
    }

    /// Send one event with a fresh id
    ///
    /// Silently dropped once the sink is closed. Returns whether the event
    /// was handed to the connection.
    pub async fn send(&self, kind: EventKind, data: impl Into<String>) -> bool {
        if self.is_closed() {
            return false;
        }

        let event = Event::new(kind, data);
        tokio::select! {
            _ = self.connection.send(event) => true,
            _ = self.connection.done().cancelled() => false,
            _ = self.request.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{RecordingConnection, StalledConnection};
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_while_open() {
        let connection = RecordingConnection::new("viewer");
        let request = CancellationToken::new();
        let sink = EventSink::new(&connection, &request);

        assert!(sink.send(EventKind::Log, "hello").await);
        assert_eq!(
            connection.kinds_and_data(),
            vec![(EventKind::Log, "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_send_after_viewer_disconnects() {
        let connection = RecordingConnection::new("viewer");
        let request = CancellationToken::new();
        let sink = EventSink::new(&connection, &request);

        connection.done().cancel();

        assert!(!sink.send(EventKind::Log, "late").await);
        assert!(!sink.send(EventKind::Eof, "late").await);
        assert!(connection.events().is_empty());
    }

    #[tokio::test]
    async fn test_no_send_after_request_cancelled() {
        let connection = RecordingConnection::new("viewer");
        let request = CancellationToken::new();
        let sink = EventSink::new(&connection, &request);

        assert!(sink.send(EventKind::Log, "first").await);
        request.cancel();
        assert!(!sink.send(EventKind::Log, "second").await);

        assert_eq!(connection.events().len(), 1);
    }

    #[tokio::test]
    async fn test_each_event_gets_a_fresh_id() {
        let connection = RecordingConnection::new("viewer");
        let request = CancellationToken::new();
        let sink = EventSink::new(&connection, &request);

        sink.send(EventKind::Log, "a").await;
        sink.send(EventKind::Log, "a").await;

        let events = connection.events();
        assert_ne!(events[0].id, events[1].id);
    }

    #[tokio::test]
    async fn test_blocked_send_gives_up_on_request_cancel() {
        let connection = StalledConnection::new("viewer");
        let request = CancellationToken::new();
        let sink = EventSink::new(&connection, &request);

        let cancel = request.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let sent = tokio::time::timeout(Duration::from_secs(2), sink.send(EventKind::Log, "stuck"))
            .await
            .unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_blocked_send_gives_up_on_disconnect() {
        let connection = StalledConnection::new("viewer");
        let request = CancellationToken::new();
        let sink = EventSink::new(&connection, &request);

        let done = connection.done().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            done.cancel();
        });

        let sent = tokio::time::timeout(Duration::from_secs(2), sink.send(EventKind::Eof, "x"))
            .await
            .unwrap();
        assert!(!sent);
    }
}
