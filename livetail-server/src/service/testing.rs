//! Test doubles shared by the service tests

use async_trait::async_trait;
use livetail_core::domain::event::{Event, EventKind};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::transport::Connection;

/// When a recording connection disconnects on its own
enum HangUp {
    Never,
    AfterEof,
    AfterEvents(usize),
}

/// Connection that records every event it is sent
pub struct RecordingConnection {
    id: String,
    done: CancellationToken,
    events: Mutex<Vec<Event>>,
    hang_up: HangUp,
}

impl RecordingConnection {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            done: CancellationToken::new(),
            events: Mutex::new(Vec::new()),
            hang_up: HangUp::Never,
        }
    }

    /// A viewer that disconnects as soon as it sees the end of the feed
    pub fn hanging_up_after_eof(id: &str) -> Self {
        Self {
            hang_up: HangUp::AfterEof,
            ..Self::new(id)
        }
    }

    /// A viewer that disconnects after receiving `count` events
    pub fn hanging_up_after(id: &str, count: usize) -> Self {
        Self {
            hang_up: HangUp::AfterEvents(count),
            ..Self::new(id)
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds_and_data(&self) -> Vec<(EventKind, String)> {
        self.events()
            .into_iter()
            .map(|event| (event.kind, event.data))
            .collect()
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn done(&self) -> &CancellationToken {
        &self.done
    }

    async fn send(&self, event: Event) {
        let terminal = event.is_terminal();
        let received = {
            let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            events.push(event);
            events.len()
        };

        let hang_up = match self.hang_up {
            HangUp::Never => false,
            HangUp::AfterEof => terminal,
            HangUp::AfterEvents(count) => received >= count,
        };
        if hang_up {
            self.done.cancel();
        }
    }
}

/// Connection to a viewer that never reads: every send blocks
pub struct StalledConnection {
    id: String,
    done: CancellationToken,
}

impl StalledConnection {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            done: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Connection for StalledConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn done(&self) -> &CancellationToken {
        &self.done
    }

    async fn send(&self, _event: Event) {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl<C: Connection> Connection for std::sync::Arc<C> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn done(&self) -> &CancellationToken {
        (**self).done()
    }

    async fn send(&self, event: Event) {
        (**self).send(event).await
    }
}
