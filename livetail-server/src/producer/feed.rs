//! Log feed channel

use livetail_core::domain::log::LogLine;
use thiserror::Error;
use tokio::sync::mpsc;

/// Terminal failure reported by a producer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProducerError(pub String);

enum FeedItem {
    Line(LogLine),
    Failed(ProducerError),
}

/// Create a connected sender/feed pair
pub fn channel(buffer: usize) -> (LogFeedSender, LogFeed) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (
        LogFeedSender { tx },
        LogFeed {
            rx,
            error: None,
            exhausted: false,
        },
    )
}

/// Producing half of a log feed
///
/// The feed ends once every clone has been dropped.
#[derive(Clone)]
pub struct LogFeedSender {
    tx: mpsc::Sender<FeedItem>,
}

impl LogFeedSender {
    /// Push one line; returns false once the feed has been dropped
    pub async fn line(&self, line: impl Into<LogLine>) -> bool {
        self.tx.send(FeedItem::Line(line.into())).await.is_ok()
    }

    /// End the feed with a terminal error
    pub async fn fail(self, error: impl std::fmt::Display) {
        let _ = self
            .tx
            .send(FeedItem::Failed(ProducerError(error.to_string())))
            .await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half of a log feed
pub struct LogFeed {
    rx: mpsc::Receiver<FeedItem>,
    error: Option<ProducerError>,
    exhausted: bool,
}

impl LogFeed {
    /// A feed that is already complete, optionally ending in an error
    pub fn completed(lines: Vec<LogLine>, error: Option<ProducerError>) -> Self {
        let (tx, rx) = mpsc::channel(lines.len() + 1);
        for line in lines {
            let _ = tx.try_send(FeedItem::Line(line));
        }
        if let Some(error) = error {
            let _ = tx.try_send(FeedItem::Failed(error));
        }

        LogFeed {
            rx,
            error: None,
            exhausted: false,
        }
    }

    /// Next line, or None once the producer is done
    pub async fn next(&mut self) -> Option<LogLine> {
        if self.exhausted {
            return None;
        }

        loop {
            match self.rx.recv().await {
                Some(FeedItem::Line(line)) => return Some(line),
                Some(FeedItem::Failed(error)) => self.error = Some(error),
                None => {
                    self.exhausted = true;
                    return None;
                }
            }
        }
    }

    /// Terminal error, meaningful after `next` returned None
    pub fn error(&self) -> Option<&ProducerError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<ProducerError> {
        self.error.take()
    }
}
