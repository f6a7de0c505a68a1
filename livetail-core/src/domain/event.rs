//! Stream event types
//!
//! A live-log stream is a sequence of events: any number of `log` events,
//! at most one `error` event, and a final `EOF` event.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payload of the terminal event
pub const END_OF_FEED: &str = "End Of Feed";

/// Type tag of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "log")]
    Log,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "EOF")]
    Eof,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Log => "log",
            EventKind::Error => "error",
            EventKind::Eof => "EOF",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventKind(pub String);

impl std::str::FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(EventKind::Log),
            "error" => Ok(EventKind::Error),
            "EOF" => Ok(EventKind::Eof),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// One server-pushed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    pub data: String,
}

impl Event {
    /// Create an event with a freshly generated id
    pub fn new(kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            data: data.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == EventKind::Eof
    }
}
