//! Scripted log producer
//!
//! Replays pre-recorded feeds in order, one per `stream` call, and records
//! which executions each call asked for.

use livetail_core::domain::log::LogLine;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use super::{LogFeed, LogProducer, LogRequest, ProducerError};

/// Output of one `stream` call
#[derive(Debug, Clone, Default)]
pub struct FeedScript {
    pub lines: Vec<String>,
    pub error: Option<String>,
}

impl FeedScript {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Producer that replays queued scripts; an empty queue yields empty feeds
#[derive(Default)]
pub struct ScriptedLogProducer {
    scripts: Mutex<VecDeque<FeedScript>>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLogProducer {
    pub fn new<I: IntoIterator<Item = FeedScript>>(scripts: I) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Execution names requested by each `stream` call, in call order
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogProducer for ScriptedLogProducer {
    fn stream(&self, request: LogRequest, _cancel: CancellationToken) -> LogFeed {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.executions.iter().map(|e| e.name.clone()).collect());

        let script = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_default();

        LogFeed::completed(
            script.lines.into_iter().map(LogLine::from).collect(),
            script.error.map(ProducerError),
        )
    }
}
