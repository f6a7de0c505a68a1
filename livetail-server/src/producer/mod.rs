//! Log producers
//!
//! A producer turns a set of executions into a live feed of console lines.
//! The feed is lazy, finite and can only be consumed once; after it is
//! exhausted it may hold a terminal error.

mod feed;
mod scripted;
mod tail;

use livetail_core::domain::activity::ActivityRecord;
use livetail_core::domain::execution::ExecutionRecord;
use tokio_util::sync::CancellationToken;

pub use feed::{LogFeed, LogFeedSender, ProducerError, channel};
pub use scripted::{FeedScript, ScriptedLogProducer};
pub use tail::KubeLogProducer;

/// What to tail
#[derive(Debug, Clone)]
pub struct LogRequest {
    pub activity: ActivityRecord,
    pub executions: Vec<ExecutionRecord>,
    /// Canonical activity name the executions belong to
    pub name: String,
}

/// Produces live log feeds
pub trait LogProducer: Send + Sync {
    /// Start producing logs for the requested executions
    ///
    /// The returned feed ends when every execution has finished and its
    /// output was drained, or early when `cancel` fires.
    fn stream(&self, request: LogRequest, cancel: CancellationToken) -> LogFeed;
}
