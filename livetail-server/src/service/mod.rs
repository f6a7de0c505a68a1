//! Service Module
//!
//! Business logic of the live-log server. Services sit between the HTTP
//! layer and the repositories, producers and transport:
//! - Resolver: coordinates to activity record
//! - Locator: activity to executions, across both labeling generations
//! - Session: drives one viewer's stream from first line to end of feed
//! - Sink: cancellation-aware event sending

pub mod locator;
pub mod resolver;
pub mod session;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

// Re-export for convenience
pub use locator::{ExecutionLocator, LocateError};
pub use resolver::{CoordinateResolver, ResolveError};
pub use session::{LiveLogError, LiveLogService, PreparedStream, StreamSession};
pub use sink::EventSink;
