//! Streaming Session
//!
//! Drives one viewer's live-log stream:
//! - Resolve the activity and locate its executions (before any connection)
//! - Stream the located executions through the event sink
//! - When a lone meta pipeline finishes cleanly, stream the build pipeline
//!   it scheduled, once
//! - Close with an optional error event and the end-of-feed event
//! - Hold the connection open until the viewer or the request goes away

use livetail_core::domain::activity::ActivityRecord;
use livetail_core::domain::coordinates::Coordinates;
use livetail_core::domain::event::{END_OF_FEED, EventKind};
use livetail_core::domain::execution::ExecutionSet;
use livetail_core::labels::{BUILD_PIPELINE, LabelSet};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::locator::{ExecutionLocator, LocateError, pipeline_type_filter};
use super::resolver::{CoordinateResolver, ResolveError};
use super::sink::EventSink;
use crate::producer::{LogProducer, LogRequest, ProducerError};
use crate::transport::Connection;

/// Errors that end a request before any stream is opened
#[derive(Debug, Error)]
pub enum LiveLogError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("no PipelineRun found using labelSelector {selector}")]
    TooEarly { selector: String },

    #[error("{0}")]
    Backend(String),
}

impl From<ResolveError> for LiveLogError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(what) => LiveLogError::NotFound(what),
            other => LiveLogError::Backend(other.to_string()),
        }
    }
}

impl From<LocateError> for LiveLogError {
    fn from(err: LocateError) -> Self {
        LiveLogError::Backend(err.to_string())
    }
}

/// Everything resolved for a request before its viewer connection opens
#[derive(Debug, Clone)]
pub struct PreparedStream {
    pub coordinates: Coordinates,
    pub activity: ActivityRecord,
    /// Canonical activity name
    pub name: String,
    pub executions: ExecutionSet,
}

/// State of one viewer's session, returned once it closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    pub connection_id: String,
    pub producer_error: Option<ProducerError>,
    pub retried: bool,
    pub lines_sent: usize,
}

impl StreamSession {
    fn new(connection_id: &str) -> Self {
        Self {
            connection_id: connection_id.to_string(),
            producer_error: None,
            retried: false,
            lines_sent: 0,
        }
    }

    /// Retry once, and only after a clean run over a lone meta pipeline
    fn should_retry(&self, executions: &ExecutionSet) -> bool {
        !self.retried && self.producer_error.is_none() && executions.is_lone_meta()
    }
}

/// Live-log streaming controller
pub struct LiveLogService {
    resolver: CoordinateResolver,
    locator: ExecutionLocator,
    producer: Arc<dyn LogProducer>,
}

impl LiveLogService {
    pub fn new(
        resolver: CoordinateResolver,
        locator: ExecutionLocator,
        producer: Arc<dyn LogProducer>,
    ) -> Self {
        Self {
            resolver,
            locator,
            producer,
        }
    }

    /// Build normalized coordinates from request parameters
    pub fn coordinates(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        build: &str,
        namespace: Option<&str>,
    ) -> Coordinates {
        self.resolver.coordinates(owner, repo, branch, build, namespace)
    }

    /// Resolve coordinates down to the executions to stream
    ///
    /// # Returns
    /// The prepared stream, or the error to answer the request with:
    /// `NotFound` without an activity, `TooEarly` without any execution yet
    pub async fn prepare(&self, coordinates: &Coordinates) -> Result<PreparedStream, LiveLogError> {
        let activity = self.resolver.resolve_activity(coordinates).await?;
        let build = activity.effective_build(&coordinates.build);

        let executions = self
            .locator
            .locate(coordinates, &build, &LabelSet::new())
            .await?;

        if executions.is_empty() {
            return Err(LiveLogError::TooEarly {
                selector: executions.selector,
            });
        }

        debug!(
            "Located {} PipelineRun(s) for {} using {}",
            executions.len(),
            coordinates,
            executions.selector
        );

        Ok(PreparedStream {
            coordinates: coordinates.clone(),
            name: coordinates.activity_name(),
            activity,
            executions,
        })
    }

    /// Stream a prepared request to a connected viewer
    ///
    /// Returns once the viewer disconnects or the request is cancelled,
    /// after the end-of-feed event has been sent.
    pub async fn stream<C: Connection>(
        &self,
        prepared: PreparedStream,
        connection: C,
        request: CancellationToken,
    ) -> StreamSession {
        let mut session = StreamSession::new(connection.id());
        let sink = EventSink::new(&connection, &request);

        info!(
            "Streaming live logs of {} to viewer {}",
            prepared.name, session.connection_id
        );

        // Producers stop early once the viewer is gone or the request is cancelled
        let producer_cancel = request.child_token();
        let _stop_producers = producer_cancel.clone().drop_guard();
        let forward_disconnect = {
            let done = connection.done().clone();
            let producer_cancel = producer_cancel.clone();
            tokio::spawn(async move {
                done.cancelled().await;
                producer_cancel.cancel();
            })
        };

        self.pump(
            &prepared,
            &prepared.executions,
            &sink,
            &producer_cancel,
            &mut session,
        )
        .await;

        if session.should_retry(&prepared.executions) {
            session.retried = true;

            if let Some(builds) = self.locate_build_pipeline(&prepared.coordinates).await {
                debug!(
                    "Meta pipeline of {} finished, following {} build PipelineRun(s)",
                    prepared.name,
                    builds.len()
                );
                self.pump(&prepared, &builds, &sink, &producer_cancel, &mut session)
                    .await;
            }
        }

        if let Some(error) = &session.producer_error {
            sink.send(EventKind::Error, error.to_string()).await;
        }
        sink.send(EventKind::Eof, END_OF_FEED).await;

        tokio::select! {
            _ = connection.done().cancelled() => {
                debug!("Viewer {} disconnected", session.connection_id);
            }
            _ = request.cancelled() => {
                debug!("Request of viewer {} cancelled", session.connection_id);
            }
        }

        forward_disconnect.abort();

        info!(
            "Closed live logs of {} for viewer {} ({} line(s), retried: {})",
            prepared.name, session.connection_id, session.lines_sent, session.retried
        );

        session
    }

    /// Drain one producer feed into the sink
    async fn pump<C: Connection>(
        &self,
        prepared: &PreparedStream,
        executions: &ExecutionSet,
        sink: &EventSink<'_, C>,
        cancel: &CancellationToken,
        session: &mut StreamSession,
    ) {
        let request = LogRequest {
            activity: prepared.activity.clone(),
            executions: executions.executions.clone(),
            name: prepared.name.clone(),
        };

        let mut feed = self.producer.stream(request, cancel.clone());
        while let Some(line) = feed.next().await {
            if sink.send(EventKind::Log, line.line).await {
                session.lines_sent += 1;
            }
        }

        if let Some(error) = feed.take_error() {
            warn!("Log producer for {} failed: {}", prepared.name, error);
            session.producer_error = Some(error);
        }
    }

    /// Look up the build pipeline scheduled by a finished meta pipeline
    async fn locate_build_pipeline(&self, coordinates: &Coordinates) -> Option<ExecutionSet> {
        match self
            .locator
            .locate(
                coordinates,
                &coordinates.build,
                &pipeline_type_filter(BUILD_PIPELINE),
            )
            .await
        {
            Ok(set) if !set.is_empty() => Some(set),
            Ok(set) => {
                debug!("No build PipelineRun found using {}", set.selector);
                None
            }
            Err(e) => {
                warn!("Failed to locate build PipelineRun: {}", e);
                None
            }
        }
    }
}
