//! Pod log tailer
//!
//! Follows the console output of executions by tailing the containers of
//! their pods:
//! - Pods of an execution are tailed in creation order
//! - Containers of a pod are tailed in declaration order
//! - New pods are picked up until the execution reports completion

use futures::StreamExt;
use livetail_core::domain::execution::ExecutionRecord;
use livetail_core::labels::EXECUTION_POD_LABEL;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{LogFeed, LogFeedSender, LogProducer, LogRequest, channel};
use crate::config::Config;
use crate::kube::{self, KubeClient, KubeError, ObjectList, PipelineRun, Pod};

/// Lines buffered between the tailer task and the session
const LINE_BUFFER: usize = 64;

#[derive(Debug, Error)]
enum TailError {
    #[error(transparent)]
    Kube(#[from] KubeError),

    #[error("timed out waiting for pod {0} to start")]
    PodStartTimeout(String),
}

/// Whether tailing should carry on after a step
enum Flow {
    Continue,
    Stop,
}

/// Producer that follows pod logs through the cluster API
#[derive(Debug, Clone)]
pub struct KubeLogProducer {
    client: KubeClient,
    poll_interval: Duration,
    start_timeout: Duration,
}

impl KubeLogProducer {
    pub fn new(client: KubeClient, poll_interval: Duration, start_timeout: Duration) -> Self {
        Self {
            client,
            poll_interval,
            start_timeout,
        }
    }

    pub fn from_config(client: KubeClient, config: &Config) -> Self {
        Self::new(client, config.pod_poll_interval, config.pod_start_timeout)
    }

    async fn tail_executions(
        &self,
        request: &LogRequest,
        tx: &LogFeedSender,
        cancel: &CancellationToken,
    ) -> Result<(), TailError> {
        for execution in &request.executions {
            debug!("Tailing execution {}/{}", execution.namespace, execution.name);

            if let Flow::Stop = self.tail_execution(execution, tx, cancel).await? {
                debug!("Stopped tailing {} early", request.name);
                break;
            }
        }

        Ok(())
    }

    async fn tail_execution(
        &self,
        execution: &ExecutionRecord,
        tx: &LogFeedSender,
        cancel: &CancellationToken,
    ) -> Result<Flow, TailError> {
        let mut seen = HashSet::new();

        loop {
            // Checked before listing so pods created right before completion are still tailed
            let finished = self.execution_finished(execution).await?;

            for pod in self.list_pods(execution).await? {
                if !seen.insert(pod.metadata.name.clone()) {
                    continue;
                }

                if let Flow::Stop = self.tail_pod(&execution.namespace, pod, tx, cancel).await? {
                    return Ok(Flow::Stop);
                }
            }

            if finished {
                return Ok(Flow::Continue);
            }

            if let Flow::Stop = self.pause(cancel).await {
                return Ok(Flow::Stop);
            }
        }
    }

    async fn execution_finished(&self, execution: &ExecutionRecord) -> Result<bool, TailError> {
        let path = kube::pipeline_run_path(&execution.namespace, &execution.name);

        match self.client.get_json::<PipelineRun>(&path, &[]).await {
            Ok(run) => Ok(run.is_finished()),
            Err(e) if e.is_not_found() => {
                warn!("Execution {} disappeared while tailing", execution.name);
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_pods(&self, execution: &ExecutionRecord) -> Result<Vec<Pod>, TailError> {
        let selector = format!("{}={}", EXECUTION_POD_LABEL, execution.name);
        let list: ObjectList<Pod> = self
            .client
            .get_json(
                &kube::pods_path(&execution.namespace),
                &[("labelSelector", selector.as_str())],
            )
            .await?;

        let mut pods = list.items;
        pods.sort_by(|a, b| {
            a.metadata
                .creation_timestamp
                .cmp(&b.metadata.creation_timestamp)
                .then_with(|| a.metadata.name.cmp(&b.metadata.name))
        });

        Ok(pods)
    }

    async fn tail_pod(
        &self,
        namespace: &str,
        pod: Pod,
        tx: &LogFeedSender,
        cancel: &CancellationToken,
    ) -> Result<Flow, TailError> {
        let Some(pod) = self.wait_for_start(namespace, pod, cancel).await? else {
            return Ok(Flow::Stop);
        };

        for container in &pod.spec.containers {
            let Some(response) = self
                .open_log(namespace, &pod.metadata.name, &container.name, cancel)
                .await?
            else {
                return Ok(Flow::Stop);
            };

            if let Flow::Stop = forward_lines(response, tx, cancel).await? {
                return Ok(Flow::Stop);
            }
        }

        Ok(Flow::Continue)
    }

    /// Poll a pod until it leaves Pending; None when cancelled
    async fn wait_for_start(
        &self,
        namespace: &str,
        mut pod: Pod,
        cancel: &CancellationToken,
    ) -> Result<Option<Pod>, TailError> {
        let deadline = self.start_deadline();

        while pod.is_pending() {
            if expired(deadline) {
                return Err(TailError::PodStartTimeout(pod.metadata.name));
            }

            if let Flow::Stop = self.pause(cancel).await {
                return Ok(None);
            }

            pod = self
                .client
                .get_json(&kube::pod_path(namespace, &pod.metadata.name), &[])
                .await?;
        }

        Ok(Some(pod))
    }

    /// Open a follow stream for one container, waiting while it has not started
    async fn open_log(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<reqwest::Response>, TailError> {
        let deadline = self.start_deadline();
        let path = kube::pod_log_path(namespace, pod);

        loop {
            match self
                .client
                .get_stream(&path, &[("container", container), ("follow", "true")])
                .await
            {
                Ok(response) => return Ok(Some(response)),
                Err(e) if e.is_bad_request() && !expired(deadline) => {
                    debug!("Container {}/{} not ready yet: {}", pod, container, e);
                    if let Flow::Stop = self.pause(cancel).await {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Deadline for a pod or container to start; None when too far out to represent
    fn start_deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.start_timeout)
    }

    async fn pause(&self, cancel: &CancellationToken) -> Flow {
        tokio::select! {
            _ = cancel.cancelled() => Flow::Stop,
            _ = tokio::time::sleep(self.poll_interval) => Flow::Continue,
        }
    }
}

impl LogProducer for KubeLogProducer {
    fn stream(&self, request: LogRequest, cancel: CancellationToken) -> LogFeed {
        let (tx, feed) = channel(LINE_BUFFER);
        let producer = self.clone();
        let name = request.name.clone();

        spawn_supervised(name, tx, |tx| async move {
            producer.tail_executions(&request, &tx, &cancel).await
        });

        feed
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Run a tailer task that owns a sender of the feed
///
/// A failure, or a panic of the task, ends the feed with a terminal error
/// instead of looking like a clean finish.
fn spawn_supervised<F, Fut, E>(name: String, tx: LogFeedSender, tail: F)
where
    F: FnOnce(LogFeedSender) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let worker = tokio::spawn(tail(tx.clone()));

    tokio::spawn(async move {
        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Tailing logs for {} failed: {}", name, e);
                tx.fail(e).await;
            }
            Err(e) => {
                warn!("Tailer for {} stopped abnormally: {}", name, e);
                tx.fail(format!("log tailer stopped abnormally: {}", e)).await;
            }
        }
    });
}

/// Forward a streamed log body to the feed, one line at a time
async fn forward_lines(
    response: reqwest::Response,
    tx: &LogFeedSender,
    cancel: &CancellationToken,
) -> Result<Flow, TailError> {
    let mut body = std::pin::pin!(response.bytes_stream());
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Ok(Flow::Stop),
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                pending.extend_from_slice(&bytes);
                for line in take_lines(&mut pending) {
                    if !tx.line(line).await {
                        return Ok(Flow::Stop);
                    }
                }
            }
            Some(Err(e)) => return Err(KubeError::from(e).into()),
            None => break,
        }
    }

    if !pending.is_empty() && !tx.line(decode_line(&pending)).await {
        return Ok(Flow::Stop);
    }

    Ok(Flow::Continue)
}

/// Remove every complete line from `pending`, leaving any partial line behind
fn take_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();

    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(decode_line(&raw));
    }

    lines
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
