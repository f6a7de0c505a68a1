//! Execution repository
//!
//! Lists executions matching an equality label selector.

use async_trait::async_trait;
use livetail_core::domain::execution::ExecutionRecord;

use super::StoreError;
use crate::kube::{self, KubeClient, ObjectList, PipelineRun};

/// Repository trait for execution records
#[async_trait]
pub trait ExecutionLister: Send + Sync {
    /// Lists executions matching a selector
    ///
    /// # Arguments
    /// * `namespace` - Namespace to search
    /// * `selector` - Equality selector such as `a=b,c=d`
    ///
    /// # Returns
    /// Matching executions in the order the backend returns them; possibly empty
    async fn list(&self, namespace: &str, selector: &str)
    -> Result<Vec<ExecutionRecord>, StoreError>;
}

/// Cluster-backed implementation of ExecutionLister
pub struct KubeExecutionLister {
    client: KubeClient,
}

impl KubeExecutionLister {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutionLister for KubeExecutionLister {
    async fn list(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        let runs: ObjectList<PipelineRun> = self
            .client
            .get_json(
                &kube::pipeline_runs_path(namespace),
                &[("labelSelector", selector)],
            )
            .await?;

        Ok(runs
            .items
            .into_iter()
            .map(|run| ExecutionRecord {
                name: run.metadata.name,
                namespace: run
                    .metadata
                    .namespace
                    .unwrap_or_else(|| namespace.to_string()),
                labels: run.metadata.labels,
                created_at: run.metadata.creation_timestamp,
            })
            .collect())
    }
}
