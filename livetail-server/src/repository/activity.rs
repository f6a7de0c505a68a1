//! Activity repository
//!
//! Reads pipeline activity records by canonical name.

use async_trait::async_trait;
use livetail_core::domain::activity::ActivityRecord;

use super::StoreError;
use crate::kube::{self, KubeClient, Object};

/// Repository trait for activity records
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Fetches one activity record
    ///
    /// # Arguments
    /// * `namespace` - Namespace the record lives in
    /// * `name` - Canonical activity name
    ///
    /// # Returns
    /// The record, or `StoreError::NotFound` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<ActivityRecord, StoreError>;
}

/// Cluster-backed implementation of ActivityStore
pub struct KubeActivityStore {
    client: KubeClient,
}

impl KubeActivityStore {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActivityStore for KubeActivityStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ActivityRecord, StoreError> {
        let object: Object = self
            .client
            .get_json(&kube::activity_path(namespace, name), &[])
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    StoreError::NotFound(format!("PipelineActivity {}/{}", namespace, name))
                } else {
                    StoreError::Kube(e)
                }
            })?;

        Ok(ActivityRecord {
            name: object.metadata.name,
            namespace: object
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            labels: object.metadata.labels,
        })
    }
}
