//! In-memory repositories
//!
//! Stand-ins for the cluster used by tests and local experiments. The
//! execution lister records every selector it is queried with.

use async_trait::async_trait;
use livetail_core::domain::activity::ActivityRecord;
use livetail_core::domain::execution::ExecutionRecord;
use livetail_core::labels::LabelSet;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{ActivityStore, ExecutionLister, StoreError};

/// In-memory implementation of ActivityStore
#[derive(Default)]
pub struct MemoryActivityStore {
    records: Mutex<HashMap<(String, String), ActivityRecord>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ActivityRecord) {
        let key = (record.namespace.clone(), record.name.clone());
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, record);
    }

    pub fn with_record(self, record: ActivityRecord) -> Self {
        self.insert(record);
        self
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<ActivityRecord, StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("PipelineActivity {}/{}", namespace, name)))
    }
}

/// In-memory implementation of ExecutionLister
#[derive(Default)]
pub struct MemoryExecutionLister {
    executions: Mutex<Vec<ExecutionRecord>>,
    queries: Mutex<Vec<String>>,
}

impl MemoryExecutionLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, execution: ExecutionRecord) {
        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(execution);
    }

    pub fn with_execution(self, execution: ExecutionRecord) -> Self {
        self.insert(execution);
        self
    }

    /// Selectors queried so far, in call order
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ExecutionLister for MemoryExecutionLister {
    async fn list(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(selector.to_string());

        let selector = LabelSet::parse(selector)?;

        Ok(self
            .executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.namespace == namespace && selector.matches(&e.labels))
            .cloned()
            .collect())
    }
}
