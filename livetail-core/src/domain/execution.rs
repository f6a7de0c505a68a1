//! Execution domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::labels::{META_PIPELINE, PIPELINE_TYPE_LABEL};

/// One scheduled, running or completed execution of a pipeline
///
/// Immutable snapshot as returned by the execution list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Value of the pipeline-type label, if any
    pub fn pipeline_type(&self) -> Option<&str> {
        self.labels.get(PIPELINE_TYPE_LABEL).map(String::as_str)
    }

    /// Whether this is a preparatory meta pipeline
    pub fn is_meta(&self) -> bool {
        self.pipeline_type() == Some(META_PIPELINE)
    }
}

/// Executions matched by one selector query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSet {
    pub executions: Vec<ExecutionRecord>,
    /// Selector text that produced this set
    pub selector: String,
}

impl ExecutionSet {
    pub fn new(executions: Vec<ExecutionRecord>, selector: impl Into<String>) -> Self {
        Self {
            executions,
            selector: selector.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// Whether the set is exactly one meta pipeline
    ///
    /// In that case the build pipeline it prepares has not been scheduled
    /// yet when the set was queried.
    pub fn is_lone_meta(&self) -> bool {
        matches!(self.executions.as_slice(), [only] if only.is_meta())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::BUILD_PIPELINE;

    #[test]
    fn test_is_lone_meta() {
        let meta =
            ExecutionRecord::new("run-meta", "jx").with_label(PIPELINE_TYPE_LABEL, META_PIPELINE);
        let build =
            ExecutionRecord::new("run-build", "jx").with_label(PIPELINE_TYPE_LABEL, BUILD_PIPELINE);

        assert!(ExecutionSet::new(vec![meta.clone()], "").is_lone_meta());
        assert!(!ExecutionSet::new(vec![build.clone()], "").is_lone_meta());
        assert!(!ExecutionSet::new(vec![meta.clone(), meta], "").is_lone_meta());
        assert!(!ExecutionSet::default().is_lone_meta());
    }

    #[test]
    fn test_pipeline_type_missing() {
        let run = ExecutionRecord::new("run", "jx");
        assert_eq!(run.pipeline_type(), None);
        assert!(!run.is_meta());
    }
}
