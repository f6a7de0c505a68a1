//! Execution Locator
//!
//! Finds the executions of an activity by label selector. The execution
//! controller changed its label keys between major versions, and a cluster
//! in the middle of a migration holds executions labeled either way, so an
//! empty result with the current keys is retried once with the legacy keys.

use livetail_core::domain::coordinates::Coordinates;
use livetail_core::domain::execution::{ExecutionRecord, ExecutionSet};
use livetail_core::labels::{
    BRANCH_LABEL, BUILD_NUMBER_LABEL, LEGACY_BRANCH_LABEL, LEGACY_BUILD_LABEL, LEGACY_OWNER_LABEL,
    LEGACY_REPOSITORY_LABEL, LabelSet, ORG_LABEL, PIPELINE_TYPE_LABEL, REPO_LABEL,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::repository::{ExecutionLister, StoreError};

/// Listing failed; carries the selector that was attempted
#[derive(Debug, Error)]
#[error("failed to list PipelineRuns using labelSelector {selector}: {source}")]
pub struct LocateError {
    pub selector: String,
    #[source]
    pub source: StoreError,
}

/// Current-generation labels for the coordinates
pub fn current_labels(coordinates: &Coordinates, build: &str) -> LabelSet {
    [
        (ORG_LABEL, coordinates.owner.as_str()),
        (REPO_LABEL, coordinates.repo.as_str()),
        (BRANCH_LABEL, coordinates.branch.as_str()),
        (BUILD_NUMBER_LABEL, build),
    ]
    .into_iter()
    .collect()
}

/// Legacy-generation labels for the coordinates
pub fn legacy_labels(coordinates: &Coordinates, build: &str) -> LabelSet {
    [
        (LEGACY_OWNER_LABEL, coordinates.owner.as_str()),
        (LEGACY_REPOSITORY_LABEL, coordinates.repo.as_str()),
        (LEGACY_BRANCH_LABEL, coordinates.branch.as_str()),
        (LEGACY_BUILD_LABEL, build),
    ]
    .into_iter()
    .collect()
}

/// Extra filter restricting executions to one pipeline type
pub fn pipeline_type_filter(pipeline_type: &str) -> LabelSet {
    [(PIPELINE_TYPE_LABEL, pipeline_type)].into_iter().collect()
}

/// Locates executions for coordinates
pub struct ExecutionLocator {
    lister: Arc<dyn ExecutionLister>,
}

impl ExecutionLocator {
    pub fn new(lister: Arc<dyn ExecutionLister>) -> Self {
        Self { lister }
    }

    /// Locate the executions of one build
    ///
    /// # Arguments
    /// * `coordinates` - Owner, repository, branch and namespace to match
    /// * `build` - Build number as labeled on the executions
    /// * `extra` - Additional filters; only applied to the current-generation query
    ///
    /// # Returns
    /// The matching set and the selector that produced it. When both queries
    /// come back empty, the empty legacy result is returned.
    pub async fn locate(
        &self,
        coordinates: &Coordinates,
        build: &str,
        extra: &LabelSet,
    ) -> Result<ExecutionSet, LocateError> {
        let selector = extra.merge(&current_labels(coordinates, build)).to_string();
        let executions = self.query(&coordinates.namespace, &selector).await?;
        if !executions.is_empty() {
            return Ok(ExecutionSet::new(executions, selector));
        }

        let selector = legacy_labels(coordinates, build).to_string();
        let executions = self.query(&coordinates.namespace, &selector).await?;

        Ok(ExecutionSet::new(executions, selector))
    }

    async fn query(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<ExecutionRecord>, LocateError> {
        debug!("Listing PipelineRuns in {} using {}", namespace, selector);

        self.lister
            .list(namespace, selector)
            .await
            .map_err(|source| LocateError {
                selector: selector.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryExecutionLister;
    use async_trait::async_trait;
    use livetail_core::labels::{BUILD_PIPELINE, META_PIPELINE};

    const CURRENT: &str = "lighthouse.jenkins-x.io/branch=main,lighthouse.jenkins-x.io/buildNum=5,lighthouse.jenkins-x.io/refs.org=acme,lighthouse.jenkins-x.io/refs.repo=widgets";
    const LEGACY: &str = "branch=main,build=5,owner=acme,repository=widgets";

    fn coords() -> Coordinates {
        Coordinates::new("acme", "widgets", "main", "5", None, "jx")
    }

    fn current_run(name: &str) -> ExecutionRecord {
        ExecutionRecord::new(name, "jx")
            .with_label(ORG_LABEL, "acme")
            .with_label(REPO_LABEL, "widgets")
            .with_label(BRANCH_LABEL, "main")
            .with_label(BUILD_NUMBER_LABEL, "5")
    }

    fn legacy_run(name: &str) -> ExecutionRecord {
        ExecutionRecord::new(name, "jx")
            .with_label(LEGACY_OWNER_LABEL, "acme")
            .with_label(LEGACY_REPOSITORY_LABEL, "widgets")
            .with_label(LEGACY_BRANCH_LABEL, "main")
            .with_label(LEGACY_BUILD_LABEL, "5")
    }

    #[test]
    fn test_selector_text() {
        assert_eq!(current_labels(&coords(), "5").to_string(), CURRENT);
        assert_eq!(legacy_labels(&coords(), "5").to_string(), LEGACY);
    }

    #[tokio::test]
    async fn test_current_generation_match_skips_legacy() {
        let lister =
            Arc::new(MemoryExecutionLister::new().with_execution(current_run("run-1")));
        let locator = ExecutionLocator::new(lister.clone());

        let set = locator
            .locate(&coords(), "5", &LabelSet::new())
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.selector, CURRENT);
        assert_eq!(lister.queries(), vec![CURRENT]);
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy_labels() {
        let lister = Arc::new(MemoryExecutionLister::new().with_execution(legacy_run("run-1")));
        let locator = ExecutionLocator::new(lister.clone());

        let set = locator
            .locate(&coords(), "5", &LabelSet::new())
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.executions[0].name, "run-1");
        assert_eq!(set.selector, LEGACY);
        assert_eq!(lister.queries(), vec![CURRENT, LEGACY]);
    }

    #[tokio::test]
    async fn test_both_empty_returns_legacy_selector() {
        let lister = Arc::new(MemoryExecutionLister::new());
        let locator = ExecutionLocator::new(lister);

        let set = locator
            .locate(&coords(), "5", &LabelSet::new())
            .await
            .unwrap();

        assert!(set.is_empty());
        assert_eq!(set.selector, LEGACY);
    }

    #[tokio::test]
    async fn test_extra_filter_applies_to_current_query_only() {
        let lister = Arc::new(
            MemoryExecutionLister::new()
                .with_execution(
                    current_run("run-meta").with_label(PIPELINE_TYPE_LABEL, META_PIPELINE),
                )
                .with_execution(legacy_run("run-legacy")),
        );
        let locator = ExecutionLocator::new(lister.clone());

        let set = locator
            .locate(&coords(), "5", &pipeline_type_filter(BUILD_PIPELINE))
            .await
            .unwrap();

        let queries = lister.queries();
        assert!(queries[0].contains("jenkins.io/pipelineType=build"));
        assert_eq!(queries[1], LEGACY);
        assert_eq!(set.executions[0].name, "run-legacy");
    }

    struct FailingLister;

    #[async_trait]
    impl ExecutionLister for FailingLister {
        async fn list(
            &self,
            _namespace: &str,
            _selector: &str,
        ) -> Result<Vec<ExecutionRecord>, StoreError> {
            Err(StoreError::NotFound("namespace jx".to_string()))
        }
    }

    #[tokio::test]
    async fn test_list_error_carries_selector() {
        let locator = ExecutionLocator::new(Arc::new(FailingLister));

        let err = locator
            .locate(&coords(), "5", &LabelSet::new())
            .await
            .unwrap_err();

        assert_eq!(err.selector, CURRENT);
        assert!(err.to_string().contains(CURRENT));
    }
}
