//! Coordinate Resolver
//!
//! Turns request coordinates into the activity record they name.

use livetail_core::domain::activity::ActivityRecord;
use livetail_core::domain::coordinates::Coordinates;
use std::sync::Arc;
use thiserror::Error;

use crate::repository::{ActivityStore, StoreError};

/// Resolver error type
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("failed to get activity {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Resolves coordinates against the activity store
pub struct CoordinateResolver {
    store: Arc<dyn ActivityStore>,
    default_namespace: String,
}

impl CoordinateResolver {
    /// Creates a new resolver
    ///
    /// # Arguments
    /// * `store` - Activity store to read from
    /// * `default_namespace` - Namespace used for requests that do not name one
    pub fn new(store: Arc<dyn ActivityStore>, default_namespace: impl Into<String>) -> Self {
        Self {
            store,
            default_namespace: default_namespace.into(),
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
        Coordinates::new(owner, repo, branch, build, namespace, &self.default_namespace)
    }

    /// Fetch the activity record named by `coordinates`
    pub async fn resolve_activity(
        &self,
        coordinates: &Coordinates,
    ) -> Result<ActivityRecord, ResolveError> {
        let name = coordinates.activity_name();

        self.store
            .get(&coordinates.namespace, &name)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(what) => ResolveError::NotFound(what),
                source => ResolveError::Backend {
                    name: name.clone(),
                    source,
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryActivityStore;
    use livetail_core::labels::BUILD_NUMBER_LABEL;

    fn resolver(store: MemoryActivityStore) -> CoordinateResolver {
        CoordinateResolver::new(Arc::new(store), "jx")
    }

    #[tokio::test]
    async fn test_resolve_existing_activity() {
        let store = MemoryActivityStore::new().with_record(
            ActivityRecord::new("acme-widgets-main-5", "jx").with_label(BUILD_NUMBER_LABEL, "42"),
        );
        let resolver = resolver(store);

        let coords = resolver.coordinates("acme", "widgets", "main", "5", None);
        let activity = resolver.resolve_activity(&coords).await.unwrap();

        assert_eq!(activity.name, "acme-widgets-main-5");
        assert_eq!(activity.effective_build(&coords.build), "42");
    }

    #[tokio::test]
    async fn test_resolve_missing_activity() {
        let resolver = resolver(MemoryActivityStore::new());

        let coords = resolver.coordinates("acme", "widgets", "main", "5", None);
        assert!(matches!(
            resolver.resolve_activity(&coords).await,
            Err(ResolveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pull_request_branch_resolves_upper_cased() {
        let store = MemoryActivityStore::new()
            .with_record(ActivityRecord::new("acme-widgets-pr-7-1", "ci"));
        let resolver = resolver(store);

        let coords = resolver.coordinates("acme", "widgets", "pr-7", "1", Some("ci"));
        assert_eq!(coords.branch, "PR-7");
        assert!(resolver.resolve_activity(&coords).await.is_ok());
    }
}
