//! Coordinates domain types
//!
//! Business coordinates identify a pipeline run the way users think about it:
//! which repository, which branch, which build number.

use serde::{Deserialize, Serialize};

use crate::naming::to_valid_name;

/// Branch prefix used by pull-request builds, matched case-insensitively
pub const PULL_REQUEST_PREFIX: &str = "pr-";

/// Business coordinates of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub build: String,
    pub namespace: String,
}

impl Coordinates {
    /// Build coordinates from request parameters
    ///
    /// Pull-request branches are upper-cased, and a missing or empty namespace
    /// is replaced by `default_namespace`.
    ///
    /// # Arguments
    /// * `owner` - Source-control organization
    /// * `repo` - Repository name
    /// * `branch` - Branch name, or pull-request reference such as `pr-7`
    /// * `build` - Business build number
    /// * `namespace` - Namespace from the request, if any
    /// * `default_namespace` - Namespace used when the request carries none
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: &str,
        build: impl Into<String>,
        namespace: Option<&str>,
        default_namespace: &str,
    ) -> Self {
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => ns.to_string(),
            _ => default_namespace.to_string(),
        };

        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: normalize_branch(branch),
            build: build.into(),
            namespace,
        }
    }

    /// Canonical name of the activity record for these coordinates
    pub fn activity_name(&self) -> String {
        to_valid_name(&format!(
            "{}-{}-{}-{}",
            self.owner, self.repo, self.branch, self.build
        ))
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}#{} (namespace {})",
            self.owner, self.repo, self.branch, self.build, self.namespace
        )
    }
}

/// Upper-case a branch that names a pull request, leave anything else untouched
pub fn normalize_branch(branch: &str) -> String {
    let is_pull_request = branch
        .get(..PULL_REQUEST_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PULL_REQUEST_PREFIX));

    if is_pull_request {
        branch.to_uppercase()
    } else {
        branch.to_string()
    }
}
