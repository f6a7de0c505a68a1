//! Labels and label selectors
//!
//! Executions are found by equality label selectors. The label keys changed
//! between two generations of the execution controller, and both generations
//! can be present in a cluster at the same time, so both key sets live here.

use std::collections::BTreeMap;

use thiserror::Error;

// =============================================================================
// Label Keys
// =============================================================================

/// Current-generation organization label
pub const ORG_LABEL: &str = "lighthouse.jenkins-x.io/refs.org";
/// Current-generation repository label
pub const REPO_LABEL: &str = "lighthouse.jenkins-x.io/refs.repo";
/// Current-generation branch label
pub const BRANCH_LABEL: &str = "lighthouse.jenkins-x.io/branch";
/// Current-generation build number label, also set on activity records
pub const BUILD_NUMBER_LABEL: &str = "lighthouse.jenkins-x.io/buildNum";

pub const LEGACY_OWNER_LABEL: &str = "owner";
pub const LEGACY_REPOSITORY_LABEL: &str = "repository";
pub const LEGACY_BRANCH_LABEL: &str = "branch";
pub const LEGACY_BUILD_LABEL: &str = "build";

/// Classifies an execution as a meta (preparatory) or build pipeline
pub const PIPELINE_TYPE_LABEL: &str = "jenkins.io/pipelineType";
pub const META_PIPELINE: &str = "meta";
pub const BUILD_PIPELINE: &str = "build";

/// Label set on every pod created for an execution
pub const EXECUTION_POD_LABEL: &str = "tekton.dev/pipelineRun";

// =============================================================================
// Label Sets
// =============================================================================

/// Selector parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("invalid selector term '{0}': expected key=value")]
    InvalidTerm(String),

    #[error("empty label key in selector term '{0}'")]
    EmptyKey(String),
}

/// An ordered set of label key/value pairs
///
/// Formatting is deterministic: pairs are sorted by key and joined with `,`,
/// which is also the equality-selector syntax understood by the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge two sets; on conflicting keys the value from `overrides` wins
    pub fn merge(&self, overrides: &LabelSet) -> LabelSet {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        LabelSet(merged)
    }

    /// Whether every pair of this set is present in `labels`
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Parse an equality selector such as `a=b,c==d`
    ///
    /// An empty string parses to an empty set.
    pub fn parse(selector: &str) -> Result<Self, LabelError> {
        let mut set = LabelSet::new();

        for term in selector.split(',').map(str::trim) {
            if term.is_empty() {
                continue;
            }

            let (key, value) = term
                .split_once("==")
                .or_else(|| term.split_once('='))
                .ok_or_else(|| LabelError::InvalidTerm(term.to_string()))?;

            let key = key.trim();
            if key.is_empty() {
                return Err(LabelError::EmptyKey(term.to_string()));
            }

            set.insert(key, value.trim());
        }

        Ok(set)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LabelSet(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for LabelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_sorted_by_key() {
        let set: LabelSet = [("repository", "widgets"), ("build", "5"), ("owner", "acme")]
            .into_iter()
            .collect();

        assert_eq!(set.to_string(), "build=5,owner=acme,repository=widgets");
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let extra: LabelSet = [(PIPELINE_TYPE_LABEL, "build"), (BRANCH_LABEL, "other")]
            .into_iter()
            .collect();
        let coords: LabelSet = [(BRANCH_LABEL, "main")].into_iter().collect();

        let merged = extra.merge(&coords);
        assert_eq!(merged.get(BRANCH_LABEL), Some("main"));
        assert_eq!(merged.get(PIPELINE_TYPE_LABEL), Some("build"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_parse_selector() {
        let set = LabelSet::parse("jenkins.io/pipelineType=build, owner==acme").unwrap();
        assert_eq!(set.get(PIPELINE_TYPE_LABEL), Some("build"));
        assert_eq!(set.get("owner"), Some("acme"));

        assert!(LabelSet::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_selector_rejects_bad_terms() {
        assert!(matches!(
            LabelSet::parse("owner"),
            Err(LabelError::InvalidTerm(_))
        ));
        assert!(matches!(
            LabelSet::parse("=acme"),
            Err(LabelError::EmptyKey(_))
        ));
    }

    #[test]
    fn test_matches() {
        let selector = LabelSet::parse("owner=acme,build=5").unwrap();

        let mut labels = BTreeMap::new();
        labels.insert("owner".to_string(), "acme".to_string());
        labels.insert("build".to_string(), "5".to_string());
        labels.insert("branch".to_string(), "main".to_string());
        assert!(selector.matches(&labels));

        labels.insert("build".to_string(), "6".to_string());
        assert!(!selector.matches(&labels));
    }
}
