//! Activity domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::labels::BUILD_NUMBER_LABEL;

/// Metadata describing one pipeline activity
///
/// Owned by the activity store; read-only from the streaming side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ActivityRecord {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Build number used by the executions of this activity
    ///
    /// The scheduler may number its executions differently from the business
    /// build number; when it does, it records its own number as a label on the
    /// activity. Falls back to `build` when the label is missing or empty.
    pub fn effective_build(&self, build: &str) -> String {
        match self.labels.get(BUILD_NUMBER_LABEL) {
            Some(number) if !number.is_empty() => number.clone(),
            _ => build.to_string(),
        }
    }
}
