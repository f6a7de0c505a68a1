//! Log domain types

use serde::{Deserialize, Serialize};

/// A single line of console output produced by a running execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub line: String,
}

impl LogLine {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

impl From<String> for LogLine {
    fn from(line: String) -> Self {
        Self { line }
    }
}

impl From<&str> for LogLine {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}
