//! Repository layer
//!
//! Repositories are stateless clients for the records the server reads but
//! never owns: activity records and execution records. They provide simple,
//! focused interfaces without any business logic.
//!
//! All repositories are trait-based to enable testing and mocking.

mod activity;
mod execution;
pub mod memory;

use thiserror::Error;

use crate::kube::KubeError;

// Re-export traits
pub use activity::ActivityStore;
pub use execution::ExecutionLister;

// Re-export implementations
pub use activity::KubeActivityStore;
pub use execution::KubeExecutionLister;
pub use memory::{MemoryActivityStore, MemoryExecutionLister};

/// Repository error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Kube(#[from] KubeError),

    #[error("invalid selector: {0}")]
    InvalidSelector(#[from] livetail_core::labels::LabelError),
}
