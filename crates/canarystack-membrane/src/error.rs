//! Errors returned by stack operations.

use thiserror::Error;

use crate::config::ConfigError;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StackError {
    /// The stack carries fault flags; the operation did not run, or it ran
    /// and the postcondition audit found new faults.
    #[error("stack is faulted: {0}")]
    Faulted(Status),
    #[error("pop from an empty stack")]
    EmptyPop,
    /// Recoverable: the previous buffer is still in place.
    #[error("allocation of {requested_bytes} bytes failed")]
    AllocationFailed { requested_bytes: usize },
    #[error("capacity {requested} is below the current length {len}")]
    CapacityBelowLength { requested: usize, len: usize },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("stack was never constructed")]
    NotConstructed,
    #[error("stack was destroyed")]
    Destroyed,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StackError {
    /// Status flags that describe this error.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Faulted(status) => *status,
            Self::AllocationFailed { .. } => Status::BAD_MEM_ALLOC,
            Self::NotConstructed | Self::Destroyed => Status::BAD_DATA_PTR,
            Self::EmptyPop
            | Self::CapacityBelowLength { .. }
            | Self::IndexOutOfBounds { .. }
            | Self::Config(_) => Status::OK,
        }
    }

    /// Caller misuse rather than corruption.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::EmptyPop
                | Self::CapacityBelowLength { .. }
                | Self::IndexOutOfBounds { .. }
                | Self::Config(_)
        )
    }
}
