//! Job lifecycle errors.

use docstamp_core::{JobId, JobStatus};
use thiserror::Error;

/// Errors raised when a runtime job record is asked to transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The job already reached a terminal status.
    #[error("job {id} is already finalized with status {status}")]
    AlreadyTerminal {
        /// The job identifier.
        id: JobId,
        /// The terminal status it holds.
        status: JobStatus,
    },
}
