/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for serial queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Serial queue errors with serialization support
///
/// Adaptive locks never fail; every variant here belongs to the serial
/// queue family.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum QueueError {
    #[error("Failed to start {backend} backend: {reason}")]
    #[diagnostic(
        code(queue::resource_exhaustion),
        help("The system could not provide a worker thread or work pool. Check thread limits.")
    )]
    ResourceExhaustion { backend: String, reason: String },

    #[error("Invalid worker thread name {name:?}: {reason}")]
    #[diagnostic(
        code(queue::invalid_name),
        help("Queue names and thread names become OS thread names and cannot contain NUL bytes.")
    )]
    InvalidName { name: String, reason: String },

    #[error("Task panicked: {message}")]
    #[diagnostic(
        code(queue::task_panicked),
        help("The submitted closure panicked. The queue kept running; only this task failed.")
    )]
    TaskPanicked { message: String },

    #[error("Task was dropped before producing a result")]
    #[diagnostic(
        code(queue::abandoned),
        help("The task never ran. This indicates the worker was torn down abnormally.")
    )]
    Abandoned,
}

impl QueueError {
    pub(crate) fn resource_exhaustion(backend: &str, reason: impl ToString) -> Self {
        QueueError::ResourceExhaustion {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_name(name: &str, reason: impl ToString) -> Self {
        QueueError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the task body rather than the queue
    pub fn is_task_failure(&self) -> bool {
        matches!(self, QueueError::TaskPanicked { .. })
    }
}
