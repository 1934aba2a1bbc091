//! Error types for the threadmill crate.

use std::time::Duration;

/// Result type alias for threadmill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving a pool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The task was dropped before it ran, e.g. because its pool was
    /// released with the task still queued.
    #[error("task cancelled before completion")]
    Cancelled,

    /// The task function panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// A bounded wait on a completion handle ran out of time.
    #[error("timed out after {0:?} waiting for task result")]
    Timeout(Duration),
}

impl Error {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a task panic error
    pub fn task_panicked<S: Into<String>>(msg: S) -> Self {
        Error::TaskPanicked(msg.into())
    }

    /// True for outcomes produced by the task itself rather than the
    /// engine: a captured panic or a cancellation.
    pub fn is_task_fault(&self) -> bool {
        matches!(self, Error::TaskPanicked(_) | Error::Cancelled)
    }
}
