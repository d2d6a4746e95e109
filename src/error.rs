//! Error types used by the process tree and by task hooks.
//!
//! This module defines two error enums:
//!
//! - [`ProcessError`] — errors raised by the tree itself (start rollback, misuse).
//! - [`TaskError`] — errors raised by user hooks ([`Hooks::on_start`](crate::Hooks::on_start)).
//!
//! Both types provide `as_label` for logs/metrics.

use thiserror::Error;

/// # Errors produced by the process tree.
///
/// Closing a process never fails; the only failures happen while starting one.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// `on_start` returned an error. The child was fully closed before this was returned.
    #[error("process {label:?} failed to start: {source}")]
    Start {
        /// Label of the process that failed to start.
        label: String,
        /// The error returned by the hook, unchanged.
        #[source]
        source: TaskError,
    },

    /// A child was requested on a parent that is already closing or closed.
    #[error("cannot start child {label:?} on closing/closed parent (id={parent})")]
    ParentClosed {
        /// Id of the parent that rejected the child.
        parent: i64,
        /// Label of the rejected child.
        label: String,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use proctree::ProcessError;
    ///
    /// let err = ProcessError::ParentClosed { parent: 1, label: "worker".into() };
    /// assert_eq!(err.as_label(), "process_parent_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Start { .. } => "process_start_failed",
            ProcessError::ParentClosed { .. } => "process_parent_closed",
        }
    }

    /// Returns the hook error for [`ProcessError::Start`].
    pub fn task_error(&self) -> Option<&TaskError> {
        match self {
            ProcessError::Start { source, .. } => Some(source),
            ProcessError::ParentClosed { .. } => None,
        }
    }
}

/// # Errors produced by task hooks.
///
/// Returned from [`Hooks::on_start`](crate::Hooks::on_start) and handed back to the
/// caller of `start_child` inside [`ProcessError::Start`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Non-recoverable error; the caller should not try again.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Start failed but may succeed if the caller tries again.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The hook observed that its process (or an ancestor) is closing.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use proctree::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether the caller may retry the start.
    ///
    /// Returns `true` only for [`TaskError::Fail`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. })
    }
}
