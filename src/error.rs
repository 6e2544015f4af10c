//! Error types used by the coordinator and by tasks.
//!
//! - [`TaskError`]: outcome of a single task body; also what [`ResultHandle::get`] reports.
//! - [`InternalError`]: violations of the coordinator's own invariants.
//! - [`RuntimeError`]: the one failure surfaced by [`Coordinator::check_exception`]
//!   and [`Coordinator::close`].
//! - [`SubmitError`]: synchronous rejection of a submission or of a coordinator build.
//!
//! All of them provide `as_label` for logs/metrics.
//!
//! [`ResultHandle::get`]: crate::ResultHandle::get
//! [`Coordinator::check_exception`]: crate::Coordinator::check_exception
//! [`Coordinator::close`]: crate::Coordinator::close

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::tasks::{Stage, TaskCategory};

/// # Errors produced by task execution.
///
/// A body returns [`TaskError::Fail`] (usually through [`TaskError::fail`]); the other
/// variants are produced by the coordinator when a body panics or when a result is read
/// from a handle that cannot provide one.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task body returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task body panicked.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The result was requested from a handle that was stopped before producing one.
    #[error("task `{task}` was stopped before producing a result")]
    Stopped {
        /// Name of the stopped task.
        task: String,
    },

    /// The result was requested before it was decided while dependency verification is on.
    ///
    /// This is a programming error of the caller: the task reading the result did not
    /// declare the other one as a dependency.
    #[error("result of `{task}` read before it was decided; it is not a declared dependency")]
    UndeclaredDependency {
        /// Name of the task whose result was read.
        task: String,
    },
}

impl TaskError {
    /// Wraps any displayable error into [`TaskError::Fail`].
    ///
    /// # Example
    /// ```
    /// use taskcoord::TaskError;
    ///
    /// let err = TaskError::fail("disk full");
    /// assert_eq!(err.to_string(), "execution failed: disk full");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Stopped { .. } => "task_stopped",
            TaskError::UndeclaredDependency { .. } => "task_undeclared_dependency",
        }
    }

    /// True for errors that describe a missing result rather than a failed body.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            TaskError::Stopped { .. } | TaskError::UndeclaredDependency { .. }
        )
    }
}

/// # Violations of the coordinator's own invariants.
///
/// An internal error always takes priority over a task failure that was recorded
/// before it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// A handle was finished twice.
    #[error("task `{task}` finished more than once")]
    DoubleCompletion {
        /// Task name.
        task: String,
    },

    /// A handle was asked to make a transition its state machine does not allow.
    #[error("task `{task}` cannot move from {from} to {to}")]
    IllegalTransition {
        /// Task name.
        task: String,
        /// Stage the handle was in.
        from: Stage,
        /// Requested stage.
        to: Stage,
    },

    /// A completion or exception listener panicked.
    #[error("listener of task `{task}` panicked: {message}")]
    ListenerPanicked {
        /// Task name.
        task: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// A subscriber (logger) panicked while handling an event.
    #[error("subscriber `{subscriber}` panicked: {message}")]
    SubscriberPanicked {
        /// Subscriber name.
        subscriber: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// A resource rejected a request although no task of this coordinator held a share of it.
    ///
    /// Such a request can never be satisfied, so it is escalated instead of retried.
    #[error("resource `{resource}` rejected task `{task}` while no share of it was held")]
    ResourceProtocol {
        /// Task name.
        task: String,
        /// Resource name.
        resource: String,
    },

    /// A result was read before it was decided with dependency verification enabled.
    #[error("result of `{task}` read before it was decided; declare it as a dependency")]
    UndeclaredDependency {
        /// Name of the task whose result was read.
        task: String,
    },
}

impl InternalError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InternalError::DoubleCompletion { .. } => "internal_double_completion",
            InternalError::IllegalTransition { .. } => "internal_illegal_transition",
            InternalError::ListenerPanicked { .. } => "internal_listener_panicked",
            InternalError::SubscriberPanicked { .. } => "internal_subscriber_panicked",
            InternalError::ResourceProtocol { .. } => "internal_resource_protocol",
            InternalError::UndeclaredDependency { .. } => "internal_undeclared_dependency",
        }
    }
}

/// # The failure a coordinator reports to its caller.
///
/// At most one is recorded per coordinator; it is returned once, either from an
/// explicit [`Coordinator::check_exception`](crate::Coordinator::check_exception) or
/// from [`Coordinator::close`](crate::Coordinator::close).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A task body failed.
    #[error("task `{task}` failed: {error}")]
    Task {
        /// Task name.
        task: String,
        /// What the body reported.
        error: TaskError,
    },

    /// The coordinator detected a violation of its own invariants.
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

impl RuntimeError {
    /// True for [`RuntimeError::Internal`].
    pub fn is_internal(&self) -> bool {
        matches!(self, RuntimeError::Internal(_))
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Task { error, .. } => error.as_label(),
            RuntimeError::Internal(err) => err.as_label(),
        }
    }
}

/// # Synchronous rejections.
///
/// Returned by [`Coordinator::execute`](crate::Coordinator::execute) and friends before
/// any handle is created, and by [`CoordinatorBuilder::build`](crate::CoordinatorBuilder::build).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// No pool was registered for the task's category.
    #[error("no pool registered for task category `{category}`")]
    UnknownCategory {
        /// The rejected category.
        category: TaskCategory,
    },

    /// A declared dependency was created by another coordinator.
    #[error("dependency `{task}` belongs to another coordinator")]
    ForeignDependency {
        /// Name of the foreign handle.
        task: String,
    },

    /// The coordinator has been closed.
    #[error("coordinator is closed")]
    Closed,

    /// Default pools were requested outside of a tokio runtime.
    #[error("no tokio runtime available for the default pools")]
    NoRuntime,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::UnknownCategory { .. } => "submit_unknown_category",
            SubmitError::ForeignDependency { .. } => "submit_foreign_dependency",
            SubmitError::Closed => "submit_closed",
            SubmitError::NoRuntime => "submit_no_runtime",
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_wins_label() {
        let ext = RuntimeError::Task {
            task: "a".into(),
            error: TaskError::fail("boom"),
        };
        let int = RuntimeError::from(InternalError::DoubleCompletion { task: "a".into() });
        assert!(!ext.is_internal());
        assert!(int.is_internal());
        assert_eq!(ext.as_label(), "task_failed");
        assert_eq!(int.as_label(), "internal_double_completion");
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_access_errors() {
        assert!(TaskError::Stopped { task: "x".into() }.is_access_error());
        assert!(!TaskError::fail("x").is_access_error());
    }
}
