//! # Completion and exception listeners.
//!
//! Listeners are collected per task and handed out in batches once the task's outcome is
//! recorded. A batch runs outside of the coordinator lock, on the worker that ran the body,
//! last-registered first.
//!
//! ## Rules
//! - Every listener of a batch runs, even if an earlier one panicked.
//! - The first panic of a batch is reported as [`InternalError::ListenerPanicked`].
//! - The task's own outcome is not affected by a panicking listener.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{InternalError, TaskError, panic_message};

/// Runs after the task completed successfully.
pub(crate) type CompletionListener = Box<dyn FnOnce() + Send>;

/// Runs after the task body failed; receives the failure.
pub(crate) type ExceptionListener = Box<dyn FnOnce(&TaskError) + Send>;

/// Listeners taken out of a task entry, ready to run.
pub(crate) enum ListenerBatch {
    Completion {
        task: Arc<str>,
        listeners: Vec<CompletionListener>,
    },
    Exception {
        task: Arc<str>,
        listeners: Vec<ExceptionListener>,
        error: TaskError,
    },
}

impl ListenerBatch {
    /// Runs the whole batch in reverse registration order.
    pub(crate) fn run(self) -> Result<(), InternalError> {
        let mut first_panic = None;
        let task = match self {
            ListenerBatch::Completion { task, listeners } => {
                for listener in listeners.into_iter().rev() {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(listener)) {
                        first_panic.get_or_insert_with(|| panic_message(payload.as_ref()));
                    }
                }
                task
            }
            ListenerBatch::Exception {
                task,
                listeners,
                error,
            } => {
                for listener in listeners.into_iter().rev() {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(&error))) {
                        first_panic.get_or_insert_with(|| panic_message(payload.as_ref()));
                    }
                }
                task
            }
        };

        match first_panic {
            None => Ok(()),
            Some(message) => Err(InternalError::ListenerPanicked {
                task: task.to_string(),
                message,
            }),
        }
    }
}
