//! # Task handles.
//!
//! [`Handle`] is the caller's token for one task: it reports the task's stage and
//! outcome, accepts listeners and can stop the task. [`ResultHandle`] adds access to the
//! value the body produced.
//!
//! Handles hold only a weak reference to their coordinator, so they stay usable as
//! read-only result carriers after the coordinator is closed and dropped.
//!
//! ## Outcome
//! ```text
//! completed ── body returned Ok            ─► get() = value
//! failed    ── body returned Err / panicked ─► get() = that error
//! stopped   ── stopped before a result      ─► get() = TaskError::Stopped
//! ```

use std::fmt;
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock, Weak};

use crate::core::Shared;
use crate::error::{InternalError, TaskError, panic_message};
use crate::tasks::listener::{CompletionListener, ExceptionListener};
use crate::tasks::task::{Outcome, TaskCell, TaskId};
use crate::tasks::{Stage, TaskCategory};

/// Token for one submitted task.
///
/// Cheap to clone; all clones observe the same task.
#[derive(Clone)]
pub struct Handle {
    pub(crate) cell: Arc<TaskCell>,
    pub(crate) coordinator: Weak<Shared>,
}

impl Handle {
    pub(crate) fn new(cell: Arc<TaskCell>, coordinator: Weak<Shared>) -> Self {
        Self { cell, coordinator }
    }

    /// Sequence id of the task within its coordinator.
    pub fn id(&self) -> TaskId {
        self.cell.id
    }

    /// Unique (de-duplicated) task name.
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Category the task was submitted under.
    pub fn category(&self) -> &TaskCategory {
        &self.cell.category
    }

    /// Current stage of the task's state machine.
    pub fn stage(&self) -> Stage {
        self.cell.stage()
    }

    /// True once the body returned successfully.
    pub fn has_completed(&self) -> bool {
        matches!(self.cell.outcome(), Outcome::Completed)
    }

    /// True once the body failed.
    pub fn has_failed(&self) -> bool {
        matches!(self.cell.outcome(), Outcome::Failed(_))
    }

    /// True if the task was stopped before it produced a result.
    pub fn has_stopped(&self) -> bool {
        matches!(self.cell.outcome(), Outcome::Stopped)
    }

    /// True once the task released everything it held.
    pub fn is_terminated(&self) -> bool {
        self.cell.stage() == Stage::Terminated
    }

    /// True once the outcome is known.
    pub fn is_decided(&self) -> bool {
        self.cell.is_decided()
    }

    /// Failure recorded for this task, if its body failed.
    pub fn exception(&self) -> Option<TaskError> {
        match self.cell.outcome() {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Registers a listener that runs once the task completed successfully.
    ///
    /// Listeners run last-registered first, on the worker that ran the body. If the task
    /// already terminated, the listener runs right away on the calling thread, and only
    /// if the task completed. A panicking listener is an internal error of the coordinator.
    pub fn on_completion<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let listener: CompletionListener = Box::new(listener);
        let late = match self.coordinator.upgrade() {
            Some(shared) => shared.add_completion_listener(self.cell.id, listener),
            None => Some(listener),
        };
        if let Some(listener) = late {
            if matches!(self.cell.outcome(), Outcome::Completed) {
                self.run_late(listener);
            }
        }
    }

    /// Registers a listener that runs once the task body failed.
    ///
    /// Same ordering and late-registration rules as [`Handle::on_completion`].
    pub fn on_exception<F>(&self, listener: F)
    where
        F: FnOnce(&TaskError) + Send + 'static,
    {
        let listener: ExceptionListener = Box::new(listener);
        let late = match self.coordinator.upgrade() {
            Some(shared) => shared.add_exception_listener(self.cell.id, listener),
            None => Some(listener),
        };
        if let Some(listener) = late {
            if let Outcome::Failed(err) = self.cell.outcome() {
                self.run_late(move || listener(&err));
            }
        }
    }

    /// Stops the task and, transitively, everything depending on it.
    ///
    /// Idempotent. A task that already produced its outcome keeps it.
    pub fn stop(&self) {
        if let Some(shared) = self.coordinator.upgrade() {
            shared.stop_task(self.cell.id);
        }
    }

    fn run_late(&self, listener: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(listener)) {
            let fault = InternalError::ListenerPanicked {
                task: self.cell.name.to_string(),
                message: panic_message(payload.as_ref()),
            };
            match self.coordinator.upgrade() {
                Some(shared) => shared.record_fault(fault),
                None => tracing::error!(error = %fault, "listener panicked after coordinator was dropped"),
            }
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .field("stage", &self.cell.stage())
            .finish()
    }
}

impl AsRef<Handle> for Handle {
    fn as_ref(&self) -> &Handle {
        self
    }
}

/// Handle of a task producing a value of type `T`.
///
/// Dereferences to [`Handle`] for state queries, listeners and `stop`.
pub struct ResultHandle<T> {
    handle: Handle,
    value: Arc<OnceLock<T>>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(handle: Handle, value: Arc<OnceLock<T>>) -> Self {
        Self { handle, value }
    }

    /// The untyped handle, e.g. to declare it as a dependency.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Consumes the result handle and returns the untyped one.
    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl<T: Clone> ResultHandle<T> {
    /// Waits for the outcome and returns the value or the error.
    ///
    /// Suspends until the task is decided. With dependency verification enabled, reading an
    /// undecided result is a contract violation instead: the coordinator records
    /// [`InternalError::UndeclaredDependency`] and this returns
    /// [`TaskError::UndeclaredDependency`] without waiting.
    pub async fn get(&self) -> Result<T, TaskError> {
        if !self.handle.cell.is_decided() {
            if let Some(shared) = self.handle.coordinator.upgrade() {
                if shared.cfg.verify_dependencies {
                    let task = self.handle.cell.name.to_string();
                    shared.record_fault(InternalError::UndeclaredDependency { task: task.clone() });
                    return Err(TaskError::UndeclaredDependency { task });
                }
            }
            self.handle.cell.wait_decided().await;
        }
        self.try_get().unwrap_or_else(|| {
            Err(TaskError::Stopped {
                task: self.handle.cell.name.to_string(),
            })
        })
    }

    /// Returns the outcome if it is already decided, without waiting.
    pub fn try_get(&self) -> Option<Result<T, TaskError>> {
        let stopped = || TaskError::Stopped {
            task: self.handle.cell.name.to_string(),
        };
        match self.handle.cell.outcome() {
            Outcome::Pending => None,
            Outcome::Completed => Some(self.value.get().cloned().ok_or_else(stopped)),
            Outcome::Failed(err) => Some(Err(err)),
            Outcome::Stopped => Some(Err(stopped())),
        }
    }
}

impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for ResultHandle<T> {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.handle
    }
}

impl<T> AsRef<Handle> for ResultHandle<T> {
    fn as_ref(&self) -> &Handle {
        &self.handle
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultHandle").field(&self.handle).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::task::CoordinatorId;

    fn detached(name: &str) -> (Handle, ResultHandle<u32>) {
        let cell = Arc::new(TaskCell::new(
            TaskId(1),
            Arc::from(name),
            TaskCategory::Default,
            CoordinatorId::next(),
        ));
        let handle = Handle::new(cell, Weak::new());
        let result = ResultHandle::new(handle.clone(), Arc::new(OnceLock::new()));
        (handle, result)
    }

    #[test]
    fn test_try_get_follows_outcome() {
        let (handle, result) = detached("t");
        assert!(result.try_get().is_none());

        let _ = result.value.set(5);
        handle.cell.settle(Outcome::Completed);
        assert_eq!(result.try_get(), Some(Ok(5)));
        assert!(handle.has_completed());
        assert!(!handle.has_stopped());
    }

    #[test]
    fn test_stopped_handle_reports_stopped_access() {
        let (handle, result) = detached("s");
        handle.cell.settle(Outcome::Stopped);
        assert_eq!(
            result.try_get(),
            Some(Err(TaskError::Stopped { task: "s".into() }))
        );
        assert!(handle.exception().is_none());
    }

    #[test]
    fn test_late_listeners_run_by_outcome() {
        let (handle, _) = detached("f");
        handle.cell.settle(Outcome::Failed(TaskError::fail("x")));

        let hits = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let h1 = Arc::clone(&hits);
        handle.on_completion(move || h1.lock().push("completion"));
        let h2 = Arc::clone(&hits);
        handle.on_exception(move |_| h2.lock().push("exception"));

        assert_eq!(*hits.lock(), vec!["exception"]);
        assert_eq!(handle.exception(), Some(TaskError::fail("x")));
    }

    #[tokio::test]
    async fn test_get_waits_without_coordinator() {
        let (handle, result) = detached("w");
        let reader = {
            let result = result.clone();
            tokio::spawn(async move { result.get().await })
        };
        tokio::task::yield_now().await;
        let _ = result.value.set(9);
        handle.cell.settle(Outcome::Completed);
        assert_eq!(reader.await.unwrap(), Ok(9));
    }
}
