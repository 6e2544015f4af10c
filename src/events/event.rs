//! # Events emitted by the coordinator.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task lifecycle**: one event per stage transition (created, ready, submitted, ...)
//! - **Outcome**: completed, failed, stopped
//! - **Coordinator**: stop requests, the submission gate, internal errors, close
//!
//! The [`Event`] struct carries metadata such as the timestamp, task name and id,
//! category and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events raised inside one critical section of a coordinator are delivered in `seq`
//! order, right after the coordinator lock is released.
//!
//! ## Example
//! ```rust
//! use taskcoord::{Event, EventKind, TaskCategory};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("load")
//!     .with_category(TaskCategory::Io)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("load"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::tasks::task::TaskCell;
use crate::tasks::{TaskCategory, TaskId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of coordinator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// Task handle created.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskCreated,

    /// All dependencies completed; task is eligible for submission.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskReady,

    /// Task handed to its category's bounded pool (admitted or queued).
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskSubmitted,

    /// A required resource rejected the task; it waits for a retry.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    /// - `reason`: name of the rejecting resource
    TaskOnHold,

    /// Body is about to run.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskStarting,

    // === Outcome events ===
    /// Body returned successfully.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskCompleted,

    /// Body returned an error or panicked.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    /// - `reason`: failure message
    TaskFailed,

    /// Task was stopped before it produced a result.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskStopped,

    /// Task released its slot, resources and barrier permit.
    ///
    /// Sets:
    /// - `task`, `task_id`, `category`
    TaskTerminated,

    // === Coordinator events ===
    /// Every live task was asked to stop (first failure, short-circuit or explicit stop).
    StopRequested,

    /// Submission gate closed; eligible tasks are held back.
    SubmissionPaused,

    /// Submission gate reopened; held-back tasks were submitted.
    SubmissionResumed,

    /// The coordinator recorded an internal error.
    ///
    /// Sets:
    /// - `reason`: error message
    InternalError,

    /// `close` finished waiting; no further submissions are accepted.
    Closed,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task_created",
            EventKind::TaskReady => "task_ready",
            EventKind::TaskSubmitted => "task_submitted",
            EventKind::TaskOnHold => "task_on_hold",
            EventKind::TaskStarting => "task_starting",
            EventKind::TaskCompleted => "task_completed",
            EventKind::TaskFailed => "task_failed",
            EventKind::TaskStopped => "task_stopped",
            EventKind::TaskTerminated => "task_terminated",
            EventKind::StopRequested => "stop_requested",
            EventKind::SubmissionPaused => "submission_paused",
            EventKind::SubmissionResumed => "submission_resumed",
            EventKind::InternalError => "internal_error",
            EventKind::Closed => "closed",
        }
    }
}

/// Coordinator event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Id of the task, if applicable.
    pub task_id: Option<TaskId>,
    /// Category of the task, if applicable.
    pub category: Option<TaskCategory>,
    /// Human-readable reason (errors, rejecting resource, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_id: None,
            category: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a task category.
    #[inline]
    pub fn with_category(mut self, category: TaskCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Event about one task, with name, id and category filled in.
    pub(crate) fn for_task(kind: EventKind, cell: &TaskCell) -> Self {
        Event::new(kind)
            .with_task(Arc::clone(&cell.name))
            .with_task_id(cell.id)
            .with_category(cell.category.clone())
    }

    #[inline]
    pub fn is_internal_error(&self) -> bool {
        matches!(self.kind, EventKind::InternalError)
    }

    /// True for events that describe a task outcome.
    #[inline]
    pub fn is_outcome(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskCompleted | EventKind::TaskFailed | EventKind::TaskStopped
        )
    }
}
