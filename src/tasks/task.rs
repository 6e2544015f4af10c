//! # Per-task shared cell.
//!
//! A [`TaskCell`] is the part of a task that outlives its coordinator entry: identity,
//! stage, and the write-once outcome. Handles read it without touching the
//! coordinator lock; it is only ever written while that lock is held.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{InternalError, TaskError};
use crate::tasks::{Stage, TaskCategory};

/// Global counter for coordinator identities.
static COORDINATOR_SEQ: AtomicU64 = AtomicU64::new(1);

/// Sequence id of a task, unique within its coordinator.
///
/// Ids grow with submission order; the bounded pools admit queued tasks by ascending id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a coordinator; used to reject cross-coordinator dependencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CoordinatorId(u64);

impl CoordinatorId {
    pub(crate) fn next() -> Self {
        CoordinatorId(COORDINATOR_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}

/// Write-once outcome of a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Pending,
    Completed,
    Failed(TaskError),
    Stopped,
}

impl Outcome {
    pub(crate) fn is_decided(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

#[derive(Debug)]
struct Status {
    stage: Stage,
    outcome: Outcome,
}

/// Identity, stage and outcome of one task.
pub(crate) struct TaskCell {
    pub(crate) id: TaskId,
    pub(crate) name: Arc<str>,
    pub(crate) category: TaskCategory,
    pub(crate) owner: CoordinatorId,
    status: Mutex<Status>,
    decided: watch::Sender<bool>,
}

impl TaskCell {
    pub(crate) fn new(
        id: TaskId,
        name: Arc<str>,
        category: TaskCategory,
        owner: CoordinatorId,
    ) -> Self {
        Self {
            id,
            name,
            category,
            owner,
            status: Mutex::new(Status {
                stage: Stage::Initial,
                outcome: Outcome::Pending,
            }),
            decided: watch::Sender::new(false),
        }
    }

    pub(crate) fn stage(&self) -> Stage {
        self.status.lock().stage
    }

    pub(crate) fn outcome(&self) -> Outcome {
        self.status.lock().outcome.clone()
    }

    pub(crate) fn is_decided(&self) -> bool {
        *self.decided.borrow()
    }

    /// Moves to `to`; returns the previous stage.
    pub(crate) fn advance(&self, to: Stage) -> Result<Stage, InternalError> {
        let mut status = self.status.lock();
        let from = status.stage;
        if !from.can_transition(to) {
            return Err(InternalError::IllegalTransition {
                task: self.name.to_string(),
                from,
                to,
            });
        }
        status.stage = to;
        Ok(from)
    }

    /// Records the outcome unless one is already recorded; opens the decided barrier.
    ///
    /// Returns `false` when an outcome was already present.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        let recorded = {
            let mut status = self.status.lock();
            if status.outcome.is_decided() {
                false
            } else {
                status.outcome = outcome;
                true
            }
        };
        if recorded {
            self.decided.send_replace(true);
        }
        recorded
    }

    /// Suspends until the outcome is decided.
    pub(crate) async fn wait_decided(&self) {
        let mut rx = self.decided.subscribe();
        // The sender lives as long as `self`, so this only ends once decided.
        let _ = rx.wait_for(|decided| *decided).await;
    }
}

impl fmt::Debug for TaskCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.lock();
        f.debug_struct("TaskCell")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("stage", &status.stage)
            .field("outcome", &status.outcome)
            .finish()
    }
}
