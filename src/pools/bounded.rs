//! # Bounded admission per category.
//!
//! [`Admission`] counts tasks admitted to a pool and queues the rest by task id, so
//! queued tasks are admitted in arrival order.
//!
//! ## Rules
//! - At most `limit` tasks are admitted at once, counted from admission until the task
//!   terminates, not by actual worker occupancy. A task on hold keeps its slot.
//! - A queued task that is stopped is withdrawn without consuming a slot.
//!
//! ## Hazard
//! Bounding a category is only safe when every dependency between its tasks is declared.
//! A task that waits on another one *inside its body* (for instance through
//! [`ResultHandle::get`](crate::ResultHandle::get) with verification off) occupies a
//! slot while waiting. If the task it waits for is still queued behind the limit, it is
//! never admitted and both wait forever. The coordinator does not detect this.

use std::collections::BTreeSet;

use crate::tasks::TaskId;

#[derive(Debug)]
pub(crate) struct Admission {
    limit: Option<usize>,
    admitted: usize,
    queue: BTreeSet<TaskId>,
}

impl Admission {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            admitted: 0,
            queue: BTreeSet::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[cfg(test)]
    pub(crate) fn admitted(&self) -> usize {
        self.admitted
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    fn has_capacity(&self) -> bool {
        self.limit.is_none_or(|max| self.admitted < max)
    }

    /// Admits `id` if a slot is free (returns `true`), otherwise queues it.
    pub(crate) fn submit(&mut self, id: TaskId) -> bool {
        if self.has_capacity() {
            self.admitted += 1;
            true
        } else {
            self.queue.insert(id);
            false
        }
    }

    /// Frees the slot of a terminated task; returns the queued task admitted in its place.
    pub(crate) fn on_task_completed(&mut self) -> Option<TaskId> {
        self.admitted = self.admitted.saturating_sub(1);
        if !self.has_capacity() {
            return None;
        }
        let next = self.queue.pop_first()?;
        self.admitted += 1;
        Some(next)
    }

    /// Removes a queued task; returns `false` if it was not queued.
    pub(crate) fn withdraw(&mut self, id: TaskId) -> bool {
        self.queue.remove(&id)
    }
}
