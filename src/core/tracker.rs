//! # Dependency tracker.
//!
//! Keeps, per waiting task, the dependencies that have not completed yet, and the reverse
//! index from a dependency to its dependents.
//!
//! ```text
//! add_dependencies(C, [A, B])      remaining: C → {A, B}     dependents: A → {C}, B → {C}
//! on_completed(A)  → []            remaining: C → {B}
//! on_completed(B)  → [C]           C is eligible; the caller submits it under the same lock
//! remove(X)        → dependents of X that were still waiting (to be stopped)
//! ```
//!
//! Remaining sets are small vectors: tasks rarely have more than a handful of
//! dependencies, and a linear scan beats hashing at that size.

use std::collections::HashMap;

use crate::tasks::TaskId;

#[derive(Debug, Default)]
pub(crate) struct DependencyTracker {
    remaining: HashMap<TaskId, Vec<TaskId>>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl DependencyTracker {
    /// Registers `task` as waiting on `pending`; returns `true` if it is eligible right away.
    ///
    /// Dependencies already completed must not be passed in.
    pub(crate) fn add_dependencies(&mut self, task: TaskId, pending: &[TaskId]) -> bool {
        let mut deps: Vec<TaskId> = Vec::with_capacity(pending.len());
        for dep in pending {
            if *dep != task && !deps.contains(dep) {
                deps.push(*dep);
            }
        }
        if deps.is_empty() {
            return true;
        }
        for dep in &deps {
            self.dependents.entry(*dep).or_default().push(task);
        }
        self.remaining.insert(task, deps);
        false
    }

    /// Marks `dep` completed; returns the dependents that just became eligible.
    pub(crate) fn on_completed(&mut self, dep: TaskId) -> Vec<TaskId> {
        let mut eligible = Vec::new();
        for task in self.dependents.remove(&dep).unwrap_or_default() {
            if let Some(rest) = self.remaining.get_mut(&task) {
                rest.retain(|d| *d != dep);
                if rest.is_empty() {
                    self.remaining.remove(&task);
                    eligible.push(task);
                }
            }
        }
        eligible
    }

    /// Forgets `task`; returns its dependents that were still waiting.
    pub(crate) fn remove(&mut self, task: TaskId) -> Vec<TaskId> {
        if let Some(deps) = self.remaining.remove(&task) {
            for dep in deps {
                if let Some(list) = self.dependents.get_mut(&dep) {
                    list.retain(|t| *t != task);
                    if list.is_empty() {
                        self.dependents.remove(&dep);
                    }
                }
            }
        }
        self.dependents
            .remove(&task)
            .unwrap_or_default()
            .into_iter()
            .filter(|t| self.remaining.contains_key(t))
            .collect()
    }

    /// Dependents still waiting on `task`, without changing anything.
    pub(crate) fn dependents_of(&self, task: TaskId) -> Vec<TaskId> {
        self.dependents.get(&task).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn is_waiting(&self, task: TaskId) -> bool {
        self.remaining.contains_key(&task)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.remaining.is_empty() && self.dependents.is_empty()
    }
}
