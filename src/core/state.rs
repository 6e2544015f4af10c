//! # Coordinator state.
//!
//! Everything a coordinator mutates lives in [`State`], behind one mutex: task entries,
//! the dependency tracker, the exceptional state, pool admission, the submission gate and
//! resource accounting. Methods never call user code that could re-enter the coordinator;
//! instead they push [`Effects`] (events, launches, faults, values to drop) that the
//! caller applies once the lock is released.
//!
//! ## Task flow
//! ```text
//! create ──► tracker ──(eligible)──► make_ready ──┬─ gate open ──► submit ──► Admission
//!                                                 └─ gate closed ─► held_back
//!
//! begin (runner) ──► acquire resources ──┬─ ok ───────► EXECUTING, body handed out
//!                                        └─ rejected ─► ON_HOLD ... retry ──► make_ready
//!
//! finish ──► FINISHED, outcome recorded ──► listeners (outside the lock) ──► commit
//! commit ──► terminate ──┬─ completed ─► tracker.on_completed ──► make_ready(dependents)
//!                        └─ otherwise ─► stop dependents
//! ```
//!
//! ## Stop
//! - not yet executing: terminated on the spot;
//! - executing: outcome set to stopped, token cancelled; terminates when the runner returns;
//! - finished: a [`Deferred::Stop`] is queued, applied when the task terminates.
//!
//! Each case cascades to the task's waiting dependents.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use tokio::runtime::Handle as RuntimeHandle;
use tokio_util::sync::CancellationToken;

use crate::core::barrier::Barrier;
use crate::core::config::{Config, WaitMode};
use crate::core::exceptional::{ExceptionalState, Recorded};
use crate::core::shared::Shared;
use crate::core::tracker::DependencyTracker;
use crate::error::{InternalError, RuntimeError, SubmitError, TaskError};
use crate::events::{Event, EventKind};
use crate::pools::PoolRegistry;
use crate::resources::{ResourceClaims, ResourceKey, RetryCallback};
use crate::tasks::listener::{CompletionListener, ExceptionListener, ListenerBatch};
use crate::tasks::task::{CoordinatorId, Outcome, TaskCell, TaskId};
use crate::tasks::task_fn::Body;
use crate::tasks::{Deferred, DeferredQueue, Handle, Stage, TaskCategory, TaskConfig};

/// Work collected under the lock, applied after it is released.
#[derive(Default)]
pub(crate) struct Effects {
    pub(crate) events: Vec<Event>,
    pub(crate) launches: Vec<(TaskId, RuntimeHandle)>,
    pub(crate) faults: Vec<InternalError>,
    pub(crate) garbage: Vec<Box<dyn Send>>,
}

impl Effects {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    fn task_event(&mut self, kind: EventKind, cell: &TaskCell) {
        self.events.push(Event::for_task(kind, cell));
    }

    pub(crate) fn fault(&mut self, fault: InternalError) {
        self.faults.push(fault);
    }

    /// Drops `value` after the lock is released; it may own user code.
    fn discard<T: Send + 'static>(&mut self, value: T) {
        self.garbage.push(Box::new(value));
    }
}

/// Moves `cell` to `to`, turning an illegal transition into a fault.
fn advance(cell: &TaskCell, to: Stage, fx: &mut Effects) -> bool {
    match cell.advance(to) {
        Ok(_) => true,
        Err(fault) => {
            fx.fault(fault);
            false
        }
    }
}

/// Retry callback that resubmits `id` from a fresh task on `pool`, never from the
/// caller's stack.
fn retry_callback(coordinator: &Weak<Shared>, pool: RuntimeHandle, id: TaskId) -> RetryCallback {
    let coordinator = coordinator.clone();
    RetryCallback::new(move || {
        let coordinator = coordinator.clone();
        pool.spawn(async move {
            if let Some(shared) = coordinator.upgrade() {
                shared.retry(id);
            }
        });
    })
}

/// Coordinator-side bookkeeping of one live task.
struct TaskEntry {
    cell: Arc<TaskCell>,
    body: Option<Body>,
    cancel: CancellationToken,
    claims: ResourceClaims,
    acquired: bool,
    retry: Option<RetryCallback>,
    holds_slot: bool,
    in_barrier: bool,
    on_completion: Vec<CompletionListener>,
    on_exception: Vec<ExceptionListener>,
    deferred: DeferredQueue,
}

impl TaskEntry {
    /// Gives every share back: released if acquired, withdrawn if still pending.
    fn return_resources(&self) {
        if self.acquired {
            self.claims.release();
        } else {
            if let Some(retry) = &self.retry {
                self.claims.remove(retry);
            }
            self.claims.remove_pending();
        }
    }
}

pub(crate) struct State {
    id: CoordinatorId,
    coordinator: Weak<Shared>,
    wait_mode: WaitMode,
    next_id: u64,
    tasks: HashMap<TaskId, TaskEntry>,
    names: HashSet<String>,
    suffixes: HashMap<String, u64>,
    tracker: DependencyTracker,
    exceptional: ExceptionalState,
    pools: PoolRegistry,
    gate_open: bool,
    held_back: Vec<TaskId>,
    held_resources: HashMap<ResourceKey, usize>,
    barrier: Barrier,
    closed: bool,
}

impl State {
    pub(crate) fn new(
        id: CoordinatorId,
        coordinator: Weak<Shared>,
        cfg: &Config,
        pools: PoolRegistry,
        barrier: Barrier,
    ) -> Self {
        Self {
            id,
            coordinator,
            wait_mode: cfg.wait_mode,
            next_id: 0,
            tasks: HashMap::new(),
            names: HashSet::new(),
            suffixes: HashMap::new(),
            tracker: DependencyTracker::default(),
            exceptional: ExceptionalState::default(),
            pools,
            gate_open: true,
            held_back: Vec::new(),
            held_resources: HashMap::new(),
            barrier,
            closed: false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn is_submission_permitted(&self) -> bool {
        self.gate_open
    }

    // === Submission ===

    /// Validates `config`, creates the handle and schedules the task.
    pub(crate) fn create(
        &mut self,
        config: TaskConfig,
        body: Body,
        fx: &mut Effects,
    ) -> Result<Handle, SubmitError> {
        if self.closed {
            return Err(SubmitError::Closed);
        }
        if !self.pools.contains(&config.category) {
            return Err(SubmitError::UnknownCategory {
                category: config.category,
            });
        }
        if let Some(foreign) = config
            .dependencies
            .iter()
            .find(|dep| dep.cell.owner != self.id)
        {
            return Err(SubmitError::ForeignDependency {
                task: foreign.name().to_string(),
            });
        }

        let TaskConfig {
            name,
            category,
            dependencies,
            claims,
            on_completion,
            stop_when,
        } = config;

        self.next_id += 1;
        let id = TaskId(self.next_id);
        let name = self.unique_name(name, id);
        let cell = Arc::new(TaskCell::new(id, name, category, self.id));
        let handle = Handle::new(Arc::clone(&cell), self.coordinator.clone());
        fx.task_event(EventKind::TaskCreated, &cell);

        let mut doomed = stop_when.is_some_and(|flag| flag.load(Ordering::SeqCst));
        let mut pending = Vec::with_capacity(dependencies.len());
        for dep in &dependencies {
            match dep.cell.outcome() {
                Outcome::Stopped | Outcome::Failed(_) => doomed = true,
                _ if self.tasks.contains_key(&dep.cell.id) => pending.push(dep.cell.id),
                // terminated after completing
                _ => {}
            }
        }

        if doomed {
            advance(&cell, Stage::Terminated, fx);
            cell.settle(Outcome::Stopped);
            fx.task_event(EventKind::TaskStopped, &cell);
            fx.task_event(EventKind::TaskTerminated, &cell);
            fx.discard((body, on_completion, claims));
            return Ok(handle);
        }

        let claims = ResourceClaims::new(claims);
        claims.add_pending();
        self.barrier.enter();
        self.tasks.insert(
            id,
            TaskEntry {
                cell,
                body: Some(body),
                cancel: CancellationToken::new(),
                claims,
                acquired: false,
                retry: None,
                holds_slot: false,
                in_barrier: true,
                on_completion,
                on_exception: Vec::new(),
                deferred: DeferredQueue::default(),
            },
        );

        if self.tracker.add_dependencies(id, &pending) {
            self.make_ready(id, fx);
        }
        Ok(handle)
    }

    fn unique_name(&mut self, requested: Option<String>, id: TaskId) -> Arc<str> {
        let base = requested.unwrap_or_else(|| format!("task-{}", id.0));
        if self.names.insert(base.clone()) {
            return Arc::from(base);
        }
        let suffix = self.suffixes.entry(base.clone()).or_insert(1);
        loop {
            *suffix += 1;
            let candidate = format!("{base}#{suffix}");
            if self.names.insert(candidate.clone()) {
                return Arc::from(candidate);
            }
        }
    }

    /// Dependencies satisfied: `READY`, then submitted unless the gate is closed.
    fn make_ready(&mut self, id: TaskId, fx: &mut Effects) {
        let Some(entry) = self.tasks.get(&id) else {
            return;
        };
        let cell = Arc::clone(&entry.cell);
        if !advance(&cell, Stage::Ready, fx) {
            return;
        }
        fx.task_event(EventKind::TaskReady, &cell);
        if self.gate_open {
            self.submit(id, fx);
        } else {
            self.held_back.push(id);
        }
    }

    /// Hands a `READY` task to its category's admission queue.
    fn submit(&mut self, id: TaskId, fx: &mut Effects) {
        let Some(entry) = self.tasks.get_mut(&id) else {
            return;
        };
        if !advance(&entry.cell, Stage::Submitted, fx) {
            return;
        }
        fx.task_event(EventKind::TaskSubmitted, &entry.cell);

        let Some(pool) = self.pools.get_mut(&entry.cell.category) else {
            return;
        };
        // a task coming back from ON_HOLD still owns its slot
        if entry.holds_slot || pool.admission.submit(id) {
            entry.holds_slot = true;
            fx.launches.push((id, pool.handle.clone()));
        }
    }

    /// Opens or closes the submission gate; reopening submits everything held back.
    pub(crate) fn permit_submission(&mut self, open: bool, fx: &mut Effects) {
        if self.gate_open == open {
            return;
        }
        self.gate_open = open;
        if !open {
            fx.emit(Event::new(EventKind::SubmissionPaused));
            return;
        }
        fx.emit(Event::new(EventKind::SubmissionResumed));
        for id in mem::take(&mut self.held_back) {
            let ready = self
                .tasks
                .get(&id)
                .is_some_and(|entry| entry.cell.stage() == Stage::Ready);
            if ready {
                self.submit(id, fx);
            }
        }
    }

    // === Execution ===

    /// Called by the runner on the pool: acquires resources and hands out the body.
    ///
    /// Returns `None` if the task was terminated meanwhile or had to go on hold.
    pub(crate) fn begin(
        &mut self,
        id: TaskId,
        fx: &mut Effects,
    ) -> Option<(Body, CancellationToken)> {
        let entry = self.tasks.get_mut(&id)?;

        if !entry.claims.is_empty() && !entry.acquired {
            let retry = match &entry.retry {
                Some(retry) => retry.clone(),
                None => {
                    let pool = self.pools.get(&entry.cell.category)?.handle.clone();
                    let retry = retry_callback(&self.coordinator, pool, id);
                    entry.retry = Some(retry.clone());
                    retry
                }
            };

            match entry.claims.try_acquire(&retry) {
                Ok(()) => {
                    entry.acquired = true;
                    for key in entry.claims.keys() {
                        *self.held_resources.entry(key).or_default() += 1;
                    }
                }
                Err(rejection) => {
                    if advance(&entry.cell, Stage::OnHold, fx) {
                        fx.emit(
                            Event::for_task(EventKind::TaskOnHold, &entry.cell)
                                .with_reason(rejection.resource.as_str()),
                        );
                    }
                    // nobody here holds it, so no release will ever call back
                    if self.held_resources.get(&rejection.key).copied().unwrap_or(0) == 0 {
                        fx.fault(InternalError::ResourceProtocol {
                            task: entry.cell.name.to_string(),
                            resource: rejection.resource,
                        });
                    }
                    return None;
                }
            }
        }

        if !advance(&entry.cell, Stage::Executing, fx) {
            return None;
        }
        let Some(body) = entry.body.take() else {
            fx.fault(InternalError::DoubleCompletion {
                task: entry.cell.name.to_string(),
            });
            return None;
        };
        fx.task_event(EventKind::TaskStarting, &entry.cell);
        Some((body, entry.cancel.clone()))
    }

    /// A resource called back: an `ON_HOLD` task becomes `READY` again.
    pub(crate) fn retry(&mut self, id: TaskId, fx: &mut Effects) {
        let on_hold = self
            .tasks
            .get(&id)
            .is_some_and(|entry| entry.cell.stage() == Stage::OnHold);
        if on_hold {
            self.make_ready(id, fx);
        }
    }

    /// Records the body's outcome.
    ///
    /// `None` means the body produced nothing: it was dropped after a stop, or its worker
    /// went away. Returns the listeners to run outside the lock, if any.
    pub(crate) fn finish(
        &mut self,
        id: TaskId,
        result: Option<Result<(), TaskError>>,
        fx: &mut Effects,
    ) -> Option<ListenerBatch> {
        let cell = Arc::clone(&self.tasks.get(&id)?.cell);
        if cell.stage() != Stage::Executing {
            fx.fault(InternalError::DoubleCompletion {
                task: cell.name.to_string(),
            });
            return None;
        }

        let result = match result {
            Some(result) if !matches!(cell.outcome(), Outcome::Stopped) => result,
            _ => {
                // stopped while running: whatever the body did is discarded
                if cell.settle(Outcome::Stopped) {
                    fx.task_event(EventKind::TaskStopped, &cell);
                }
                let doomed = self.terminate(id, fx);
                self.stop_tasks(doomed, fx);
                return None;
            }
        };

        if !advance(&cell, Stage::Finished, fx) {
            return None;
        }
        match result {
            Ok(()) => {
                cell.settle(Outcome::Completed);
                fx.task_event(EventKind::TaskCompleted, &cell);
            }
            Err(error) => {
                cell.settle(Outcome::Failed(error.clone()));
                fx.emit(
                    Event::for_task(EventKind::TaskFailed, &cell).with_reason(error.to_string()),
                );
                self.record_failure(
                    RuntimeError::Task {
                        task: cell.name.to_string(),
                        error,
                    },
                    fx,
                );
            }
        }
        self.commit(id, None, fx)
    }

    /// Takes the next batch of listeners or, when none are left, terminates the task.
    ///
    /// `fault` is the first panic of the batch that just ran.
    pub(crate) fn commit(
        &mut self,
        id: TaskId,
        fault: Option<InternalError>,
        fx: &mut Effects,
    ) -> Option<ListenerBatch> {
        if let Some(fault) = fault {
            self.record_failure(fault.into(), fx);
        }

        let entry = self.tasks.get_mut(&id)?;
        let task = Arc::clone(&entry.cell.name);
        match entry.cell.outcome() {
            Outcome::Completed if !entry.on_completion.is_empty() => {
                return Some(ListenerBatch::Completion {
                    task,
                    listeners: mem::take(&mut entry.on_completion),
                });
            }
            Outcome::Failed(error) if !entry.on_exception.is_empty() => {
                return Some(ListenerBatch::Exception {
                    task,
                    listeners: mem::take(&mut entry.on_exception),
                    error,
                });
            }
            _ => {}
        }

        let doomed = self.terminate(id, fx);
        self.stop_tasks(doomed, fx);
        None
    }

    /// Removes the task and gives back everything it holds.
    ///
    /// Returns the dependents that must be stopped; dependents of a task that completed
    /// (and was not stopped while finishing) are made ready instead.
    fn terminate(&mut self, id: TaskId, fx: &mut Effects) -> Vec<TaskId> {
        let Some(entry) = self.tasks.remove(&id) else {
            return Vec::new();
        };
        let cell = Arc::clone(&entry.cell);
        if cell.settle(Outcome::Stopped) {
            fx.task_event(EventKind::TaskStopped, &cell);
        }
        advance(&cell, Stage::Terminated, fx);

        entry.return_resources();
        if entry.acquired {
            for key in entry.claims.keys() {
                if let Some(held) = self.held_resources.get_mut(&key) {
                    *held = held.saturating_sub(1);
                    if *held == 0 {
                        self.held_resources.remove(&key);
                    }
                }
            }
        }

        if entry.holds_slot {
            self.release_slot(&cell.category, fx);
        } else if let Some(pool) = self.pools.get_mut(&cell.category) {
            pool.admission.withdraw(id);
        }
        self.held_back.retain(|t| *t != id);
        if entry.in_barrier {
            self.barrier.leave();
        }

        let released = matches!(cell.outcome(), Outcome::Completed)
            && !entry.deferred.contains(Deferred::Stop);
        fx.task_event(EventKind::TaskTerminated, &cell);
        fx.discard(entry);

        if released {
            for next in self.tracker.on_completed(id) {
                self.make_ready(next, fx);
            }
            Vec::new()
        } else {
            self.tracker.remove(id)
        }
    }

    /// Frees one slot of `category` and launches the next queued task.
    fn release_slot(&mut self, category: &TaskCategory, fx: &mut Effects) {
        let Some(pool) = self.pools.get_mut(category) else {
            return;
        };
        while let Some(next) = pool.admission.on_task_completed() {
            if let Some(entry) = self.tasks.get_mut(&next) {
                entry.holds_slot = true;
                fx.launches.push((next, pool.handle.clone()));
                return;
            }
        }
    }

    // === Stop ===

    /// Stops every task in `work` and, transitively, their waiting dependents.
    pub(crate) fn stop_tasks(&mut self, mut work: Vec<TaskId>, fx: &mut Effects) {
        while let Some(id) = work.pop() {
            let Some(entry) = self.tasks.get_mut(&id) else {
                continue;
            };
            match entry.cell.stage() {
                Stage::Finished => entry.deferred.push(Deferred::Stop),
                Stage::Executing => {
                    if !entry.cell.settle(Outcome::Stopped) {
                        continue;
                    }
                    entry.cancel.cancel();
                    fx.task_event(EventKind::TaskStopped, &entry.cell);
                    if self.wait_mode == WaitMode::UntilTerminationRequested && entry.in_barrier {
                        entry.in_barrier = false;
                        self.barrier.leave();
                    }
                    work.extend(self.tracker.dependents_of(id));
                }
                _ => {
                    if entry.cell.settle(Outcome::Stopped) {
                        fx.task_event(EventKind::TaskStopped, &entry.cell);
                    }
                    entry.cancel.cancel();
                    work.extend(self.terminate(id, fx));
                }
            }
        }
    }

    /// Stops every live task.
    pub(crate) fn stop_all(&mut self, fx: &mut Effects) {
        fx.emit(Event::new(EventKind::StopRequested));
        let mut ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        // popped lowest id first
        ids.sort_unstable_by(|a, b| b.cmp(a));
        self.stop_tasks(ids, fx);
    }

    /// The runner went away without reporting (its pool shut down).
    pub(crate) fn abandon(&mut self, id: TaskId, fx: &mut Effects) {
        let executing = self
            .tasks
            .get(&id)
            .is_some_and(|entry| entry.cell.stage() == Stage::Executing);
        if executing {
            self.finish(id, None, fx);
        } else {
            self.stop_tasks(vec![id], fx);
        }
    }

    /// Last-resort cleanup when the coordinator is dropped without `close`.
    ///
    /// Returns how many tasks were still live.
    pub(crate) fn abandon_all(&mut self) -> usize {
        let live = self.tasks.len();
        for (_, entry) in self.tasks.drain() {
            entry.cell.settle(Outcome::Stopped);
            entry.cancel.cancel();
            entry.return_resources();
            if entry.in_barrier {
                self.barrier.leave();
            }
        }
        live
    }

    // === Listeners ===

    /// Queues `listener` on a live task; hands it back if the task already terminated.
    pub(crate) fn add_completion_listener(
        &mut self,
        id: TaskId,
        listener: CompletionListener,
    ) -> Option<CompletionListener> {
        match self.tasks.get_mut(&id) {
            Some(entry) => {
                entry.on_completion.push(listener);
                None
            }
            None => Some(listener),
        }
    }

    pub(crate) fn add_exception_listener(
        &mut self,
        id: TaskId,
        listener: ExceptionListener,
    ) -> Option<ExceptionListener> {
        match self.tasks.get_mut(&id) {
            Some(entry) => {
                entry.on_exception.push(listener);
                None
            }
            None => Some(listener),
        }
    }

    // === Failures ===

    /// Records a failure; the first one recorded stops everything.
    pub(crate) fn record_failure(&mut self, err: RuntimeError, fx: &mut Effects) {
        let internal = err.is_internal();
        let reason = err.to_string();
        match self.exceptional.record(err) {
            Recorded::First => {
                if internal {
                    fx.emit(Event::new(EventKind::InternalError).with_reason(reason));
                }
                self.stop_all(fx);
            }
            Recorded::Superseded => {
                fx.emit(Event::new(EventKind::InternalError).with_reason(reason));
            }
            Recorded::Ignored if internal => {
                tracing::warn!(%reason, "internal error after an earlier one was recorded");
            }
            Recorded::Ignored => {}
        }
    }

    /// Records every fault pushed so far, including those raised while recording.
    pub(crate) fn absorb_faults(&mut self, fx: &mut Effects) {
        while !fx.faults.is_empty() {
            for fault in mem::take(&mut fx.faults) {
                self.record_failure(fault.into(), fx);
            }
        }
    }

    pub(crate) fn take_unthrown(&mut self) -> Option<RuntimeError> {
        self.exceptional.take_unthrown()
    }

    // === Close ===

    /// Forces a closed gate open by stopping everything first.
    pub(crate) fn force_gate_open(&mut self, fx: &mut Effects) {
        if !self.gate_open {
            self.stop_all(fx);
            self.permit_submission(true, fx);
        }
    }

    pub(crate) fn mark_closed(&mut self, fx: &mut Effects) {
        if !self.closed {
            self.closed = true;
            fx.emit(Event::new(EventKind::Closed));
        }
    }
}
