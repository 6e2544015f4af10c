//! # Coordinator internals shared by handles and workers.
//!
//! [`Shared`] owns the [`State`] mutex. Every mutation goes through [`Shared::locked`]:
//! the closure runs under the lock and collects [`Effects`]; faults are recorded before
//! unlocking, then values are dropped, events are delivered and task launches are spawned
//! with the lock released.
//!
//! ## Lock order
//! coordinator state, then a task's status. Listeners, subscribers and task bodies never
//! run under either.

use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::core::barrier::Barrier;
use crate::core::config::Config;
use crate::core::runner::{self, TaskRun};
use crate::core::state::{Effects, State};
use crate::error::{InternalError, RuntimeError, SubmitError, TaskError};
use crate::pools::{PoolRegistry, PoolSpec};
use crate::subscribers::SubscriberSet;
use crate::tasks::listener::{CompletionListener, ExceptionListener};
use crate::tasks::task::{CoordinatorId, TaskId};
use crate::tasks::task_fn::Body;
use crate::tasks::{Handle, TaskCategory, TaskConfig};

pub(crate) struct Shared {
    pub(crate) id: CoordinatorId,
    pub(crate) cfg: Config,
    me: Weak<Shared>,
    state: Mutex<State>,
    barrier: Barrier,
    subscribers: SubscriberSet,
    owned: Mutex<Vec<Runtime>>,
}

impl Shared {
    pub(crate) fn new(
        cfg: Config,
        pools: Vec<(TaskCategory, PoolSpec)>,
        subscribers: SubscriberSet,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| {
            let id = CoordinatorId::next();
            let barrier = Barrier::new();
            let mut owned = Vec::new();
            let registry = PoolRegistry::build(pools, &mut owned);
            let state = State::new(id, me.clone(), &cfg, registry, barrier.clone());
            Shared {
                id,
                cfg,
                me: me.clone(),
                state: Mutex::new(state),
                barrier,
                subscribers,
                owned: Mutex::new(owned),
            }
        })
    }

    /// Runs `f` under the state lock, then applies what it asked for.
    pub(crate) fn locked<R>(&self, f: impl FnOnce(&mut State, &mut Effects) -> R) -> R {
        let mut fx = Effects::default();
        let out = {
            let mut state = self.state.lock();
            let out = f(&mut state, &mut fx);
            state.absorb_faults(&mut fx);
            out
        };
        self.apply(fx);
        out
    }

    fn apply(&self, fx: Effects) {
        let Effects {
            events,
            launches,
            garbage,
            ..
        } = fx;
        drop(garbage);

        for event in &events {
            if let Err(fault) = self.subscribers.emit(event) {
                self.record_fault(fault);
            }
        }

        if launches.is_empty() {
            return;
        }
        let Some(me) = self.me.upgrade() else {
            return;
        };
        for (id, pool) in launches {
            tracing::trace!(task = %id, "launching");
            pool.spawn(runner::run_task(TaskRun::new(Arc::clone(&me), id)));
        }
    }

    pub(crate) fn submit(&self, config: TaskConfig, body: Body) -> Result<Handle, SubmitError> {
        self.locked(|state, fx| state.create(config, body, fx))
    }

    pub(crate) fn begin(&self, id: TaskId) -> Option<(Body, CancellationToken)> {
        self.locked(|state, fx| state.begin(id, fx))
    }

    /// Records the body's result and runs listener batches until the task terminates.
    pub(crate) fn complete(&self, id: TaskId, result: Option<Result<(), TaskError>>) {
        let mut batch = self.locked(|state, fx| state.finish(id, result, fx));
        while let Some(listeners) = batch {
            let fault = listeners.run().err();
            batch = self.locked(|state, fx| state.commit(id, fault, fx));
        }
    }

    pub(crate) fn abandon(&self, id: TaskId) {
        self.locked(|state, fx| state.abandon(id, fx));
    }

    pub(crate) fn retry(&self, id: TaskId) {
        self.locked(|state, fx| state.retry(id, fx));
    }

    pub(crate) fn stop_task(&self, id: TaskId) {
        self.locked(|state, fx| state.stop_tasks(vec![id], fx));
    }

    pub(crate) fn stop_all(&self) {
        self.locked(|state, fx| state.stop_all(fx));
    }

    pub(crate) fn record_fault(&self, fault: InternalError) {
        self.locked(|_, fx| fx.fault(fault));
    }

    pub(crate) fn add_completion_listener(
        &self,
        id: TaskId,
        listener: CompletionListener,
    ) -> Option<CompletionListener> {
        self.locked(|state, _| state.add_completion_listener(id, listener))
    }

    pub(crate) fn add_exception_listener(
        &self,
        id: TaskId,
        listener: ExceptionListener,
    ) -> Option<ExceptionListener> {
        self.locked(|state, _| state.add_exception_listener(id, listener))
    }

    pub(crate) fn permit_submission(&self, open: bool) {
        self.locked(|state, fx| state.permit_submission(open, fx));
    }

    pub(crate) fn is_submission_permitted(&self) -> bool {
        self.state.lock().is_submission_permitted()
    }

    pub(crate) fn take_unthrown(&self) -> Option<RuntimeError> {
        self.state.lock().take_unthrown()
    }

    pub(crate) fn force_gate_open(&self) {
        self.locked(|state, fx| state.force_gate_open(fx));
    }

    pub(crate) fn mark_closed(&self) {
        self.locked(|state, fx| state.mark_closed(fx));
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    /// Tasks still holding the termination barrier.
    pub(crate) fn live_tasks(&self) -> usize {
        self.barrier.live()
    }

    pub(crate) async fn wait_for_termination(&self) {
        self.barrier.wait().await;
    }

    /// Shuts down the pools this coordinator owns without blocking.
    pub(crate) fn shutdown_owned_pools(&self) {
        let owned = mem::take(&mut *self.owned.lock());
        for runtime in owned {
            runtime.shutdown_background();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let live = self.state.get_mut().abandon_all();
        if live > 0 {
            tracing::warn!(live, "coordinator dropped before close; remaining tasks were stopped");
        }
        for runtime in self.owned.get_mut().drain(..) {
            runtime.shutdown_background();
        }
    }
}
