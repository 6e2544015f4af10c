//! # Coordinator: submits tasks, tracks their dependencies and owns their failures.
//!
//! The [`Coordinator`] is the public face of one task graph. Tasks are submitted with a
//! [`TaskConfig`] and a body; the coordinator runs each body on its category's pool once
//! its dependencies completed and its resources are available, and turns the first
//! failure into a stop of everything else.
//!
//! ## Architecture
//! ```text
//! execute(config, body) ──► Shared::submit ──► State (one mutex)
//!                                                ├─ DependencyTracker
//!                                                ├─ Admission (per category)
//!                                                ├─ ExceptionalState
//!                                                └─ Barrier (live tasks)
//!                                 launches ──► pool.spawn(run_task) ──► body
//!                                 events   ──► SubscriberSet
//!
//! close() ──► [gate closed? stop all + reopen] ──► Barrier::wait ──► Closed
//!         ──► check_exception() ──► first unthrown failure, if any
//! ```
//!
//! ## Failures
//! - A failing body records a task failure; the first recorded failure stops every task.
//! - A contract violation (panicking listener or subscriber, undeclared dependency,
//!   resource misuse) records an internal error, which replaces a task failure.
//! - [`Coordinator::check_exception`] and [`Coordinator::close`] surface the recorded
//!   failure once.
//!
//! ## Example
//! ```rust
//! use taskcoord::{Config, Coordinator, TaskConfig, TaskError};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new(Config::default())?;
//!
//! let a = coordinator.execute(TaskConfig::new().name("a"), async { Ok::<_, TaskError>(2) })?;
//! let b = coordinator.execute(TaskConfig::new().name("b"), async { Ok::<_, TaskError>(3) })?;
//! let sum = {
//!     let (a, b) = (a.clone(), b.clone());
//!     coordinator.execute(
//!         TaskConfig::new().name("sum").dependency(&a).dependency(&b),
//!         async move { Ok::<_, TaskError>(a.get().await? + b.get().await?) },
//!     )?
//! };
//!
//! coordinator.close().await?;
//! assert_eq!(sum.get().await?, 5);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::{Arc, OnceLock, Weak};

use tokio_util::sync::CancellationToken;

use super::{Config, CoordinatorBuilder, Shared};
use crate::error::{RuntimeError, SubmitError, TaskError};
use crate::tasks::task_fn::Body;
use crate::tasks::{Configure, Handle, ResultHandle, TaskConfig};

/// Structured-concurrency coordinator for one task graph.
///
/// Cheap to clone; clones share the same graph. Must be closed with
/// [`Coordinator::close`] (or used through [`Coordinator::scope`]) to observe failures.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    /// Returns a builder for pools and subscribers.
    pub fn builder(cfg: Config) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg)
    }

    /// Creates a coordinator whose `Default` and `Io` pools run on the current runtime.
    ///
    /// # Errors
    /// [`SubmitError::NoRuntime`] when called outside of a tokio runtime.
    pub fn new(cfg: Config) -> Result<Self, SubmitError> {
        Self::builder(cfg).build()
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    /// Starts a task configuration bound to this coordinator.
    pub fn configure(&self) -> Configure<'_> {
        Configure::new(self)
    }

    /// Submits a forced body.
    ///
    /// The body is dropped at its next suspension point when the task is stopped.
    ///
    /// # Errors
    /// - [`SubmitError::Closed`] after [`Coordinator::close`]
    /// - [`SubmitError::UnknownCategory`] if no pool serves the category
    /// - [`SubmitError::ForeignDependency`] if a dependency belongs to another coordinator
    pub fn execute<T, F>(&self, config: TaskConfig, body: F) -> Result<ResultHandle<T>, SubmitError>
    where
        T: Send + Sync + 'static,
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let slot = Arc::new(OnceLock::new());
        let handle = self.submit(config, Body::forced(Arc::clone(&slot), body))?;
        Ok(ResultHandle::new(handle, slot))
    }

    /// Submits a cooperative body: it receives a [`CancellationToken`] and is expected to
    /// return once the token is cancelled. It is never dropped early.
    ///
    /// # Errors
    /// Same as [`Coordinator::execute`].
    pub fn execute_cooperative<T, F, Fut>(
        &self,
        config: TaskConfig,
        body: F,
    ) -> Result<ResultHandle<T>, SubmitError>
    where
        T: Send + Sync + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let slot = Arc::new(OnceLock::new());
        let handle = self.submit(config, Body::cooperative(Arc::clone(&slot), body))?;
        Ok(ResultHandle::new(handle, slot))
    }

    pub(crate) fn submit(&self, config: TaskConfig, body: Body) -> Result<Handle, SubmitError> {
        self.shared.submit(config, body)
    }

    /// Opens or closes the submission gate.
    ///
    /// While closed, tasks whose dependencies are satisfied wait in `READY` instead of
    /// being handed to their pool. Reopening submits them.
    pub fn permit_task_submission(&self, permit: bool) {
        self.shared.permit_submission(permit);
    }

    /// True unless the submission gate is closed.
    pub fn is_submission_permitted(&self) -> bool {
        self.shared.is_submission_permitted()
    }

    /// Stops every task of the coordinator. New tasks can still be submitted.
    pub fn stop(&self) {
        self.shared.stop_all();
    }

    /// Returns the recorded failure if it was not returned before.
    ///
    /// # Errors
    /// The first task failure, or an internal error that superseded it.
    pub fn check_exception(&self) -> Result<(), RuntimeError> {
        match self.shared.take_unthrown() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Waits for every task to terminate, then rejects further submissions.
    ///
    /// If the submission gate is closed, every task is stopped and the gate reopened
    /// first. Pools handed over with [`PoolSpec::owned`](crate::PoolSpec::owned) are shut
    /// down on return, also when this future is dropped early.
    ///
    /// # Errors
    /// The recorded failure, unless [`Coordinator::check_exception`] already returned it.
    pub async fn close(&self) -> Result<(), RuntimeError> {
        let _pools = OwnedPools(&self.shared);

        self.shared.force_gate_open();
        self.shared.wait_for_termination().await;
        self.shared.mark_closed();
        tracing::debug!("coordinator closed");
        self.check_exception()
    }

    /// Runs `f` with this coordinator, then closes it.
    ///
    /// If `f` fails, every task is stopped before closing; the error of `f` is returned
    /// in preference to the coordinator's.
    ///
    /// # Errors
    /// The error of `f`, otherwise the failure returned by [`Coordinator::close`].
    pub async fn scope<F, Fut, R, E>(self, f: F) -> Result<R, E>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<RuntimeError>,
    {
        let out = f(self.clone()).await;
        if out.is_err() {
            self.stop();
        }
        let closed = self.close().await;
        let value = out?;
        closed?;
        Ok(value)
    }

    /// The configuration the coordinator was built with.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// Number of tasks `close` would still wait for.
    pub fn live_tasks(&self) -> usize {
        self.shared.live_tasks()
    }

    /// True once `close` returned.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("id", &self.shared.id)
            .field("live_tasks", &self.live_tasks())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Shuts down owned pools when `close` returns or is dropped.
struct OwnedPools<'a>(&'a Shared);

impl Drop for OwnedPools<'_> {
    fn drop(&mut self) {
        self.0.shutdown_owned_pools();
    }
}
