//! # Aggregating coordinator.
//!
//! Folds the values of completed tasks into an accumulator and stops everything once the
//! fold says the result is decided. `any` and `all` over booleans are the usual cases:
//! the first `true` (or `false`) settles the answer and the remaining tasks are not
//! worth waiting for.
//!
//! ```text
//! aggregate(cfg, body) ──► Coordinator::submit(cfg + completion listener)
//!                                   │
//!            body completed ──► listener: step(acc, value); done(acc)? ──► stop all
//!
//! already done at submission ──► task is stopped on arrival, body never runs
//! ```
//!
//! Stopping on a decided fold is not a failure: `close` returns the accumulator.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::Coordinator;
use crate::error::{RuntimeError, SubmitError, TaskError};
use crate::tasks::task_fn::Body;
use crate::tasks::{ResultHandle, TaskConfig};

type Step<V, A> = Box<dyn Fn(&mut A, &V) + Send + Sync>;
type Done<A> = Box<dyn Fn(&A) -> bool + Send + Sync>;

struct Fold<V, A> {
    acc: Mutex<A>,
    step: Step<V, A>,
    done: Done<A>,
    /// Set once `done` held; read by the coordinator under its lock.
    decided: Arc<AtomicBool>,
}

impl<V, A> Fold<V, A> {
    fn is_done(&self) -> bool {
        self.decided.load(Ordering::SeqCst)
    }

    /// Folds `value` in; returns whether the result is now decided.
    fn apply(&self, value: &V) -> bool {
        let mut acc = self.acc.lock();
        (self.step)(&mut acc, value);
        let done = (self.done)(&acc);
        if done {
            self.decided.store(true, Ordering::SeqCst);
        }
        done
    }
}

/// Coordinator that folds task results and short-circuits once the fold is decided.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskcoord::{AggregatingCoordinator, Config, Coordinator, TaskConfig, TaskError};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let any = AggregatingCoordinator::any(Coordinator::new(Config::default())?);
/// any.aggregate(TaskConfig::new(), async {
///     tokio::time::sleep(Duration::from_secs(5)).await;
///     Ok::<_, TaskError>(false)
/// })?;
/// any.aggregate(TaskConfig::new(), async { Ok::<_, TaskError>(true) })?;
///
/// assert!(any.close().await?);
/// # Ok(())
/// # }
/// ```
pub struct AggregatingCoordinator<V, A> {
    coordinator: Coordinator,
    fold: Arc<Fold<V, A>>,
}

impl<V, A> AggregatingCoordinator<V, A>
where
    V: Send + Sync + 'static,
    A: Send + 'static,
{
    /// Wraps `coordinator`; `step` folds each completed value into `init`, `done` decides
    /// when the remaining tasks can be stopped.
    pub fn new<F, D>(coordinator: Coordinator, init: A, step: F, done: D) -> Self
    where
        F: Fn(&mut A, &V) + Send + Sync + 'static,
        D: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let decided = Arc::new(AtomicBool::new(done(&init)));
        Self {
            coordinator,
            fold: Arc::new(Fold {
                acc: Mutex::new(init),
                step: Box::new(step),
                done: Box::new(done),
                decided,
            }),
        }
    }

    /// Submits a forced body whose value is folded in once it completes.
    ///
    /// If the fold is already decided, the task is stopped on arrival.
    ///
    /// # Errors
    /// Same as [`Coordinator::execute`].
    pub fn aggregate<F>(&self, config: TaskConfig, body: F) -> Result<ResultHandle<V>, SubmitError>
    where
        F: Future<Output = Result<V, TaskError>> + Send + 'static,
    {
        let slot = Arc::new(OnceLock::new());
        let body = Body::forced(Arc::clone(&slot), body);
        self.submit(config, slot, body)
    }

    /// Cooperative variant of [`AggregatingCoordinator::aggregate`].
    ///
    /// # Errors
    /// Same as [`Coordinator::execute`].
    pub fn aggregate_cooperative<F, Fut>(
        &self,
        config: TaskConfig,
        body: F,
    ) -> Result<ResultHandle<V>, SubmitError>
    where
        F: FnOnce(tokio_util::sync::CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, TaskError>> + Send + 'static,
    {
        let slot = Arc::new(OnceLock::new());
        let body = Body::cooperative(Arc::clone(&slot), body);
        self.submit(config, slot, body)
    }

    fn submit(
        &self,
        config: TaskConfig,
        slot: Arc<OnceLock<V>>,
        body: Body,
    ) -> Result<ResultHandle<V>, SubmitError> {
        let config = config.stop_when(Arc::clone(&self.fold.decided));
        let fold = Arc::clone(&self.fold);
        let value = Arc::clone(&slot);
        let coordinator = self.coordinator.downgrade();
        let config = config.with_completion(Box::new(move || {
            let Some(value) = value.get() else {
                return;
            };
            if fold.apply(value) {
                if let Some(shared) = coordinator.upgrade() {
                    shared.stop_all();
                }
            }
        }));

        let handle = self.coordinator.submit(config, body)?;
        Ok(ResultHandle::new(handle, slot))
    }

    /// The wrapped coordinator, for plain (non-aggregated) tasks.
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// True once the fold is decided.
    pub fn is_done(&self) -> bool {
        self.fold.is_done()
    }
}

impl<V, A> AggregatingCoordinator<V, A>
where
    V: Send + Sync + 'static,
    A: Clone + Send + 'static,
{
    /// Current accumulator.
    pub fn value(&self) -> A {
        self.fold.acc.lock().clone()
    }

    /// Closes the coordinator and returns the accumulator.
    ///
    /// # Errors
    /// The coordinator's recorded failure, see [`Coordinator::close`].
    pub async fn close(self) -> Result<A, RuntimeError> {
        self.coordinator.close().await?;
        Ok(self.value())
    }
}

impl AggregatingCoordinator<bool, bool> {
    /// `true` as soon as one task returns `true`.
    pub fn any(coordinator: Coordinator) -> Self {
        Self::new(coordinator, false, |acc, v| *acc |= *v, |acc| *acc)
    }

    /// `false` as soon as one task returns `false`.
    pub fn all(coordinator: Coordinator) -> Self {
        Self::new(coordinator, true, |acc, v| *acc &= *v, |acc| !*acc)
    }
}

impl<V, A> fmt::Debug for AggregatingCoordinator<V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatingCoordinator")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[tokio::test]
    async fn test_sum_until_threshold() {
        let coordinator = Coordinator::new(Config::default()).unwrap();
        let sum = AggregatingCoordinator::new(
            coordinator,
            0u32,
            |acc, v: &u32| *acc += *v,
            |acc| *acc >= 10,
        );

        for n in [3u32, 4, 5] {
            sum.aggregate(TaskConfig::new(), async move { Ok(n) }).unwrap();
        }
        let total = sum.close().await.unwrap();
        assert!(total >= 10);
    }

    #[tokio::test]
    async fn test_decided_fold_stops_new_tasks_on_arrival() {
        let any = AggregatingCoordinator::any(Coordinator::new(Config::default()).unwrap());
        let first = any.aggregate(TaskConfig::new(), async { Ok(true) }).unwrap();
        first.get().await.unwrap();
        while !any.is_done() {
            tokio::task::yield_now().await;
        }

        let late = any.aggregate(TaskConfig::new(), async { Ok(false) }).unwrap();
        assert!(late.has_stopped());
        assert!(any.close().await.unwrap());
    }

    #[tokio::test]
    async fn test_decision_is_read_when_the_task_is_registered() {
        let coordinator = Coordinator::new(Config::default()).unwrap();
        let decided = Arc::new(AtomicBool::new(false));
        let ran = Arc::new(AtomicBool::new(false));

        // decided after the config was built, before the coordinator saw it
        let config = TaskConfig::new().stop_when(Arc::clone(&decided));
        decided.store(true, Ordering::SeqCst);
        let task = {
            let ran = Arc::clone(&ran);
            coordinator
                .execute(config, async move {
                    ran.store(true, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap()
        };

        assert!(task.has_stopped());
        coordinator.close().await.unwrap();
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_fold_decided_by_its_initial_value() {
        let capped = AggregatingCoordinator::new(
            Coordinator::new(Config::default()).unwrap(),
            10u32,
            |acc, v: &u32| *acc += *v,
            |acc| *acc >= 10,
        );
        assert!(capped.is_done());
        let task = capped.aggregate(TaskConfig::new(), async { Ok(1) }).unwrap();
        assert!(task.has_stopped());
        assert_eq!(capped.close().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_all_without_tasks_is_true() {
        let all = AggregatingCoordinator::all(Coordinator::new(Config::default()).unwrap());
        assert!(!all.is_done());
        assert!(all.close().await.unwrap());
    }
}
