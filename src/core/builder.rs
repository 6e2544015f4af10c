use std::mem;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::{Config, Coordinator, Shared};
use crate::error::SubmitError;
use crate::pools::PoolSpec;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::TaskCategory;

/// Builder for constructing a [`Coordinator`] with explicit pools and subscribers.
pub struct CoordinatorBuilder {
    cfg: Config,
    pools: Vec<(TaskCategory, PoolSpec)>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            pools: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Assigns a pool to `category`, replacing any earlier assignment.
    ///
    /// `Default` and `Io` fall back to the ambient runtime when not assigned; any other
    /// category must be assigned before tasks can use it.
    pub fn with_pool(mut self, category: TaskCategory, spec: PoolSpec) -> Self {
        if let Some(pos) = self.pools.iter().position(|(c, _)| *c == category) {
            let (_, replaced) = self.pools.swap_remove(pos);
            replaced.discard();
        }
        self.pools.push((category, spec));
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers are called synchronously, right after the coordinator lock is released,
    /// so they must not block.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the coordinator.
    ///
    /// Unassigned `Default` and `Io` categories run on the current tokio runtime; `Io` is
    /// bounded by [`Config::io_parallelism`] there.
    ///
    /// # Errors
    /// [`SubmitError::NoRuntime`] if a fallback pool is needed outside of a tokio runtime.
    pub fn build(mut self) -> Result<Coordinator, SubmitError> {
        let mut pools = mem::take(&mut self.pools);
        let missing: Vec<TaskCategory> = [TaskCategory::Default, TaskCategory::Io]
            .into_iter()
            .filter(|category| !pools.iter().any(|(c, _)| c == category))
            .collect();

        if !missing.is_empty() {
            let handle = match Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => {
                    pools.into_iter().for_each(|(_, spec)| spec.discard());
                    return Err(SubmitError::NoRuntime);
                }
            };
            for category in missing {
                let spec = PoolSpec::shared(handle.clone());
                let spec = match (&category, self.cfg.io_limit()) {
                    (TaskCategory::Io, Some(limit)) => spec.with_max_parallelism(limit),
                    _ => spec,
                };
                pools.push((category, spec));
            }
        }

        let cfg = mem::take(&mut self.cfg);
        let subscribers = SubscriberSet::new(mem::take(&mut self.subscribers));
        tracing::debug!(pools = pools.len(), "coordinator built");
        Ok(Coordinator::from_shared(Shared::new(cfg, pools, subscribers)))
    }
}

impl Drop for CoordinatorBuilder {
    fn drop(&mut self) {
        for (_, spec) in self.pools.drain(..) {
            spec.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_outside_runtime_needs_explicit_pools() {
        let err = CoordinatorBuilder::new(Config::default()).build().unwrap_err();
        assert_eq!(err, SubmitError::NoRuntime);
    }

    #[tokio::test]
    async fn test_fallback_pools_from_ambient_runtime() {
        let coordinator = CoordinatorBuilder::new(Config::default()).build().unwrap();
        assert_eq!(coordinator.live_tasks(), 0);
        coordinator.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_replaced_owned_pool_is_released() {
        let first = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let second = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let builder = CoordinatorBuilder::new(Config::default())
            .with_pool(TaskCategory::custom("cpu"), PoolSpec::owned(first))
            .with_pool(TaskCategory::custom("cpu"), PoolSpec::owned(second));
        assert_eq!(builder.pools.len(), 1);
        drop(builder);
    }

    #[tokio::test]
    async fn test_zero_io_parallelism_leaves_io_unbounded() {
        use crate::tasks::TaskConfig;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let coordinator = CoordinatorBuilder::new(Config {
            io_parallelism: 0,
            ..Config::default()
        })
        .build()
        .unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
            coordinator
                .execute(TaskConfig::new().category(TaskCategory::Io), async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }

        coordinator.close().await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 8);
    }
}
