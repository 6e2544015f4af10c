//! # Pool specification.
//!
//! ## Sentinel values
//! - `max_parallelism = 0` → unbounded

use tokio::runtime::{Handle, Runtime};

#[derive(Debug)]
pub(crate) enum PoolKind {
    /// Runtime owned by the caller; never shut down by the coordinator.
    Shared(Handle),
    /// Runtime handed over to the coordinator; shut down on `close`.
    Owned(Runtime),
}

/// Pool assignment for one task category.
///
/// ## Example
/// ```rust
/// use taskcoord::{Config, Coordinator, PoolSpec, TaskCategory};
///
/// let io = tokio::runtime::Builder::new_multi_thread()
///     .worker_threads(2)
///     .enable_all()
///     .build()
///     .unwrap();
///
/// let coordinator = Coordinator::builder(Config::default())
///     .with_pool(TaskCategory::Default, PoolSpec::owned(
///         tokio::runtime::Runtime::new().unwrap(),
///     ))
///     .with_pool(TaskCategory::Io, PoolSpec::owned(io).with_max_parallelism(2))
///     .build()
///     .unwrap();
/// assert_eq!(coordinator.live_tasks(), 0);
/// ```
#[derive(Debug)]
pub struct PoolSpec {
    pub(crate) kind: PoolKind,
    pub(crate) max_parallelism: usize,
}

impl PoolSpec {
    /// Runs tasks on a runtime the caller keeps ownership of.
    pub fn shared(handle: Handle) -> Self {
        Self {
            kind: PoolKind::Shared(handle),
            max_parallelism: 0,
        }
    }

    /// Runs tasks on a runtime the coordinator shuts down when it is closed.
    pub fn owned(runtime: Runtime) -> Self {
        Self {
            kind: PoolKind::Owned(runtime),
            max_parallelism: 0,
        }
    }

    /// Bounds how many tasks of the category are admitted to the pool at once (`0` = unbounded).
    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.max_parallelism = max;
        self
    }

    /// Returns the ceiling as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` admitted tasks
    #[inline]
    pub fn parallelism_limit(&self) -> Option<usize> {
        if self.max_parallelism == 0 {
            None
        } else {
            Some(self.max_parallelism)
        }
    }

    /// True if the coordinator owns the runtime.
    pub fn is_owned(&self) -> bool {
        matches!(self.kind, PoolKind::Owned(_))
    }

    /// Drops the spec without blocking the current thread.
    pub(crate) fn discard(self) {
        if let PoolKind::Owned(runtime) = self.kind {
            runtime.shutdown_background();
        }
    }
}
