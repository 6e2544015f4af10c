//! # Coordinator configuration.
//!
//! Provides [`Config`] centralized settings for a coordinator and [`WaitMode`].
//!
//! Config is used in two ways:
//! 1. **Coordinator creation**: `Coordinator::new(config)` / `Coordinator::builder(config)`
//! 2. **Default pools**: the `Io` category gets `io_parallelism` as its ceiling unless a
//!    pool is configured explicitly.
//!
//! ## Sentinel values
//! - `io_parallelism = 0` → unbounded

/// What [`Coordinator::close`](crate::Coordinator::close) waits for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitMode {
    /// Wait until every task fully terminated: body returned, listeners ran, resources
    /// released.
    #[default]
    UntilTermination,
    /// Wait until every task terminated or was at least asked to stop. A stopped body that
    /// has not observed the stop yet may still be running when `close` returns.
    UntilTerminationRequested,
}

/// Configuration of one coordinator; immutable once the coordinator is built.
///
/// ## Field semantics
/// - `verify_dependencies`: reading an undecided result is an error instead of a wait
/// - `wait_mode`: see [`WaitMode`]
/// - `io_parallelism`: ceiling of the default `Io` pool (`0` = unbounded)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Enforces declared dependencies at result access.
    ///
    /// When on, [`ResultHandle::get`](crate::ResultHandle::get) on a task that is not yet
    /// decided fails with [`TaskError::UndeclaredDependency`](crate::TaskError::UndeclaredDependency)
    /// and records an internal error, instead of waiting. Meant for tests and debugging:
    /// it turns a forgotten dependency into a deterministic failure.
    pub verify_dependencies: bool,

    /// Shutdown wait policy.
    pub wait_mode: WaitMode,

    /// Maximum number of `Io` tasks admitted at once when the `Io` pool is not configured
    /// explicitly.
    ///
    /// - `0` = unbounded
    /// - `n > 0` = at most `n` tasks admitted simultaneously
    pub io_parallelism: usize,
}

impl Config {
    /// Returns the `Io` ceiling as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` admitted `Io` tasks
    #[inline]
    pub fn io_limit(&self) -> Option<usize> {
        if self.io_parallelism == 0 {
            None
        } else {
            Some(self.io_parallelism)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `verify_dependencies = false`
    /// - `wait_mode = WaitMode::UntilTermination`
    /// - `io_parallelism = 4`
    fn default() -> Self {
        Self {
            verify_dependencies: false,
            wait_mode: WaitMode::default(),
            io_parallelism: 4,
        }
    }
}
