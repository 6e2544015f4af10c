//! # Task categories.
//!
//! A category selects the pool a task runs on and the parallelism ceiling it is
//! admitted under. The set is closed at coordinator build time: two built-in
//! categories plus any number of caller-defined ones passed to
//! [`CoordinatorBuilder::with_pool`](crate::CoordinatorBuilder::with_pool).

use std::borrow::Cow;
use std::fmt;

/// Bucket of tasks mapped to one pool and one concurrency ceiling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskCategory {
    /// General purpose work; unbounded unless configured otherwise.
    #[default]
    Default,
    /// Work that mostly waits on blocking I/O; bounded by [`Config::io_parallelism`](crate::Config::io_parallelism).
    Io,
    /// Caller-defined category.
    Custom(Cow<'static, str>),
}

impl TaskCategory {
    /// Creates a caller-defined category.
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        TaskCategory::Custom(name.into())
    }

    /// Stable name used in events and logs.
    pub fn as_str(&self) -> &str {
        match self {
            TaskCategory::Default => "default",
            TaskCategory::Io => "io",
            TaskCategory::Custom(name) => name,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
