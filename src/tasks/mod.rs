//! # Task abstractions.
//!
//! This module provides the per-task types:
//! - [`Stage`] - the task state machine
//! - [`TaskCategory`] - selects the pool a task runs on
//! - [`Handle`] / [`ResultHandle`] - caller's token for a submitted task
//! - [`TaskConfig`] / [`Configure`] - how a task is submitted
//! - [`TaskId`] - per-coordinator sequence id

mod category;
mod handle;
pub(crate) mod listener;
mod spec;
mod stage;
pub(crate) mod task;
pub(crate) mod task_fn;

pub use category::TaskCategory;
pub use handle::{Handle, ResultHandle};
pub use spec::{Configure, TaskConfig};
pub use stage::Stage;
pub use task::TaskId;

pub(crate) use stage::{Deferred, DeferredQueue};
