//! Runtime core: coordination and lifecycle.
//!
//! The public API from this module is [`Coordinator`] with its [`CoordinatorBuilder`] and
//! [`Config`], plus the [`AggregatingCoordinator`] wrapper.
//!
//! Internal modules:
//! - [`state`]: the task graph under one lock; every transition happens here;
//! - [`shared`]: the lock, deferred effects and the handle-facing entry points;
//! - [`runner`]: runs one task body on its pool and reports the outcome;
//! - [`tracker`]: which dependencies each task still waits for;
//! - [`exceptional`]: first failure wins, internal errors supersede;
//! - [`barrier`]: live-task count that `close` waits on.

mod aggregate;
mod barrier;
mod builder;
mod config;
mod coordinator;
mod exceptional;
mod runner;
mod shared;
mod state;
mod tracker;

pub use aggregate::AggregatingCoordinator;
pub use builder::CoordinatorBuilder;
pub use config::{Config, WaitMode};
pub use coordinator::Coordinator;

pub(crate) use shared::Shared;
