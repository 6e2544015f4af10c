//! # taskcoord
//!
//! **Taskcoord** is a structured-concurrency task coordinator for tokio.
//!
//! Tasks are submitted to a [`Coordinator`] with declared dependencies, a category that
//! selects the pool they run on, and optional resource requirements. The coordinator runs
//! each task once its dependencies completed, bounds how many tasks of a category run at
//! once, and holds tasks back while a required resource is exhausted. The first failure
//! stops everything else and is reported by [`Coordinator::close`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TaskConfig  │   │  TaskConfig  │   │  TaskConfig  │
//!     │   + body     │   │   + body     │   │   + body     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (one mutex over the task graph)                      │
//! │  - DependencyTracker (what each task still waits for)             │
//! │  - Admission per category (max parallelism, FIFO by id)           │
//! │  - ExceptionalState (first failure wins, internal supersedes)     │
//! │  - Barrier (live tasks, awaited by close)                         │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ Default pool │   │   Io pool    │   │ Custom pool  │   │
//!     │ (tokio rt)   │   │ (tokio rt)   │   │ (tokio rt)   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ run_task:        │                  │                 │
//!      │ - acquire        │                  │                 │
//!      │   resources      │                  │                 │
//!      │ - run body       │                  │                 │
//!      │ - listeners      │                  │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │          Events (delivered right after the lock is released)      │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                    LogWriter   sub2      subN
//! ```
//!
//! ### Lifecycle
//! ```text
//! execute(config, body)
//!   ├─► INITIAL      waits for dependencies; a failed/stopped dependency stops it
//!   ├─► READY        held back while submission is paused
//!   ├─► SUBMITTED    queued until the category has a free slot
//!   ├─► ON_HOLD      a required resource was unavailable; retried on release
//!   ├─► EXECUTING    body runs with the task's cancellation token
//!   ├─► FINISHED     outcome recorded; completion/exception listeners run
//!   └─► TERMINATED   slot and resources released; dependents released or stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                           |
//! |-------------------|---------------------------------------------------------------------|----------------------------------------------|
//! | **Coordination**  | Dependency-ordered execution, fail-fast stop, close/scope.          | [`Coordinator`], [`CoordinatorBuilder`]      |
//! | **Tasks**         | Configure, submit and observe tasks.                                | [`TaskConfig`], [`Handle`], [`ResultHandle`] |
//! | **Pools**         | One tokio runtime per category, optional parallelism ceiling.       | [`PoolSpec`], [`TaskCategory`]               |
//! | **Resources**     | Gate task start on quota availability.                              | [`Resource`], [`CountableResource`]          |
//! | **Aggregation**   | Fold results, stop once the answer is decided.                      | [`AggregatingCoordinator`]                   |
//! | **Subscriber API**| Hook into task lifecycle events.                                    | [`Subscribe`], [`LogWriter`]                 |
//! | **Errors**        | Typed errors for submission, tasks and contract violations.         | [`TaskError`], [`RuntimeError`]              |
//! | **Configuration** | Dependency verification, close wait mode, io ceiling.               | [`Config`], [`WaitMode`]                     |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskcoord::{Config, Coordinator, LogWriter, Subscribe, TaskCategory, TaskConfig, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
//!     let coordinator = Coordinator::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let fetch = coordinator.execute(
//!         TaskConfig::new().name("fetch").category(TaskCategory::Io),
//!         async { Ok::<_, TaskError>("payload".to_string()) },
//!     )?;
//!     let parse = {
//!         let fetch = fetch.clone();
//!         coordinator
//!             .configure()
//!             .name("parse")
//!             .dependency(&fetch)
//!             .execute(async move { Ok::<_, TaskError>(fetch.get().await?.len()) })?
//!     };
//!
//!     coordinator.close().await?;
//!     assert_eq!(parse.get().await?, 7);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod pools;
mod resources;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{AggregatingCoordinator, Config, Coordinator, CoordinatorBuilder, WaitMode};
pub use error::{InternalError, RuntimeError, SubmitError, TaskError};
pub use events::{Event, EventKind};
pub use pools::PoolSpec;
pub use resources::{CountableResource, Resource, RetryCallback};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Configure, Handle, ResultHandle, Stage, TaskCategory, TaskConfig, TaskId};
