//! # Pools and admission.
//!
//! Every task category maps to one tokio runtime (the *pool*) and one [`Admission`]
//! queue that enforces the category's parallelism ceiling.
//!
//! ```text
//! submit(task) ──► Admission ──┬─ admitted < max ──► pool.spawn(run_task)
//!                              └─ otherwise      ──► queue (by task id)
//! terminate(task) ──► Admission::on_task_completed ──► next queued task admitted
//! ```
//!
//! The registry is built once by [`CoordinatorBuilder`](crate::CoordinatorBuilder) and
//! never changes afterwards.

mod bounded;
mod registry;
mod spec;

pub(crate) use bounded::Admission;
pub(crate) use registry::PoolRegistry;
pub use spec::PoolSpec;
pub(crate) use spec::PoolKind;
