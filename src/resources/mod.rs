//! # Resource arbitration.
//!
//! A task may require shares of finite resources (memory budgets, file handles, quotas).
//! Shares are declared at submission (*pending*), acquired when the pool starts the task
//! (*acquired*) and released once the task terminates.
//!
//! ```text
//!  submit ──► add_pending_share
//!  start  ──► try_acquire ─┬─ accepted ──► body runs ──► release
//!                          └─ rejected ──► ON_HOLD ... retry() ──► start again
//!  stop   ──► remove_pending_share + remove(retry)
//! ```
//!
//! - [`Resource`] - the protocol a resource implements
//! - [`RetryCallback`] - how a rejected task is woken up
//! - [`CountableResource`] - capacity-bounded built-in resource

mod claim;
mod countable;
mod resource;

pub use countable::CountableResource;
pub use resource::{Resource, RetryCallback};

pub(crate) use claim::{Claim, ResourceClaims, ResourceKey, ShareClaim};
