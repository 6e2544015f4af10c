//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging custom event handlers (the
//! coordinator's logger) into a coordinator.
//!
//! ## Rules
//! - Called synchronously, right after the coordinator lock is released, on whichever
//!   thread made the state change.
//! - Events of one critical section arrive in `seq` order.
//! - A panic is caught and recorded as
//!   [`InternalError::SubscriberPanicked`](crate::InternalError::SubscriberPanicked):
//!   like any internal error it stops every task and wins over task failures.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use taskcoord::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Failures(AtomicUsize);
//!
//! impl Subscribe for Failures {
//!     fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::TaskFailed) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

use crate::events::Event;

/// Event subscriber for coordinator observability.
///
/// ### Implementation requirements
/// - Keep `on_event` short; it runs on task workers and on the caller's thread.
/// - Do not call back into the coordinator.
/// - Handle errors internally; do not panic.
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in logs and in internal errors.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
