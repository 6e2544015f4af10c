//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Coordinator ── critical section ──► Effects.events
//!                                            │ (lock released)
//!                                            ▼
//!                                      SubscriberSet::emit(&Event)
//!                                            │
//!                                  ┌─────────┼─────────┐
//!                                  ▼         ▼         ▼
//!                              LogWriter   Metrics   Custom ...
//!                                            │
//!                      panic ──► InternalError::SubscriberPanicked ──► exceptional state
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
