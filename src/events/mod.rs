//! Coordinator events.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publisher**: the coordinator, right after each critical section.
//! - **Consumers**: the [`SubscriberSet`](crate::SubscriberSet) built from
//!   [`CoordinatorBuilder::with_subscribers`](crate::CoordinatorBuilder::with_subscribers).

mod event;

pub use event::{Event, EventKind};
