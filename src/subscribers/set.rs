//! # SubscriberSet: fan-out over multiple subscribers
//!
//! [`SubscriberSet`] hands each [`Event`](crate::events::Event) to every subscriber in
//! registration order.
//!
//! ## What it guarantees
//! - Every subscriber sees every event, even if an earlier one panicked.
//! - Panics are caught; the first one is returned to the coordinator as an internal error.
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        ├──► S1.on_event()   (catch_unwind)
//!        ├──► S2.on_event()   (catch_unwind)
//!        └──► SN.on_event()   (catch_unwind)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{InternalError, panic_message};
use crate::events::Event;

use super::Subscribe;

/// Composite fan-out with panic isolation.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SubscriberSet {
    /// Creates a new set.
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subscribers }
    }

    /// Delivers one event to all subscribers.
    ///
    /// Returns the first subscriber panic, after every subscriber had its turn.
    pub fn emit(&self, event: &Event) -> Result<(), InternalError> {
        let mut first = None;
        for sub in &self.subscribers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                let message = panic_message(payload.as_ref());
                tracing::error!(subscriber = sub.name(), %message, "subscriber panicked");
                first.get_or_insert(InternalError::SubscriberPanicked {
                    subscriber: sub.name(),
                    message,
                });
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }
}
