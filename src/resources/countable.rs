//! # Capacity-bounded resource.
//!
//! [`CountableResource`] models a quota with a fixed capacity: a memory budget in bytes,
//! a number of file handles, a rate of requests. Shares are plain `u64` amounts.
//!
//! ## Rules
//! - The sum of acquired shares never exceeds `capacity`.
//! - Every release wakes all waiting tasks once; those that still do not fit are
//!   rejected again and wait for the next release.
//! - A share larger than `capacity` can never be granted. When no other share is held,
//!   the coordinator reports that as an internal error instead of waiting forever.

use std::mem;

use parking_lot::Mutex;

use crate::resources::{Resource, RetryCallback};

#[derive(Debug, Default)]
struct Counts {
    acquired: u64,
    pending: u64,
    waiters: Vec<RetryCallback>,
}

/// Quota with a fixed capacity and `u64` shares.
///
/// ## Example
/// ```rust
/// use taskcoord::{CountableResource, Resource, RetryCallback};
///
/// let memory = CountableResource::new("memory", 100);
/// memory.add_pending_share(&60);
/// assert!(memory.try_acquire(&60, &RetryCallback::new(|| {})));
/// assert_eq!(memory.available(), 40);
/// memory.release(&60);
/// assert_eq!(memory.available(), 100);
/// ```
#[derive(Debug)]
pub struct CountableResource {
    name: String,
    capacity: u64,
    counts: Mutex<Counts>,
}

impl CountableResource {
    /// Creates a resource with the given capacity.
    pub fn new(name: impl Into<String>, capacity: u64) -> Self {
        Self {
            name: name.into(),
            capacity,
            counts: Mutex::new(Counts::default()),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Sum of currently acquired shares.
    pub fn acquired(&self) -> u64 {
        self.counts.lock().acquired
    }

    /// Sum of shares declared by tasks that have not started yet.
    pub fn pending(&self) -> u64 {
        self.counts.lock().pending
    }

    /// Capacity not currently acquired.
    pub fn available(&self) -> u64 {
        self.capacity.saturating_sub(self.counts.lock().acquired)
    }

    /// Number of rejected tasks waiting for a release.
    pub fn waiting(&self) -> usize {
        self.counts.lock().waiters.len()
    }
}

impl Resource<u64> for CountableResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_pending_share(&self, share: &u64) {
        let mut counts = self.counts.lock();
        counts.pending = counts.pending.saturating_add(*share);
    }

    fn remove_pending_share(&self, share: &u64) {
        let mut counts = self.counts.lock();
        counts.pending = counts.pending.saturating_sub(*share);
    }

    fn try_acquire(&self, share: &u64, retry: &RetryCallback) -> bool {
        let mut counts = self.counts.lock();
        match counts.acquired.checked_add(*share) {
            Some(total) if total <= self.capacity => {
                counts.acquired = total;
                counts.pending = counts.pending.saturating_sub(*share);
                true
            }
            _ => {
                if !counts.waiters.contains(retry) {
                    counts.waiters.push(retry.clone());
                }
                false
            }
        }
    }

    fn release(&self, share: &u64) {
        let waiters = {
            let mut counts = self.counts.lock();
            counts.acquired = counts.acquired.saturating_sub(*share);
            mem::take(&mut counts.waiters)
        };
        for waiter in &waiters {
            waiter.invoke();
        }
    }

    fn remove(&self, retry: &RetryCallback) {
        self.counts.lock().waiters.retain(|w| w != retry);
    }
}
