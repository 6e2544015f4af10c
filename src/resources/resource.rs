//! # Resource protocol.
//!
//! Contract between the coordinator and a resource:
//! - `try_acquire` accepted: the resource must not invoke the retry callback.
//! - `try_acquire` rejected: the resource must invoke the retry callback exactly once,
//!   later, when capacity might suffice. It never resubmits the task itself.
//! - `remove` discards a pending callback of a task that was stopped while on hold.
//!
//! All calls are made while the owning coordinator's lock is held, so implementations
//! must not call back into the coordinator. Invoking a [`RetryCallback`] is always safe:
//! the retry is dispatched onto the task's pool.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for retry callback identities.
static RETRY_SEQ: AtomicU64 = AtomicU64::new(0);

/// A finite resource tasks can hold shares of.
///
/// `S` is the share type, e.g. a byte count for a memory budget.
///
/// ## Example
/// ```rust
/// use parking_lot::Mutex;
/// use taskcoord::{Resource, RetryCallback};
///
/// /// At most one holder at a time.
/// #[derive(Default)]
/// struct Exclusive {
///     state: Mutex<(bool, Vec<RetryCallback>)>,
/// }
///
/// impl Resource<()> for Exclusive {
///     fn name(&self) -> &str { "exclusive" }
///     fn add_pending_share(&self, _: &()) {}
///     fn remove_pending_share(&self, _: &()) {}
///
///     fn try_acquire(&self, _: &(), retry: &RetryCallback) -> bool {
///         let mut st = self.state.lock();
///         if st.0 {
///             st.1.push(retry.clone());
///             return false;
///         }
///         st.0 = true;
///         true
///     }
///
///     fn release(&self, _: &()) {
///         let waiters = {
///             let mut st = self.state.lock();
///             st.0 = false;
///             std::mem::take(&mut st.1)
///         };
///         waiters.iter().for_each(RetryCallback::invoke);
///     }
///
///     fn remove(&self, retry: &RetryCallback) {
///         self.state.lock().1.retain(|r| r != retry);
///     }
/// }
/// ```
pub trait Resource<S>: Send + Sync + 'static {
    /// Name used in diagnostics and internal errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// A task declared `share`; it does not compete for capacity yet.
    fn add_pending_share(&self, share: &S);

    /// A task with a pending `share` was stopped before acquiring it.
    fn remove_pending_share(&self, share: &S);

    /// Tries to turn a pending `share` into an acquired one.
    ///
    /// On rejection the resource keeps `retry` and invokes it once, later.
    fn try_acquire(&self, share: &S, retry: &RetryCallback) -> bool;

    /// Gives back an acquired `share`.
    fn release(&self, share: &S);

    /// Forgets `retry` if it is still waiting.
    fn remove(&self, retry: &RetryCallback);
}

/// Wakes up a task that a resource rejected.
///
/// Clones compare equal; callbacks created separately never do.
#[derive(Clone)]
pub struct RetryCallback {
    id: u64,
    f: Arc<dyn Fn() + Send + Sync>,
}

impl RetryCallback {
    /// Wraps `f` into a callback with a fresh identity.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: RETRY_SEQ.fetch_add(1, Ordering::Relaxed),
            f: Arc::new(f),
        }
    }

    /// Requests the retry.
    pub fn invoke(&self) {
        (self.f)();
    }
}

impl PartialEq for RetryCallback {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RetryCallback {}

impl fmt::Debug for RetryCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetryCallback").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_identity_follows_clones() {
        let a = RetryCallback::new(|| {});
        let b = RetryCallback::new(|| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_invoke_runs_closure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let cb = RetryCallback::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        cb.invoke();
        cb.clone().invoke();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
