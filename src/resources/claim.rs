//! # Resource claims of one task.
//!
//! A task's resource requirement is a list of `(resource, share)` pairs, type-erased into
//! [`Claim`] objects and kept sorted by resource identity. Acquiring in that total order
//! is what keeps tasks with overlapping requirements from waiting on each other in a
//! cycle: a compound claim either gets everything or gives back what it took, in reverse.

use std::sync::Arc;

use crate::resources::{Resource, RetryCallback};

/// Identity of a resource instance (its address).
pub(crate) type ResourceKey = usize;

/// One share of one resource, with the share type erased.
pub(crate) trait Claim: Send + Sync {
    fn key(&self) -> ResourceKey;
    fn resource_name(&self) -> String;
    fn add_pending(&self);
    fn remove_pending(&self);
    fn try_acquire(&self, retry: &RetryCallback) -> bool;
    fn release(&self);
    fn remove(&self, retry: &RetryCallback);
}

pub(crate) struct ShareClaim<R: ?Sized, S> {
    resource: Arc<R>,
    share: S,
}

impl<R: ?Sized, S> ShareClaim<R, S> {
    pub(crate) fn new(resource: Arc<R>, share: S) -> Self {
        Self { resource, share }
    }
}

impl<R, S> Claim for ShareClaim<R, S>
where
    R: Resource<S> + ?Sized,
    S: Send + Sync + 'static,
{
    fn key(&self) -> ResourceKey {
        Arc::as_ptr(&self.resource).cast::<()>() as usize
    }

    fn resource_name(&self) -> String {
        self.resource.name().to_string()
    }

    fn add_pending(&self) {
        self.resource.add_pending_share(&self.share);
    }

    fn remove_pending(&self) {
        self.resource.remove_pending_share(&self.share);
    }

    fn try_acquire(&self, retry: &RetryCallback) -> bool {
        self.resource.try_acquire(&self.share, retry)
    }

    fn release(&self) {
        self.resource.release(&self.share);
    }

    fn remove(&self, retry: &RetryCallback) {
        self.resource.remove(retry);
    }
}

/// The resource that turned a compound claim down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rejection {
    pub(crate) key: ResourceKey,
    pub(crate) resource: String,
}

/// All claims of one task, in acquisition order.
#[derive(Default)]
pub(crate) struct ResourceClaims(Vec<Box<dyn Claim>>);

impl ResourceClaims {
    pub(crate) fn new(mut claims: Vec<Box<dyn Claim>>) -> Self {
        // stable: two shares of the same resource keep declaration order
        claims.sort_by_key(|c| c.key());
        Self(claims)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = ResourceKey> + '_ {
        self.0.iter().map(|c| c.key())
    }

    pub(crate) fn add_pending(&self) {
        self.0.iter().for_each(|c| c.add_pending());
    }

    pub(crate) fn remove_pending(&self) {
        self.0.iter().for_each(|c| c.remove_pending());
    }

    /// Acquires every share or none.
    ///
    /// On rejection, shares taken so far are released in reverse order and become
    /// pending again.
    pub(crate) fn try_acquire(&self, retry: &RetryCallback) -> Result<(), Rejection> {
        for (i, claim) in self.0.iter().enumerate() {
            if claim.try_acquire(retry) {
                continue;
            }
            for taken in self.0[..i].iter().rev() {
                taken.release();
                taken.add_pending();
            }
            return Err(Rejection {
                key: claim.key(),
                resource: claim.resource_name(),
            });
        }
        Ok(())
    }

    /// Releases every acquired share, last acquired first.
    pub(crate) fn release(&self) {
        self.0.iter().rev().for_each(|c| c.release());
    }

    pub(crate) fn remove(&self, retry: &RetryCallback) {
        self.0.iter().for_each(|c| c.remove(retry));
    }
}
