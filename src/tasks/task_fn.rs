//! # Function-backed task bodies.
//!
//! A body comes in two forms:
//! - **forced**: a plain future. On stop it is dropped at its next suspension point.
//! - **cooperative**: a closure receiving a [`CancellationToken`]. It is never dropped
//!   early; it is expected to poll the token and return.
//!
//! Both are erased into [`Body`], which writes the typed value into the handle's slot
//! and reports only success or failure to the coordinator.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Type-erased body future.
pub(crate) type BodyFuture = BoxFuture<'static, Result<(), TaskError>>;

/// Type-erased task body.
pub(crate) enum Body {
    Forced(BodyFuture),
    Cooperative(Box<dyn FnOnce(CancellationToken) -> BodyFuture + Send>),
}

impl Body {
    /// Wraps a future whose value is stored into `slot` on success.
    pub(crate) fn forced<T, F>(slot: Arc<OnceLock<T>>, fut: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Body::Forced(Box::pin(async move {
            let value = fut.await?;
            let _ = slot.set(value);
            Ok(())
        }))
    }

    /// Wraps a token-polling closure whose value is stored into `slot` on success.
    pub(crate) fn cooperative<T, F, Fut>(slot: Arc<OnceLock<T>>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Body::Cooperative(Box::new(move |token| {
            Box::pin(async move {
                let value = f(token).await?;
                let _ = slot.set(value);
                Ok(())
            })
        }))
    }

    #[cfg(test)]
    pub(crate) fn is_cooperative(&self) -> bool {
        matches!(self, Body::Cooperative(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forced_body_fills_slot() {
        let slot = Arc::new(OnceLock::new());
        let Body::Forced(fut) = Body::forced(Arc::clone(&slot), async { Ok(7u32) }) else {
            panic!("expected forced body");
        };
        fut.await.unwrap();
        assert_eq!(slot.get(), Some(&7));
    }

    #[tokio::test]
    async fn test_cooperative_body_sees_token() {
        let slot = Arc::new(OnceLock::new());
        let body = Body::cooperative(Arc::clone(&slot), |token: CancellationToken| async move {
            Ok(token.is_cancelled())
        });
        assert!(body.is_cooperative());
        let Body::Cooperative(f) = body else {
            panic!("expected cooperative body");
        };
        let token = CancellationToken::new();
        token.cancel();
        f(token).await.unwrap();
        assert_eq!(slot.get(), Some(&true));
    }

    #[tokio::test]
    async fn test_failure_leaves_slot_empty() {
        let slot: Arc<OnceLock<u8>> = Arc::new(OnceLock::new());
        let Body::Forced(fut) = Body::forced(Arc::clone(&slot), async { Err(TaskError::fail("no")) })
        else {
            panic!("expected forced body");
        };
        assert_eq!(fut.await, Err(TaskError::fail("no")));
        assert!(slot.get().is_none());
    }
}
