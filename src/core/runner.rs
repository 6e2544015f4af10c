//! # Run one task body on its pool.
//!
//! A [`TaskRun`] is created for every launch, before it is spawned. The runner asks the
//! coordinator for the body (which acquires resources and may put the task on hold),
//! drives it, and reports the outcome.
//!
//! ## Flow
//! ```text
//! begin ──► None ─────────────────────────────► done (terminated or on hold)
//!       └─► Some(body, token)
//!              ├─ forced:      select!(token.cancelled, body) ─► outcome or None
//!              └─ cooperative: body(token)                    ─► outcome
//!                                                     └──────────► complete
//! ```
//!
//! ## Rules
//! - Panics in the body are caught and reported as [`TaskError::Panicked`].
//! - A forced body is dropped as soon as the task's token is cancelled.
//! - A cooperative body always runs to its end; after a stop its outcome is discarded.
//! - If the runner itself is dropped (its pool shut down), the task is abandoned.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::core::Shared;
use crate::error::{TaskError, panic_message};
use crate::tasks::TaskId;
use crate::tasks::task_fn::Body;

/// Launch of one task; reports abandonment if dropped before the body finished.
pub(crate) struct TaskRun {
    shared: Arc<Shared>,
    id: TaskId,
    armed: bool,
}

impl TaskRun {
    pub(crate) fn new(shared: Arc<Shared>, id: TaskId) -> Self {
        Self {
            shared,
            id,
            armed: true,
        }
    }
}

impl Drop for TaskRun {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(task = %self.id, "runner dropped before the body finished");
            self.shared.abandon(self.id);
        }
    }
}

pub(crate) async fn run_task(mut run: TaskRun) {
    let Some((body, token)) = run.shared.begin(run.id) else {
        run.armed = false;
        return;
    };

    let result = match body {
        Body::Forced(fut) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                res = AssertUnwindSafe(fut).catch_unwind() => Some(res),
            }
        }
        Body::Cooperative(f) => Some(
            AssertUnwindSafe(async move { f(token).await })
                .catch_unwind()
                .await,
        ),
    };

    let result = result.map(|res| {
        res.unwrap_or_else(|payload| {
            Err(TaskError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        })
    });
    if let Some(Err(err)) = &result {
        tracing::debug!(task = %run.id, error = %err, "body failed");
    }

    run.armed = false;
    run.shared.complete(run.id, result);
}
