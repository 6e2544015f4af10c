//! # Logging subscriber.
//!
//! [`LogWriter`] forwards events to `tracing`:
//! - `debug!` for stage transitions
//! - `warn!` for failures and stops
//! - `error!` for internal errors
//!
//! ## Output format (with the default `fmt` subscriber)
//! ```text
//! DEBUG taskcoord: task_submitted task="load" id=#1 category=io
//!  WARN taskcoord: task_failed task="parse" id=#2 category=default reason="execution failed: bad header"
//!  WARN taskcoord: stop_requested
//! ERROR taskcoord: internal_error reason="listener of task `parse` panicked: oops"
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use taskcoord::{Config, Coordinator, LogWriter, Subscribe};
//! # #[tokio::main] async fn main() {
//! let coordinator = Coordinator::builder(Config::default())
//!     .with_subscribers(vec![Arc::new(LogWriter) as Arc<dyn Subscribe>])
//!     .build()
//!     .unwrap();
//! # }
//! ```

use crate::Subscribe;
use crate::events::{Event, EventKind};

/// Subscriber that writes events through `tracing`, target `taskcoord`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let task = e.task.as_deref().unwrap_or("-");
        let id = e.task_id.map(|id| id.to_string()).unwrap_or_default();
        let category = e.category.as_ref().map(|c| c.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::InternalError => {
                tracing::error!(target: "taskcoord", reason, "{label}");
            }
            EventKind::TaskFailed | EventKind::TaskStopped | EventKind::TaskOnHold => {
                tracing::warn!(target: "taskcoord", task, id = %id, category, reason, "{label}");
            }
            EventKind::StopRequested => {
                tracing::warn!(target: "taskcoord", "{label}");
            }
            EventKind::SubmissionPaused | EventKind::SubmissionResumed | EventKind::Closed => {
                tracing::debug!(target: "taskcoord", "{label}");
            }
            _ => {
                tracing::debug!(target: "taskcoord", task, id = %id, category, "{label}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskCategory;

    #[test]
    fn test_every_kind_is_logged_without_subscriber() {
        for kind in [
            EventKind::TaskCreated,
            EventKind::TaskFailed,
            EventKind::StopRequested,
            EventKind::InternalError,
            EventKind::Closed,
        ] {
            LogWriter.on_event(
                &Event::new(kind)
                    .with_task("t")
                    .with_category(TaskCategory::Default)
                    .with_reason("r"),
            );
        }
        assert_eq!(LogWriter.name(), "log");
    }
}
