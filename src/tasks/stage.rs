//! # Per-task state machine.
//!
//! ```text
//! INITIAL ──► READY ──► SUBMITTED ──► EXECUTING ──► FINISHED ──► TERMINATED
//!               ▲           │  ▲
//!               │           ▼  │
//!               └──────── ON_HOLD          (resource unavailable at start)
//!
//! any non-terminal stage ──► TERMINATED     (stop request)
//! ```
//!
//! `FINISHED` is transient: the outcome is recorded and listeners run, then the
//! handle commits to `TERMINATED` together with whatever [`Deferred`] requests
//! arrived in the meantime.

use std::fmt;

/// Lifecycle stage of a task handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Created, waiting for dependencies.
    Initial,
    /// Dependencies satisfied; eligible for submission.
    Ready,
    /// Handed to the bounded pool (admitted or queued).
    Submitted,
    /// Started by the pool but a required resource was unavailable.
    OnHold,
    /// Body is running.
    Executing,
    /// Outcome recorded; listeners are running.
    Finished,
    /// Final.
    Terminated,
}

impl Stage {
    /// Whether the state machine allows moving from `self` to `to`.
    pub fn can_transition(self, to: Stage) -> bool {
        use Stage::*;
        match (self, to) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Initial, Ready)
            | (Ready, Submitted)
            | (Submitted, Executing)
            | (Submitted, OnHold)
            | (OnHold, Ready)
            | (OnHold, Submitted)
            | (Executing, Finished) => true,
            _ => false,
        }
    }

    /// Stable name used in events and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::Ready => "ready",
            Stage::Submitted => "submitted",
            Stage::OnHold => "on_hold",
            Stage::Executing => "executing",
            Stage::Finished => "finished",
            Stage::Terminated => "terminated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests raised while a handle is `FINISHED`, committed on its move to `TERMINATED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Deferred {
    /// A stop arrived while listeners ran: dependents are stopped instead of released.
    Stop,
}

/// Small ordered queue of [`Deferred`] requests; each request is kept once.
#[derive(Debug, Default)]
pub(crate) struct DeferredQueue(Vec<Deferred>);

impl DeferredQueue {
    pub(crate) fn push(&mut self, flag: Deferred) {
        if !self.0.contains(&flag) {
            self.0.push(flag);
        }
    }

    pub(crate) fn contains(&self, flag: Deferred) -> bool {
        self.0.contains(&flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 7] = [
        Stage::Initial,
        Stage::Ready,
        Stage::Submitted,
        Stage::OnHold,
        Stage::Executing,
        Stage::Finished,
        Stage::Terminated,
    ];

    #[test]
    fn test_forward_path_allowed() {
        let path = [
            Stage::Initial,
            Stage::Ready,
            Stage::Submitted,
            Stage::Executing,
            Stage::Finished,
            Stage::Terminated,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_hold_loop() {
        assert!(Stage::Submitted.can_transition(Stage::OnHold));
        assert!(Stage::OnHold.can_transition(Stage::Ready));
        assert!(Stage::OnHold.can_transition(Stage::Submitted));
        assert!(!Stage::OnHold.can_transition(Stage::Executing));
    }

    #[test]
    fn test_stop_edge_from_every_live_stage() {
        for stage in ALL.iter().filter(|s| **s != Stage::Terminated) {
            assert!(stage.can_transition(Stage::Terminated), "{stage}");
        }
        for stage in ALL {
            assert!(!Stage::Terminated.can_transition(stage));
        }
    }

    #[test]
    fn test_no_skipping() {
        assert!(!Stage::Initial.can_transition(Stage::Submitted));
        assert!(!Stage::Ready.can_transition(Stage::Executing));
        assert!(!Stage::Executing.can_transition(Stage::Ready));
        assert!(!Stage::Finished.can_transition(Stage::Executing));
    }

    #[test]
    fn test_deferred_queue_dedups() {
        let mut q = DeferredQueue::default();
        assert!(!q.contains(Deferred::Stop));
        q.push(Deferred::Stop);
        q.push(Deferred::Stop);
        assert!(q.contains(Deferred::Stop));
        assert_eq!(q.0.len(), 1);
    }
}
