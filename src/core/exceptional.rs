//! # Exceptional state of a coordinator.
//!
//! Holds at most one failure:
//! - the first recorded failure wins;
//! - an internal failure replaces an external one, and can be thrown again;
//! - a failure is handed to the caller at most once.

use crate::error::RuntimeError;

/// Effect of [`ExceptionalState::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recorded {
    /// Nothing was recorded before; the caller must stop everything.
    First,
    /// An internal failure replaced an external one.
    Superseded,
    /// A failure of the same or higher priority was already recorded.
    Ignored,
}

#[derive(Debug, Default)]
pub(crate) struct ExceptionalState {
    failure: Option<RuntimeError>,
    thrown: bool,
}

impl ExceptionalState {
    pub(crate) fn record(&mut self, err: RuntimeError) -> Recorded {
        match &self.failure {
            None => {
                self.failure = Some(err);
                Recorded::First
            }
            Some(current) if !current.is_internal() && err.is_internal() => {
                self.failure = Some(err);
                self.thrown = false;
                Recorded::Superseded
            }
            Some(_) => Recorded::Ignored,
        }
    }

    /// Returns the failure unless it was already returned once.
    pub(crate) fn take_unthrown(&mut self) -> Option<RuntimeError> {
        if self.thrown {
            return None;
        }
        let failure = self.failure.clone()?;
        self.thrown = true;
        Some(failure)
    }

    #[cfg(test)]
    pub(crate) fn failure(&self) -> Option<&RuntimeError> {
        self.failure.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InternalError, TaskError};

    fn external(task: &str) -> RuntimeError {
        RuntimeError::Task {
            task: task.into(),
            error: TaskError::fail("boom"),
        }
    }

    fn internal(task: &str) -> RuntimeError {
        InternalError::DoubleCompletion { task: task.into() }.into()
    }

    #[test]
    fn test_first_external_wins() {
        let mut st = ExceptionalState::default();
        assert_eq!(st.record(external("a")), Recorded::First);
        assert_eq!(st.record(external("b")), Recorded::Ignored);
        assert_eq!(st.failure(), Some(&external("a")));
    }

    #[test]
    fn test_internal_supersedes_and_rearms() {
        let mut st = ExceptionalState::default();
        st.record(external("a"));
        assert_eq!(st.take_unthrown(), Some(external("a")));
        assert_eq!(st.take_unthrown(), None);

        assert_eq!(st.record(internal("b")), Recorded::Superseded);
        assert_eq!(st.take_unthrown(), Some(internal("b")));
        assert_eq!(st.take_unthrown(), None);

        assert_eq!(st.record(internal("c")), Recorded::Ignored);
        assert_eq!(st.record(external("d")), Recorded::Ignored);
    }

    #[test]
    fn test_nothing_recorded_is_not_marked_thrown() {
        let mut st = ExceptionalState::default();
        assert_eq!(st.take_unthrown(), None);
        st.record(external("a"));
        assert_eq!(st.take_unthrown(), Some(external("a")));
    }
}
