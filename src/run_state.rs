//! Run State Machine
//!
//! Authoritative record of where a provisioning run is. Transitions are
//! validated so the orchestrator cannot move backwards through the plan or
//! resume a finished run.
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted ──(privilege check fails)──> Aborted
//!     ↓
//! Running(SystemPreparation)
//!     ↓   (forward only, one phase at a time or more)
//! Running(DaemonConfiguration)
//!     ↓
//! Completed
//! ```
//!
//! There is no retry and no rollback state: a failed step is recorded in the
//! report and the run moves on.

use std::fmt;
use thiserror::Error;

use crate::plan::Phase;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    /// Nothing has happened yet
    NotStarted,
    /// Executing steps of the given phase
    Running(Phase),
    /// Every step of the plan has been visited (terminal)
    Completed,
    /// Fatal precondition failed before any step ran (terminal)
    Aborted,
}

impl RunStage {
    /// Returns true if this is a terminal state (Completed or Aborted)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not started"),
            Self::Running(phase) => write!(f, "Running: {}", phase),
            Self::Completed => write!(f, "Completed"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunTransitionError {
    /// Attempted to revisit an earlier phase
    #[error("Cannot go backwards from {from} to {to} (runs are forward-only)")]
    BackwardTransition { from: Phase, to: Phase },

    /// Attempted to transition from a terminal state
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: RunStage },

    /// Abort is only legal before the first step
    #[error("Cannot abort once running (currently {from})")]
    AbortAfterStart { from: RunStage },
}

/// Tracks a run's stage and its transition history.
///
/// # Example
///
/// ```
/// use ptero_install::plan::Phase;
/// use ptero_install::run_state::{RunStage, RunTracker};
///
/// let mut tracker = RunTracker::new();
/// tracker.enter_phase(Phase::SystemPreparation).unwrap();
/// tracker.enter_phase(Phase::Firewall).unwrap();
///
/// // Cannot go back
/// assert!(tracker.enter_phase(Phase::SystemPreparation).is_err());
///
/// tracker.complete().unwrap();
/// assert_eq!(tracker.current(), RunStage::Completed);
/// ```
#[derive(Debug, Clone)]
pub struct RunTracker {
    current: RunStage,
    /// Stages entered, with unix timestamps
    history: Vec<(RunStage, u64)>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    /// Create a tracker in the NotStarted state
    pub fn new() -> Self {
        Self {
            current: RunStage::NotStarted,
            history: Vec::new(),
        }
    }

    /// Returns the current stage
    #[inline]
    pub fn current(&self) -> RunStage {
        self.current
    }

    /// Returns the stage history as (stage, timestamp) pairs
    pub fn history(&self) -> &[(RunStage, u64)] {
        &self.history
    }

    /// Enter `phase`.
    ///
    /// Re-entering the current phase is a no-op; jumping ahead past phases
    /// with no steps is allowed.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if the run is Completed or Aborted
    /// - `BackwardTransition` if `phase` precedes the current phase
    pub fn enter_phase(&mut self, phase: Phase) -> Result<RunStage, RunTransitionError> {
        match self.current {
            stage if stage.is_terminal() => {
                Err(RunTransitionError::FromTerminalState { from: stage })
            }
            RunStage::Running(current) if current == phase => Ok(self.current),
            RunStage::Running(current) if phase.order() < current.order() => {
                Err(RunTransitionError::BackwardTransition {
                    from: current,
                    to: phase,
                })
            }
            _ => {
                self.transition(RunStage::Running(phase));
                Ok(self.current)
            }
        }
    }

    /// Mark the run as completed.
    ///
    /// # Errors
    ///
    /// `FromTerminalState` if already Completed or Aborted.
    pub fn complete(&mut self) -> Result<(), RunTransitionError> {
        if self.current.is_terminal() {
            return Err(RunTransitionError::FromTerminalState { from: self.current });
        }
        self.transition(RunStage::Completed);
        Ok(())
    }

    /// Abort before any step has run.
    ///
    /// # Errors
    ///
    /// `AbortAfterStart` unless the run is still NotStarted.
    pub fn abort(&mut self) -> Result<(), RunTransitionError> {
        if self.current != RunStage::NotStarted {
            return Err(RunTransitionError::AbortAfterStart { from: self.current });
        }
        self.transition(RunStage::Aborted);
        Ok(())
    }

    fn transition(&mut self, stage: RunStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        tracing::debug!("Run stage: {} -> {}", self.current, stage);
        self.history.push((stage, timestamp));
        self.current = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tracker_starts_not_started() {
        let tracker = RunTracker::new();
        assert_eq!(tracker.current(), RunStage::NotStarted);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_walk_all_phases_then_complete() {
        let mut tracker = RunTracker::new();
        for phase in Phase::iter() {
            tracker.enter_phase(phase).expect("forward transition");
        }
        tracker.complete().expect("complete");

        assert_eq!(tracker.current(), RunStage::Completed);
        assert_eq!(tracker.history().len(), Phase::iter().count() + 1);
    }

    #[test]
    fn test_reentering_phase_is_noop() {
        let mut tracker = RunTracker::new();
        tracker.enter_phase(Phase::ContainerRuntime).expect("enter");
        tracker.enter_phase(Phase::ContainerRuntime).expect("re-enter");
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn test_cannot_go_backwards() {
        let mut tracker = RunTracker::new();
        tracker.enter_phase(Phase::PanelDatabase).expect("enter");
        let err = tracker.enter_phase(Phase::Firewall).unwrap_err();
        assert!(matches!(err, RunTransitionError::BackwardTransition { .. }));
        assert!(err.to_string().contains("Cannot go backwards"));
    }

    #[test]
    fn test_abort_only_before_start() {
        let mut tracker = RunTracker::new();
        tracker.abort().expect("abort from NotStarted");
        assert_eq!(tracker.current(), RunStage::Aborted);

        let err = tracker.enter_phase(Phase::SystemPreparation).unwrap_err();
        assert!(matches!(err, RunTransitionError::FromTerminalState { .. }));

        let mut running = RunTracker::new();
        running.enter_phase(Phase::SystemPreparation).expect("enter");
        let err = running.abort().unwrap_err();
        assert!(matches!(err, RunTransitionError::AbortAfterStart { .. }));
    }

    #[test]
    fn test_cannot_complete_twice() {
        let mut tracker = RunTracker::new();
        tracker.complete().expect("empty plan completes");
        assert!(tracker.complete().is_err());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(RunStage::NotStarted.to_string(), "Not started");
        assert_eq!(
            RunStage::Running(Phase::Tls).to_string(),
            "Running: TLS issuance"
        );
    }
}
