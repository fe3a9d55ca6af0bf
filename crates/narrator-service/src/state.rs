//! Coordinator lifecycle states.
//!
//! The coordinator owns its state outright and is driven one signal at a
//! time, so no lock is involved. Valid transitions:
//! - Idle -> AwaitingInit (host connected the service)
//! - AwaitingInit -> Active (speech device ready)
//! - AwaitingInit -> Idle (torn down before the device was ready)
//! - Active -> Idle (torn down)

use std::fmt;

use narrator_core::error::NarratorError;

/// Operational state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// Not connected, or torn down.
    Idle,
    /// Connected; waiting for the speech device. Events are still read and
    /// filtered but nothing is spoken.
    AwaitingInit,
    /// Narrating.
    Active,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorState::Idle => write!(f, "Idle"),
            CoordinatorState::AwaitingInit => write!(f, "AwaitingInit"),
            CoordinatorState::Active => write!(f, "Active"),
        }
    }
}

impl CoordinatorState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &CoordinatorState) -> bool {
        matches!(
            (self, target),
            (CoordinatorState::Idle, CoordinatorState::AwaitingInit)
                | (CoordinatorState::AwaitingInit, CoordinatorState::Active)
                // Teardown transitions
                | (CoordinatorState::AwaitingInit, CoordinatorState::Idle)
                | (CoordinatorState::Active, CoordinatorState::Idle)
        )
    }

    /// The state after moving to `target`, or a `Coordinator` error naming
    /// both ends when that move is not allowed.
    pub fn advance(self, target: CoordinatorState) -> Result<CoordinatorState, NarratorError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(NarratorError::Coordinator(format!(
                "Invalid state transition: {} -> {}",
                self, target
            )))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
