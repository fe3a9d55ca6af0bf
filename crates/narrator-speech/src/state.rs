//! Speech device state machine with lock-free transitions.
//!
//! Enforces valid state transitions for the device lifecycle:
//! - Uninitialized -> Initializing (device creation requested)
//! - Initializing -> Ready (creation callback reported success)
//! - Initializing -> Error (creation callback reported failure)
//! - any -> Released (device shut down; terminal)
//!
//! The Ready transition is written by the init-completion path, which may run
//! on a different thread than event delivery, and is read before every speak.
//! The state lives in an atomic so that read needs no lock.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use narrator_core::error::NarratorError;

/// Lifecycle state of the speech device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SpeechDeviceState {
    /// No device has been requested yet.
    Uninitialized = 0,
    /// Creation requested; waiting for the engine's callback.
    Initializing = 1,
    /// Configured and accepting utterances.
    Ready = 2,
    /// Creation failed. Never retried.
    Error = 3,
    /// Device released. Nothing is spoken again.
    Released = 4,
}

impl fmt::Display for SpeechDeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechDeviceState::Uninitialized => write!(f, "Uninitialized"),
            SpeechDeviceState::Initializing => write!(f, "Initializing"),
            SpeechDeviceState::Ready => write!(f, "Ready"),
            SpeechDeviceState::Error => write!(f, "Error"),
            SpeechDeviceState::Released => write!(f, "Released"),
        }
    }
}

impl SpeechDeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SpeechDeviceState::Uninitialized,
            1 => SpeechDeviceState::Initializing,
            2 => SpeechDeviceState::Ready,
            3 => SpeechDeviceState::Error,
            _ => SpeechDeviceState::Released,
        }
    }

    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SpeechDeviceState) -> bool {
        matches!(
            (self, target),
            (SpeechDeviceState::Uninitialized, SpeechDeviceState::Initializing)
                | (SpeechDeviceState::Initializing, SpeechDeviceState::Ready)
                | (SpeechDeviceState::Initializing, SpeechDeviceState::Error)
                // Shutdown
                | (SpeechDeviceState::Uninitialized, SpeechDeviceState::Released)
                | (SpeechDeviceState::Initializing, SpeechDeviceState::Released)
                | (SpeechDeviceState::Ready, SpeechDeviceState::Released)
                | (SpeechDeviceState::Error, SpeechDeviceState::Released)
        )
    }
}

/// Shared, lock-free cell holding the device state.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct DeviceStateCell {
    state: Arc<AtomicU8>,
}

impl Default for DeviceStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStateCell {
    /// Create a new cell initialized to `Uninitialized`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(SpeechDeviceState::Uninitialized as u8)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> SpeechDeviceState {
        SpeechDeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The ready gate checked before every utterance.
    pub fn is_ready(&self) -> bool {
        self.current() == SpeechDeviceState::Ready
    }

    /// Attempt to transition to the target state.
    ///
    /// Returns the state that was replaced, or an `NarratorError::Speech`
    /// if the transition is not allowed from the current state.
    pub fn transition(&self, target: SpeechDeviceState) -> Result<SpeechDeviceState, NarratorError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = SpeechDeviceState::from_u8(current);
            if !from.can_transition_to(&target) {
                return Err(NarratorError::Speech(format!(
                    "Invalid device state transition: {} -> {}",
                    from, target
                )));
            }
            match self.state.compare_exchange(
                current,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    tracing::debug!("Speech device state: {} -> {}", from, target);
                    return Ok(from);
                }
                Err(actual) => current = actual,
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SpeechDeviceState::Uninitialized.to_string(), "Uninitialized");
        assert_eq!(SpeechDeviceState::Initializing.to_string(), "Initializing");
        assert_eq!(SpeechDeviceState::Ready.to_string(), "Ready");
        assert_eq!(SpeechDeviceState::Error.to_string(), "Error");
        assert_eq!(SpeechDeviceState::Released.to_string(), "Released");
    }

    #[test]
    fn test_u8_roundtrip() {
        for state in [
            SpeechDeviceState::Uninitialized,
            SpeechDeviceState::Initializing,
            SpeechDeviceState::Ready,
            SpeechDeviceState::Error,
            SpeechDeviceState::Released,
        ] {
            assert_eq!(SpeechDeviceState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert!(SpeechDeviceState::Uninitialized.can_transition_to(&SpeechDeviceState::Initializing));
        assert!(SpeechDeviceState::Initializing.can_transition_to(&SpeechDeviceState::Ready));
        assert!(SpeechDeviceState::Initializing.can_transition_to(&SpeechDeviceState::Error));
        assert!(SpeechDeviceState::Ready.can_transition_to(&SpeechDeviceState::Released));
        assert!(SpeechDeviceState::Error.can_transition_to(&SpeechDeviceState::Released));
    }

    #[test]
    fn test_invalid_transitions() {
        // Ready only through the init callback
        assert!(!SpeechDeviceState::Uninitialized.can_transition_to(&SpeechDeviceState::Ready));
        // No retry after failure
        assert!(!SpeechDeviceState::Error.can_transition_to(&SpeechDeviceState::Initializing));
        assert!(!SpeechDeviceState::Error.can_transition_to(&SpeechDeviceState::Ready));
        // Released is terminal
        assert!(!SpeechDeviceState::Released.can_transition_to(&SpeechDeviceState::Initializing));
        assert!(!SpeechDeviceState::Released.can_transition_to(&SpeechDeviceState::Released));
        // No self transitions
        assert!(!SpeechDeviceState::Ready.can_transition_to(&SpeechDeviceState::Ready));
    }

    #[test]
    fn test_cell_happy_path() {
        let cell = DeviceStateCell::new();
        assert_eq!(cell.current(), SpeechDeviceState::Uninitialized);
        assert!(!cell.is_ready());

        cell.transition(SpeechDeviceState::Initializing).unwrap();
        assert!(!cell.is_ready());

        let previous = cell.transition(SpeechDeviceState::Ready).unwrap();
        assert_eq!(previous, SpeechDeviceState::Initializing);
        assert!(cell.is_ready());

        cell.transition(SpeechDeviceState::Released).unwrap();
        assert!(!cell.is_ready());
    }

    #[test]
    fn test_cell_invalid_transition_keeps_state() {
        let cell = DeviceStateCell::new();
        let result = cell.transition(SpeechDeviceState::Ready);
        match result {
            Err(NarratorError::Speech(msg)) => {
                assert!(msg.contains("Uninitialized"));
                assert!(msg.contains("Ready"));
            }
            _ => panic!("Expected Speech error variant"),
        }
        assert_eq!(cell.current(), SpeechDeviceState::Uninitialized);
    }

    #[test]
    fn test_cell_clone_is_shared() {
        let cell = DeviceStateCell::new();
        let observer = cell.clone();
        cell.transition(SpeechDeviceState::Initializing).unwrap();
        assert_eq!(observer.current(), SpeechDeviceState::Initializing);
    }

    #[test]
    fn test_ready_published_across_threads() {
        let cell = DeviceStateCell::new();
        cell.transition(SpeechDeviceState::Initializing).unwrap();

        let writer = cell.clone();
        std::thread::spawn(move || {
            writer.transition(SpeechDeviceState::Ready).unwrap();
        })
        .join()
        .unwrap();

        assert!(cell.is_ready());
    }

    #[test]
    fn test_concurrent_release_has_single_winner() {
        let cell = DeviceStateCell::new();
        cell.transition(SpeechDeviceState::Initializing).unwrap();
        cell.transition(SpeechDeviceState::Ready).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || cell.transition(SpeechDeviceState::Released).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(cell.current(), SpeechDeviceState::Released);
    }
}
