//! Change significance filter.
//!
//! Accessibility hosts fire many near-duplicate change events (cursor blink,
//! partial redraws). The filter debounces them by comparing the numeric
//! distance between the new snapshot's fingerprint and the last narrated one.
//!
//! This is a crude heuristic, not a content diff: two very different screens
//! can land within the threshold and be suppressed, and two nearly identical
//! ones can land far apart and both be read. It is kept exactly as is so
//! decisions match recorded sessions; see DESIGN.md for the open question.

use narrator_core::config::FilterConfig;
use narrator_core::types::{ScreenFingerprint, ScreenSnapshot};

use crate::fingerprint::snapshot_fingerprint;

/// Outcome of one filter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub accept: bool,
    /// Fingerprint of the snapshot just checked.
    pub fingerprint: ScreenFingerprint,
    /// Distance from the previous fingerprint; `None` on first observation.
    pub distance: Option<i32>,
}

/// Decides whether a new snapshot differs enough to be narrated again.
#[derive(Debug, Clone)]
pub struct ChangeSignificanceFilter {
    threshold: i32,
}

impl Default for ChangeSignificanceFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl ChangeSignificanceFilter {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.threshold)
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Check `snapshot` against the last retained fingerprint.
    ///
    /// The first observation is always accepted. After that a snapshot is
    /// accepted only when its distance strictly exceeds the threshold. The
    /// filter keeps no state; the caller owns `last` and decides whether to
    /// overwrite it.
    pub fn accept(
        &self,
        snapshot: &ScreenSnapshot,
        last: Option<ScreenFingerprint>,
    ) -> FilterDecision {
        let fingerprint = snapshot_fingerprint(snapshot);
        match last {
            None => FilterDecision {
                accept: true,
                fingerprint,
                distance: None,
            },
            Some(previous) => {
                let distance = fingerprint.distance(previous);
                FilterDecision {
                    accept: distance > self.threshold,
                    fingerprint,
                    distance: Some(distance),
                }
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
    use crate::fingerprint::fingerprint;

    fn snapshot(text: &str) -> ScreenSnapshot {
        ScreenSnapshot::new(text.to_string())
    }

    #[test]
    fn test_first_observation_always_accepted() {
        let filter = ChangeSignificanceFilter::default();
        let decision = filter.accept(&snapshot("Hello. World. "), None);
        assert!(decision.accept);
        assert_eq!(decision.distance, None);
        assert_eq!(decision.fingerprint, fingerprint("Hello. World."));
    }

    #[test]
    fn test_identical_snapshot_rejected() {
        let filter = ChangeSignificanceFilter::default();
        let first = filter.accept(&snapshot("Inbox. 3 unread. "), None);
        let second = filter.accept(&snapshot("Inbox. 3 unread. "), Some(first.fingerprint));
        assert!(!second.accept);
        assert_eq!(second.distance, Some(0));
    }

    #[test]
    fn test_close_hash_rejected() {
        let filter = ChangeSignificanceFilter::default();
        let last = fingerprint("Hello. World.");
        let decision = filter.accept(&snapshot("Hello. World!"), Some(last));
        assert!(!decision.accept);
        assert_eq!(decision.distance, Some(13));
    }

    #[test]
    fn test_far_hash_accepted() {
        let filter = ChangeSignificanceFilter::default();
        let last = fingerprint("Hello. World.");
        let decision = filter.accept(&snapshot("Settings. Wi-Fi. Bluetooth. "), Some(last));
        assert!(decision.accept);
        assert!(decision.distance.unwrap() > 50);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let filter = ChangeSignificanceFilter::new(50);
        // "a" hashes to 97; a previous fingerprint 50 away sits on the boundary.
        let on_boundary = filter.accept(&snapshot("a"), Some(ScreenFingerprint(47)));
        assert_eq!(on_boundary.distance, Some(50));
        assert!(!on_boundary.accept);

        let past_boundary = filter.accept(&snapshot("a"), Some(ScreenFingerprint(46)));
        assert_eq!(past_boundary.distance, Some(51));
        assert!(past_boundary.accept);
    }

    #[test]
    fn test_different_text_within_threshold_is_suppressed() {
        // Known weakness: unrelated-looking text, nearby hash.
        let filter = ChangeSignificanceFilter::default();
        let last = fingerprint("Aa");
        let decision = filter.accept(&snapshot("BB"), Some(last));
        assert_eq!(decision.distance, Some(0));
        assert!(!decision.accept);
    }

    #[test]
    fn test_wrapped_min_distance_is_suppressed() {
        let filter = ChangeSignificanceFilter::default();
        // fingerprint("") is 0; 0 - MIN wraps to MIN which is never > threshold.
        let decision = filter.accept(&snapshot(""), Some(ScreenFingerprint(i32::MIN)));
        assert_eq!(decision.distance, Some(i32::MIN));
        assert!(!decision.accept);
    }

    #[test]
    fn test_custom_threshold_from_config() {
        let filter = ChangeSignificanceFilter::from_config(&FilterConfig { threshold: 5 });
        assert_eq!(filter.threshold(), 5);
        let last = fingerprint("Hello. World.");
        assert!(filter.accept(&snapshot("Hello. World!"), Some(last)).accept);
    }
}
