use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{HostEventKind, QueueMode, ScreenFingerprint, Timestamp, UtteranceTag};

/// Decisions and lifecycle changes observed by the narrator.
///
/// Emitted by the coordinator on every narration decision and consumed by:
/// - The replay binary (printed as a decision log)
/// - Tests (to assert why speech did or did not happen)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum NarrationEvent {
    // =========================================================================
    // Lifecycle Events
    // =========================================================================
    /// The host connected the service; device creation was requested.
    ServiceConnected { timestamp: Timestamp },

    /// The speech device reported ready and was configured.
    DeviceReady {
        voice: Option<String>,
        timestamp: Timestamp,
    },

    /// The speech device could not be created. Reported once.
    DeviceInitFailed {
        reason: String,
        timestamp: Timestamp,
    },

    /// Playback was interrupted at the host's request.
    Interrupted { timestamp: Timestamp },

    /// The service was torn down and the device released.
    ServiceDestroyed { timestamp: Timestamp },

    // =========================================================================
    // Screen Events
    // =========================================================================
    /// The active window had no root to read.
    HostUnavailable {
        kind: HostEventKind,
        timestamp: Timestamp,
    },

    /// The active window had no visible text.
    EmptyExtraction {
        kind: HostEventKind,
        timestamp: Timestamp,
    },

    /// A new screen passed the significance filter.
    ScreenAccepted {
        fingerprint: ScreenFingerprint,
        /// `None` on the first observation.
        distance: Option<i32>,
        text_length: usize,
        timestamp: Timestamp,
    },

    /// A screen was too close to the last narrated one.
    ScreenSuppressed {
        fingerprint: ScreenFingerprint,
        distance: i32,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Speech Events
    // =========================================================================
    /// A text-changed event produced a typing echo.
    TypingEchoed {
        text_length: usize,
        timestamp: Timestamp,
    },

    /// An utterance reached the device.
    UtteranceDispatched {
        utterance_id: Uuid,
        tag: UtteranceTag,
        mode: QueueMode,
        timestamp: Timestamp,
    },

    /// An utterance was dropped by the ready gate.
    UtteranceDropped {
        utterance_id: Uuid,
        tag: UtteranceTag,
        reason: String,
        timestamp: Timestamp,
    },
}

impl NarrationEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            NarrationEvent::ServiceConnected { timestamp }
            | NarrationEvent::DeviceReady { timestamp, .. }
            | NarrationEvent::DeviceInitFailed { timestamp, .. }
            | NarrationEvent::Interrupted { timestamp }
            | NarrationEvent::ServiceDestroyed { timestamp }
            | NarrationEvent::HostUnavailable { timestamp, .. }
            | NarrationEvent::EmptyExtraction { timestamp, .. }
            | NarrationEvent::ScreenAccepted { timestamp, .. }
            | NarrationEvent::ScreenSuppressed { timestamp, .. }
            | NarrationEvent::TypingEchoed { timestamp, .. }
            | NarrationEvent::UtteranceDispatched { timestamp, .. }
            | NarrationEvent::UtteranceDropped { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            NarrationEvent::ServiceConnected { .. } => "service_connected",
            NarrationEvent::DeviceReady { .. } => "device_ready",
            NarrationEvent::DeviceInitFailed { .. } => "device_init_failed",
            NarrationEvent::Interrupted { .. } => "interrupted",
            NarrationEvent::ServiceDestroyed { .. } => "service_destroyed",
            NarrationEvent::HostUnavailable { .. } => "host_unavailable",
            NarrationEvent::EmptyExtraction { .. } => "empty_extraction",
            NarrationEvent::ScreenAccepted { .. } => "screen_accepted",
            NarrationEvent::ScreenSuppressed { .. } => "screen_suppressed",
            NarrationEvent::TypingEchoed { .. } => "typing_echoed",
            NarrationEvent::UtteranceDispatched { .. } => "utterance_dispatched",
            NarrationEvent::UtteranceDropped { .. } => "utterance_dropped",
        }
    }
}
