//! Accessibility event coordinator.
//!
//! The `AccessibilityEventCoordinator` receives host notifications, reads the
//! focused window, asks the significance filter whether the screen changed
//! enough, and forwards accepted text to the utterance queue controller.
//! Text-changed notifications skip the tree entirely and are echoed
//! immediately.
//!
//! All narrator state (the retained fingerprint, the lifecycle state) lives
//! on the coordinator, so independent instances never interfere.

use tokio::sync::{broadcast, oneshot};

use narrator_core::config::NarratorConfig;
use narrator_core::error::{NarratorError, Result};
use narrator_core::events::NarrationEvent;
use narrator_core::types::{HostEvent, HostEventKind, ScreenFingerprint, Timestamp, Utterance};
use narrator_screen::{ChangeSignificanceFilter, SnapshotReader};
use narrator_speech::{
    DeviceInitStatus, SpeakOutcome, SpeechDevice, SpeechDeviceState, UtteranceQueueController,
};

use crate::host::{AccessibilityHost, AccessibilityService};
use crate::state::CoordinatorState;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Drives narration for one host connection.
pub struct AccessibilityEventCoordinator<H: AccessibilityHost, D: SpeechDevice> {
    host: H,
    speech: UtteranceQueueController<D>,
    reader: SnapshotReader,
    filter: ChangeSignificanceFilter,
    state: CoordinatorState,
    /// Fingerprint of the last accepted screen. Single slot, no history.
    last_fingerprint: Option<ScreenFingerprint>,
    init_announcement: String,
    typing_prefix: String,
    events: broadcast::Sender<NarrationEvent>,
}

impl<H: AccessibilityHost, D: SpeechDevice> std::fmt::Debug for AccessibilityEventCoordinator<H, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessibilityEventCoordinator")
            .field("state", &self.state)
            .field("device_state", &self.speech.state())
            .field("last_fingerprint", &self.last_fingerprint)
            .field("reader", &self.reader)
            .field("filter", &self.filter)
            .finish()
    }
}

impl<H: AccessibilityHost, D: SpeechDevice> AccessibilityEventCoordinator<H, D> {
    /// Create a coordinator in the `Idle` state.
    pub fn new(host: H, device: D, config: &NarratorConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            host,
            speech: UtteranceQueueController::new(device, config.speech.clone()),
            reader: SnapshotReader::from_config(&config.traversal),
            filter: ChangeSignificanceFilter::from_config(&config.filter),
            state: CoordinatorState::Idle,
            last_fingerprint: None,
            init_announcement: config.speech.init_announcement.clone(),
            typing_prefix: config.speech.typing_prefix.clone(),
            events,
        }
    }

    /// Subscribe to the narration decision log.
    pub fn subscribe(&self) -> broadcast::Receiver<NarrationEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn last_fingerprint(&self) -> Option<ScreenFingerprint> {
        self.last_fingerprint
    }

    pub fn speech(&self) -> &UtteranceQueueController<D> {
        &self.speech
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn set_state(&mut self, target: CoordinatorState) -> Result<()> {
        let previous = self.state;
        self.state = previous.advance(target)?;
        tracing::debug!(from = %previous, to = %target, "Coordinator state changed");
        Ok(())
    }

    fn emit(&self, event: NarrationEvent) {
        tracing::debug!(event = event.event_name(), "Narration decision");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn dispatch(&self, utterance: Utterance) {
        let outcome = self.speech.speak(&utterance);
        let timestamp = Timestamp::now();
        let event = match outcome {
            SpeakOutcome::Dispatched => NarrationEvent::UtteranceDispatched {
                utterance_id: utterance.id,
                tag: utterance.tag,
                mode: utterance.mode,
                timestamp,
            },
            SpeakOutcome::DroppedNotReady(state) => NarrationEvent::UtteranceDropped {
                utterance_id: utterance.id,
                tag: utterance.tag,
                reason: format!("device {}", state),
                timestamp,
            },
            SpeakOutcome::Failed => NarrationEvent::UtteranceDropped {
                utterance_id: utterance.id,
                tag: utterance.tag,
                reason: "device rejected utterance".to_string(),
                timestamp,
            },
        };
        self.emit(event);
    }

    /// Read the focused window and narrate it if it changed enough.
    ///
    /// The fingerprint advances on every accepted screen, whether or not the
    /// device is ready to speak it.
    fn narrate_screen(&mut self) -> Result<()> {
        let snapshot = {
            let root = self.host.active_root().ok_or(NarratorError::HostUnavailable)?;
            self.reader.extract(Some(&root))
        };
        if snapshot.is_empty() {
            return Err(NarratorError::EmptyExtraction);
        }

        let decision = self.filter.accept(&snapshot, self.last_fingerprint);
        if !decision.accept {
            tracing::debug!(
                fingerprint = %decision.fingerprint,
                distance = decision.distance.unwrap_or_default(),
                "Screen change below threshold"
            );
            self.emit(NarrationEvent::ScreenSuppressed {
                fingerprint: decision.fingerprint,
                distance: decision.distance.unwrap_or_default(),
                timestamp: Timestamp::now(),
            });
            return Ok(());
        }

        self.last_fingerprint = Some(decision.fingerprint);
        let text = snapshot.narration();
        tracing::debug!(
            fingerprint = %decision.fingerprint,
            distance = ?decision.distance,
            text_len = text.len(),
            "Screen change accepted"
        );
        self.emit(NarrationEvent::ScreenAccepted {
            fingerprint: decision.fingerprint,
            distance: decision.distance,
            text_length: text.len(),
            timestamp: Timestamp::now(),
        });
        self.dispatch(Utterance::update(text));
        Ok(())
    }

    /// Echo a keystroke from the event payload. Bypasses the filter.
    fn echo_typing(&self, event: &HostEvent) {
        let Some(typed) = event.typed_text() else {
            tracing::trace!("Text change without text");
            return;
        };
        self.emit(NarrationEvent::TypingEchoed {
            text_length: typed.len(),
            timestamp: Timestamp::now(),
        });
        self.dispatch(Utterance::update(format!("{}{}", self.typing_prefix, typed)));
    }

    fn handle_screen_event(&mut self, kind: HostEventKind) {
        match self.narrate_screen() {
            Ok(()) => {}
            Err(NarratorError::HostUnavailable) => {
                tracing::debug!(kind = %kind, "No active root, nothing to narrate");
                self.emit(NarrationEvent::HostUnavailable {
                    kind,
                    timestamp: Timestamp::now(),
                });
            }
            Err(NarratorError::EmptyExtraction) => {
                tracing::debug!(kind = %kind, "Active window has no visible text");
                self.emit(NarrationEvent::EmptyExtraction {
                    kind,
                    timestamp: Timestamp::now(),
                });
            }
            Err(e) => tracing::warn!(kind = %kind, error = %e, "Screen narration failed"),
        }
    }
}

impl<H: AccessibilityHost, D: SpeechDevice> AccessibilityService for AccessibilityEventCoordinator<H, D> {
    fn on_connected(&mut self) -> Option<oneshot::Receiver<DeviceInitStatus>> {
        if self.speech.state() == SpeechDeviceState::Released {
            tracing::warn!("Service reconnected after teardown; staying silent");
            return None;
        }
        if let Err(e) = self.set_state(CoordinatorState::AwaitingInit) {
            tracing::debug!(error = %e, "Duplicate connect ignored");
            return None;
        }
        tracing::info!("Accessibility service connected");
        self.emit(NarrationEvent::ServiceConnected {
            timestamp: Timestamp::now(),
        });
        self.speech.initialize()
    }

    fn on_device_init(&mut self, status: DeviceInitStatus) {
        match self.speech.complete_initialization(status) {
            Ok(voice) => {
                if let Err(e) = self.set_state(CoordinatorState::Active) {
                    tracing::warn!(error = %e, "Device ready outside of AwaitingInit");
                    return;
                }
                self.emit(NarrationEvent::DeviceReady {
                    voice: voice.map(|v| v.name),
                    timestamp: Timestamp::now(),
                });
                self.dispatch(Utterance::announcement(self.init_announcement.clone()));
            }
            Err(NarratorError::DeviceInitFailure(reason)) => {
                self.emit(NarrationEvent::DeviceInitFailed {
                    reason,
                    timestamp: Timestamp::now(),
                });
            }
            Err(e) => tracing::debug!(error = %e, "Device init completion ignored"),
        }
    }

    fn on_event(&mut self, event: &HostEvent) {
        if self.state == CoordinatorState::Idle {
            tracing::trace!(kind = %event.kind, "Event ignored while idle");
            return;
        }
        if event.kind.is_content_class() {
            self.handle_screen_event(event.kind);
        } else {
            self.echo_typing(event);
        }
    }

    fn on_interrupt(&mut self) {
        self.speech.interrupt();
        self.emit(NarrationEvent::Interrupted {
            timestamp: Timestamp::now(),
        });
    }

    fn on_destroy(&mut self) {
        if self.speech.state() == SpeechDeviceState::Released {
            tracing::debug!("Service already destroyed");
            return;
        }
        self.speech.shutdown();
        if self.state != CoordinatorState::Idle {
            // Every non-idle state may return to Idle.
            let _ = self.set_state(CoordinatorState::Idle);
        }
        tracing::info!("Accessibility service destroyed");
        self.emit(NarrationEvent::ServiceDestroyed {
            timestamp: Timestamp::now(),
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
