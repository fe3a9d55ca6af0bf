//! Utterance queue controller.
//!
//! The `UtteranceQueueController` owns the single speech device handle and
//! is the only path to it. It drives the device through its lifecycle, applies
//! voice configuration once the device reports ready, and enforces the ready
//! gate: utterances submitted while the device is not `Ready` are dropped,
//! never buffered, because narration of a screen that has since changed is
//! worse than silence.

use tokio::sync::oneshot;

use narrator_core::config::SpeechConfig;
use narrator_core::error::{NarratorError, Result};
use narrator_core::types::{QueueMode, Utterance, UtteranceTag, VoiceInfo};

use crate::device::{DeviceInitStatus, SpeechDevice};
use crate::state::{DeviceStateCell, SpeechDeviceState};
use crate::voice::voice_settings;

/// What happened to a submitted utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Handed to the device.
    Dispatched,
    /// Dropped by the ready gate; the device was in the given state.
    DroppedNotReady(SpeechDeviceState),
    /// The device refused the utterance.
    Failed,
}

impl SpeakOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, SpeakOutcome::Dispatched)
    }
}

/// Arbitrates narration and typing echo over one speech device.
#[derive(Debug)]
pub struct UtteranceQueueController<D: SpeechDevice> {
    device: D,
    state: DeviceStateCell,
    config: SpeechConfig,
}

impl<D: SpeechDevice> UtteranceQueueController<D> {
    /// Create a controller in the `Uninitialized` state.
    pub fn new(device: D, config: SpeechConfig) -> Self {
        Self {
            device,
            state: DeviceStateCell::new(),
            config,
        }
    }

    /// Returns the current device state.
    pub fn state(&self) -> SpeechDeviceState {
        self.state.current()
    }

    /// A shared handle on the device state, for observers on other threads.
    pub fn state_cell(&self) -> DeviceStateCell {
        self.state.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Request device creation.
    ///
    /// Returns the receiver for the engine's completion callback, or `None`
    /// if creation was already requested (or the device was shut down).
    pub fn initialize(&self) -> Option<oneshot::Receiver<DeviceInitStatus>> {
        if let Err(e) = self.state.transition(SpeechDeviceState::Initializing) {
            tracing::debug!(error = %e, "Speech device initialization skipped");
            return None;
        }
        tracing::info!("Speech device creation requested");
        Some(self.device.create())
    }

    /// Apply the engine's completion callback.
    ///
    /// On success the device is configured and then published as `Ready`;
    /// the selected voice is returned (`None` means the device default). On
    /// failure the device moves to `Error` for good.
    pub fn complete_initialization(&self, status: DeviceInitStatus) -> Result<Option<VoiceInfo>> {
        match self.state.current() {
            SpeechDeviceState::Initializing => {}
            SpeechDeviceState::Released => return Err(NarratorError::ShuttingDown),
            other => {
                return Err(NarratorError::Speech(format!(
                    "Unexpected init completion in state {}",
                    other
                )))
            }
        }

        match status {
            DeviceInitStatus::Success => {
                let settings = voice_settings(&self.config, &self.device.voices());
                if let Err(e) = self.device.configure(&settings) {
                    tracing::warn!(error = %e, "Speech device configuration failed, using device defaults");
                }
                // Configure first so nothing reaches an unconfigured device.
                self.state
                    .transition(SpeechDeviceState::Ready)
                    .map_err(|_| NarratorError::ShuttingDown)?;
                tracing::info!(
                    locale = %settings.locale,
                    rate = settings.rate,
                    pitch = settings.pitch,
                    voice = settings.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
                    "Speech device ready"
                );
                Ok(settings.voice)
            }
            DeviceInitStatus::Failure(reason) => {
                // Fails only if shutdown won the race, which is fine.
                let _ = self.state.transition(SpeechDeviceState::Error);
                tracing::warn!(reason = %reason, "Speech device initialization failed; narration disabled");
                Err(NarratorError::DeviceInitFailure(reason))
            }
        }
    }

    /// Wait for the completion callback from [`initialize`](Self::initialize)
    /// and apply it. A dropped callback counts as a failure.
    pub async fn await_ready(
        &self,
        init: oneshot::Receiver<DeviceInitStatus>,
    ) -> Result<Option<VoiceInfo>> {
        let status = init.await.unwrap_or_else(|_| {
            DeviceInitStatus::Failure("device dropped its init callback".to_string())
        });
        self.complete_initialization(status)
    }

    /// Submit an utterance through the ready gate.
    pub fn speak(&self, utterance: &Utterance) -> SpeakOutcome {
        let state = self.state.current();
        if state != SpeechDeviceState::Ready {
            tracing::debug!(
                utterance_id = %utterance.id,
                tag = %utterance.tag,
                state = %state,
                "Utterance dropped, device not ready"
            );
            return SpeakOutcome::DroppedNotReady(state);
        }

        match self.device.enqueue(utterance) {
            Ok(()) => {
                tracing::debug!(
                    utterance_id = %utterance.id,
                    tag = %utterance.tag,
                    mode = %utterance.mode,
                    text_len = utterance.text.len(),
                    "Utterance dispatched"
                );
                SpeakOutcome::Dispatched
            }
            Err(e) => {
                tracing::warn!(utterance_id = %utterance.id, error = %e, "Speech device rejected utterance");
                SpeakOutcome::Failed
            }
        }
    }

    /// Speak `text` in `mode`; appended speech is tagged INIT, flushed UPDATE.
    pub fn speak_text(&self, text: &str, mode: QueueMode) -> SpeakOutcome {
        let tag = match mode {
            QueueMode::Append => UtteranceTag::Init,
            QueueMode::Flush => UtteranceTag::Update,
        };
        self.speak(&Utterance::new(text, mode, tag))
    }

    /// Stop current and queued playback. Safe to call in any state.
    pub fn interrupt(&self) {
        if !self.state.is_ready() {
            tracing::debug!(state = %self.state.current(), "Interrupt ignored, device not ready");
            return;
        }
        match self.device.stop() {
            Ok(()) => tracing::debug!("Speech interrupted"),
            Err(e) => tracing::warn!(error = %e, "Failed to stop speech device"),
        }
    }

    /// Release the device. Later `speak` calls are dropped. Idempotent.
    pub fn shutdown(&self) {
        let previous = match self.state.transition(SpeechDeviceState::Released) {
            Ok(previous) => previous,
            Err(_) => {
                tracing::debug!("Speech device already released");
                return;
            }
        };
        if previous == SpeechDeviceState::Uninitialized {
            return;
        }
        match self.device.release() {
            Ok(()) => tracing::info!("Speech device released"),
            Err(e) => tracing::warn!(error = %e, "Failed to release speech device"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, MockSpeechDevice};

    fn controller(device: &MockSpeechDevice) -> UtteranceQueueController<MockSpeechDevice> {
        UtteranceQueueController::new(device.clone(), SpeechConfig::default())
    }

    async fn ready_controller(device: &MockSpeechDevice) -> UtteranceQueueController<MockSpeechDevice> {
        let controller = controller(device);
        let rx = controller.initialize().unwrap();
        controller.await_ready(rx).await.unwrap();
        controller
    }

    #[test]
    fn test_initial_state() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        assert_eq!(controller.state(), SpeechDeviceState::Uninitialized);
        assert!(!controller.is_ready());
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_success_configures_then_ready() {
        let device = MockSpeechDevice::ready().with_voices(vec![
            VoiceInfo::new("low", "en", 100),
            VoiceInfo::new("high", "en", 400),
        ]);
        let controller = controller(&device);

        let rx = controller.initialize().unwrap();
        assert_eq!(controller.state(), SpeechDeviceState::Initializing);

        let voice = controller.await_ready(rx).await.unwrap();
        assert_eq!(voice.unwrap().name, "high");
        assert_eq!(controller.state(), SpeechDeviceState::Ready);

        let settings = device.configured().unwrap();
        assert_eq!(settings.locale, "en-IN");
        assert_eq!(settings.voice.unwrap().name, "high");
    }

    #[tokio::test]
    async fn test_initialize_without_good_voice_uses_default() {
        let device = MockSpeechDevice::ready().with_voices(vec![VoiceInfo::new("low", "en", 100)]);
        let controller = ready_controller(&device).await;
        assert!(controller.is_ready());
        assert!(device.configured().unwrap().voice.is_none());
    }

    #[tokio::test]
    async fn test_initialize_failure_moves_to_error() {
        let device = MockSpeechDevice::with_auto_init(DeviceInitStatus::Failure("no tts".into()));
        let controller = controller(&device);
        let rx = controller.initialize().unwrap();

        let result = controller.await_ready(rx).await;
        assert!(matches!(result, Err(NarratorError::DeviceInitFailure(ref r)) if r == "no tts"));
        assert_eq!(controller.state(), SpeechDeviceState::Error);
        assert!(device.configured().is_none());

        // All speech is a no-op from here on.
        assert_eq!(
            controller.speak(&Utterance::update("hello")),
            SpeakOutcome::DroppedNotReady(SpeechDeviceState::Error)
        );
        assert!(device.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_init_callback_is_failure() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        let _pending = controller.initialize().unwrap();

        // An engine that drops its callback without resolving it.
        let (sender, receiver) = oneshot::channel::<DeviceInitStatus>();
        drop(sender);

        let result = controller.await_ready(receiver).await;
        assert!(matches!(result, Err(NarratorError::DeviceInitFailure(_))));
        assert_eq!(controller.state(), SpeechDeviceState::Error);
    }

    #[test]
    fn test_initialize_twice_is_noop() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        assert!(controller.initialize().is_some());
        assert!(controller.initialize().is_none());
        assert_eq!(device.calls(), vec![DeviceCall::Create]);
    }

    #[test]
    fn test_speak_before_ready_is_dropped() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        assert_eq!(
            controller.speak(&Utterance::update("early")),
            SpeakOutcome::DroppedNotReady(SpeechDeviceState::Uninitialized)
        );

        let _rx = controller.initialize().unwrap();
        assert_eq!(
            controller.speak(&Utterance::update("still early")),
            SpeakOutcome::DroppedNotReady(SpeechDeviceState::Initializing)
        );
        assert!(device.submitted().is_empty());
    }

    #[test]
    fn test_speak_effective_immediately_after_ready() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        let _rx = controller.initialize().unwrap();
        controller.speak(&Utterance::update("dropped"));

        controller
            .complete_initialization(DeviceInitStatus::Success)
            .unwrap();
        assert!(controller.speak(&Utterance::update("heard")).is_dispatched());

        // The dropped utterance is not replayed.
        assert_eq!(device.submitted_texts(), vec!["heard"]);
    }

    #[tokio::test]
    async fn test_flush_preempts_playing_utterance() {
        let device = MockSpeechDevice::ready();
        let controller = ready_controller(&device).await;

        controller.speak_text("A", QueueMode::Append);
        assert_eq!(device.playing().unwrap().text, "A");

        controller.speak_text("B", QueueMode::Flush);
        device.drain();

        let completed: Vec<String> = device.completed().into_iter().map(|u| u.text).collect();
        assert_eq!(completed, vec!["B"]);
    }

    #[tokio::test]
    async fn test_append_preserves_fifo() {
        let device = MockSpeechDevice::ready();
        let controller = ready_controller(&device).await;

        for text in ["one", "two", "three"] {
            controller.speak_text(text, QueueMode::Append);
        }
        device.drain();

        let completed: Vec<String> = device.completed().into_iter().map(|u| u.text).collect();
        assert_eq!(completed, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_speak_text_tags_by_mode() {
        let device = MockSpeechDevice::ready();
        let controller = ready_controller(&device).await;

        controller.speak_text("hi", QueueMode::Append);
        controller.speak_text("update", QueueMode::Flush);

        let submitted = device.submitted();
        assert_eq!(submitted[0].tag, UtteranceTag::Init);
        assert_eq!(submitted[1].tag, UtteranceTag::Update);
    }

    #[tokio::test]
    async fn test_interrupt_stops_playback_and_is_idempotent() {
        let device = MockSpeechDevice::ready();
        let controller = ready_controller(&device).await;

        controller.speak_text("long narration", QueueMode::Flush);
        controller.interrupt();
        controller.interrupt();
        assert!(device.playing().is_none());
        assert!(controller.is_ready());
    }

    #[test]
    fn test_interrupt_before_ready_is_noop() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        controller.interrupt();
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_releases_once() {
        let device = MockSpeechDevice::ready();
        let controller = ready_controller(&device).await;

        controller.shutdown();
        controller.shutdown();

        assert_eq!(controller.state(), SpeechDeviceState::Released);
        let releases = device
            .calls()
            .into_iter()
            .filter(|c| *c == DeviceCall::Release)
            .count();
        assert_eq!(releases, 1);

        assert_eq!(
            controller.speak(&Utterance::update("after shutdown")),
            SpeakOutcome::DroppedNotReady(SpeechDeviceState::Released)
        );
        controller.interrupt();
    }

    #[test]
    fn test_shutdown_before_initialize_skips_release() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        controller.shutdown();
        assert_eq!(controller.state(), SpeechDeviceState::Released);
        assert!(device.calls().is_empty());
        assert!(controller.initialize().is_none());
    }

    #[test]
    fn test_init_completing_after_shutdown_stays_released() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        let _rx = controller.initialize().unwrap();
        controller.shutdown();
        assert!(device.is_released());

        let result = controller.complete_initialization(DeviceInitStatus::Success);
        assert!(matches!(result, Err(NarratorError::ShuttingDown)));
        assert_eq!(controller.state(), SpeechDeviceState::Released);
    }

    #[test]
    fn test_ready_gate_observed_from_state_cell() {
        let device = MockSpeechDevice::new();
        let controller = controller(&device);
        let observer = controller.state_cell();
        let _rx = controller.initialize().unwrap();
        controller
            .complete_initialization(DeviceInitStatus::Success)
            .unwrap();
        assert!(observer.is_ready());
    }
}
