//! Speech output device abstraction.
//!
//! A device is created asynchronously: `create` returns immediately and the
//! engine later reports success or failure through a single-resolution
//! channel. Everything else is a plain synchronous call into the engine's own
//! queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use narrator_core::error::{NarratorError, Result};
use narrator_core::types::{QueueMode, Utterance, VoiceInfo, VoiceSettings};

/// Completion status of device creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInitStatus {
    Success,
    Failure(String),
}

/// A speech synthesis engine with one playback queue.
pub trait SpeechDevice: Send + Sync {
    /// Begin creating the device. The receiver resolves exactly once.
    fn create(&self) -> oneshot::Receiver<DeviceInitStatus>;

    /// Voices the engine offers. Only meaningful after creation succeeded.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Apply locale, rate, pitch and voice.
    fn configure(&self, settings: &VoiceSettings) -> Result<()>;

    /// Submit an utterance. `Flush` discards current and pending playback
    /// first; `Append` queues behind it.
    fn enqueue(&self, utterance: &Utterance) -> Result<()>;

    /// Stop current playback and discard pending utterances.
    fn stop(&self) -> Result<()>;

    /// Free the engine. No further calls are expected.
    fn release(&self) -> Result<()>;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// A call recorded by [`MockSpeechDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Create,
    Configure(VoiceSettings),
    Enqueue(Utterance),
    Stop,
    Release,
}

#[derive(Debug, Default)]
struct MockDeviceState {
    calls: Vec<DeviceCall>,
    /// Front is the utterance currently playing.
    queue: VecDeque<Utterance>,
    completed: Vec<Utterance>,
    voices: Vec<VoiceInfo>,
    auto_init: Option<DeviceInitStatus>,
    init_sender: Option<oneshot::Sender<DeviceInitStatus>>,
    released: bool,
}

/// Mock speech device for testing.
///
/// Simulates a single playback queue: the front of the queue is "playing"
/// until [`finish_current`](Self::finish_current) completes it. Clones share
/// state, so a test can keep a handle while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSpeechDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockSpeechDevice {
    /// A device whose creation stays pending until [`resolve_init`](Self::resolve_init).
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose creation resolves with `status` as soon as it is requested.
    pub fn with_auto_init(status: DeviceInitStatus) -> Self {
        let device = Self::new();
        device.lock().auto_init = Some(status);
        device
    }

    /// A device that becomes ready immediately.
    pub fn ready() -> Self {
        Self::with_auto_init(DeviceInitStatus::Success)
    }

    pub fn with_voices(self, voices: Vec<VoiceInfo>) -> Self {
        self.lock().voices = voices;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockDeviceState> {
        self.state.lock().expect("mock device mutex poisoned")
    }

    /// Deliver the creation callback. Returns false if nothing was waiting.
    pub fn resolve_init(&self, status: DeviceInitStatus) -> bool {
        let sender = self.lock().init_sender.take();
        match sender {
            Some(tx) => tx.send(status).is_ok(),
            None => false,
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    /// Every utterance submitted, in order, whether or not it finished.
    pub fn submitted(&self) -> Vec<Utterance> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Enqueue(u) => Some(u.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of every submitted utterance.
    pub fn submitted_texts(&self) -> Vec<String> {
        self.submitted().into_iter().map(|u| u.text).collect()
    }

    /// The utterance currently playing.
    pub fn playing(&self) -> Option<Utterance> {
        self.lock().queue.front().cloned()
    }

    /// Utterances waiting behind the current one.
    pub fn pending(&self) -> Vec<Utterance> {
        self.lock().queue.iter().skip(1).cloned().collect()
    }

    /// Complete the currently playing utterance and start the next one.
    pub fn finish_current(&self) -> Option<Utterance> {
        let mut state = self.lock();
        let finished = state.queue.pop_front()?;
        state.completed.push(finished.clone());
        Some(finished)
    }

    /// Play the whole queue to completion.
    pub fn drain(&self) {
        while self.finish_current().is_some() {}
    }

    /// Utterances heard to completion.
    pub fn completed(&self) -> Vec<Utterance> {
        self.lock().completed.clone()
    }

    /// The most recent settings applied.
    pub fn configured(&self) -> Option<VoiceSettings> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            DeviceCall::Configure(settings) => Some(settings.clone()),
            _ => None,
        })
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }
}

impl SpeechDevice for MockSpeechDevice {
    fn create(&self) -> oneshot::Receiver<DeviceInitStatus> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        state.calls.push(DeviceCall::Create);
        match state.auto_init.clone() {
            Some(status) => {
                let _ = tx.send(status);
            }
            None => state.init_sender = Some(tx),
        }
        rx
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.lock().voices.clone()
    }

    fn configure(&self, settings: &VoiceSettings) -> Result<()> {
        let mut state = self.lock();
        if state.released {
            return Err(NarratorError::Speech("device released".to_string()));
        }
        state.calls.push(DeviceCall::Configure(settings.clone()));
        Ok(())
    }

    fn enqueue(&self, utterance: &Utterance) -> Result<()> {
        let mut state = self.lock();
        if state.released {
            return Err(NarratorError::Speech("device released".to_string()));
        }
        state.calls.push(DeviceCall::Enqueue(utterance.clone()));
        if utterance.mode == QueueMode::Flush {
            state.queue.clear();
        }
        state.queue.push_back(utterance.clone());
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DeviceCall::Stop);
        state.queue.clear();
        Ok(())
    }

    fn release(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DeviceCall::Release);
        state.queue.clear();
        state.released = true;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
