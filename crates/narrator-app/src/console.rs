//! Speech device that writes utterances to stdout.
//!
//! Stands in for a platform speech engine when replaying traces. Flush
//! semantics are visible in the transcript: a flushed utterance is marked as
//! cutting off whatever was queued before it.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use narrator_core::error::{NarratorError, Result};
use narrator_core::types::{QueueMode, Utterance, VoiceInfo, VoiceSettings};
use narrator_speech::{DeviceInitStatus, SpeechDevice};

#[derive(Debug, Default)]
struct ConsoleState {
    transcript: Vec<String>,
    pending_init: Option<oneshot::Sender<DeviceInitStatus>>,
    released: bool,
}

/// Console-backed speech device. Clones share the transcript.
#[derive(Debug, Clone)]
pub struct ConsoleSpeechDevice {
    /// Status reported on creation; `None` leaves creation pending.
    init: Option<DeviceInitStatus>,
    echo: bool,
    state: Arc<Mutex<ConsoleState>>,
}

impl ConsoleSpeechDevice {
    pub fn new(init: Option<DeviceInitStatus>) -> Self {
        Self {
            init,
            echo: true,
            state: Arc::new(Mutex::new(ConsoleState::default())),
        }
    }

    /// Record utterances without printing them.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state.lock().expect("console device mutex poisoned")
    }

    /// Every line written so far.
    pub fn transcript(&self) -> Vec<String> {
        self.lock().transcript.clone()
    }

    fn write_line(&self, line: String) {
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{}", line) {
                tracing::warn!(error = %e, "Failed to write speech to stdout");
            }
        }
        self.lock().transcript.push(line);
    }
}

impl SpeechDevice for ConsoleSpeechDevice {
    fn create(&self) -> oneshot::Receiver<DeviceInitStatus> {
        let (tx, rx) = oneshot::channel();
        match self.init.clone() {
            Some(status) => {
                let _ = tx.send(status);
            }
            None => self.lock().pending_init = Some(tx),
        }
        rx
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        vec![
            VoiceInfo::new("console-compact", "en", 300),
            VoiceInfo::new("console-enhanced", "en", 400),
        ]
    }

    fn configure(&self, settings: &VoiceSettings) -> Result<()> {
        tracing::debug!(
            locale = %settings.locale,
            rate = settings.rate,
            pitch = settings.pitch,
            "Console device configured"
        );
        Ok(())
    }

    fn enqueue(&self, utterance: &Utterance) -> Result<()> {
        if self.lock().released {
            return Err(NarratorError::Speech("console device released".to_string()));
        }
        let marker = match utterance.mode {
            QueueMode::Flush => "!",
            QueueMode::Append => "+",
        };
        self.write_line(format!("{} [{}] {}", marker, utterance.tag, utterance.text));
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.write_line("x [STOP]".to_string());
        Ok(())
    }

    fn release(&self) -> Result<()> {
        let mut state = self.lock();
        state.released = true;
        state.pending_init = None;
        Ok(())
    }
}
