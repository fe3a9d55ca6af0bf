//! Narrator Speech crate - speech device lifecycle and utterance arbitration.
//!
//! Owns the one speech device handle, tracks its asynchronous readiness
//! through a lock-free state cell, and arbitrates screen narration against
//! live typing echo on the device's single queue. Includes a mock device for
//! testing without a real speech engine.

pub mod controller;
pub mod device;
pub mod state;
pub mod voice;

pub use controller::{SpeakOutcome, UtteranceQueueController};
pub use device::{DeviceCall, DeviceInitStatus, MockSpeechDevice, SpeechDevice};
pub use state::{DeviceStateCell, SpeechDeviceState};
pub use voice::{select_voice, voice_settings};
