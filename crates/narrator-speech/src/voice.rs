//! Voice selection.

use narrator_core::config::SpeechConfig;
use narrator_core::types::{VoiceInfo, VoiceSettings};

/// First voice speaking `language` with at least `min_quality`, if any.
pub fn select_voice(voices: &[VoiceInfo], language: &str, min_quality: u32) -> Option<VoiceInfo> {
    voices
        .iter()
        .find(|v| v.language.eq_ignore_ascii_case(language) && v.quality >= min_quality)
        .cloned()
}

/// Settings to apply once the device is ready, choosing from `voices`.
pub fn voice_settings(config: &SpeechConfig, voices: &[VoiceInfo]) -> VoiceSettings {
    VoiceSettings {
        locale: config.locale.clone(),
        rate: config.rate,
        pitch: config.pitch,
        voice: select_voice(voices, &config.voice_language, config.min_voice_quality),
    }
}
