use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NarratorError, Result};
use crate::types::HostEventKind;

/// Top-level configuration for the narrator.
///
/// Loaded from `~/.narrator/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarratorConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl NarratorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NarratorConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| NarratorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Speech device configuration, applied once when the device reports ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP 47 locale handed to the device.
    pub locale: String,
    /// Speech rate multiplier.
    pub rate: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Language a preferred voice must speak.
    pub voice_language: String,
    /// Minimum device quality score for a preferred voice.
    pub min_voice_quality: u32,
    /// Spoken once when the device becomes ready.
    pub init_announcement: String,
    /// Prepended to live typing echo.
    pub typing_prefix: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            locale: "en-IN".to_string(),
            rate: 0.95,
            pitch: 1.05,
            voice_language: "en".to_string(),
            min_voice_quality: 400,
            init_announcement: "Screen Reader Activated".to_string(),
            typing_prefix: "Typing: ".to_string(),
        }
    }
}

/// Change significance filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fingerprint distance a new screen must exceed to be narrated.
    pub threshold: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { threshold: 50 }
    }
}

/// Limits on a single accessibility tree walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Deepest level descended into; the root is depth 0.
    pub max_depth: usize,
    /// Maximum nodes visited per event.
    pub max_nodes: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_nodes: 10_000,
        }
    }
}

/// Event subscription and delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Window in which successive screen events are coalesced into the latest.
    pub notification_timeout_ms: u64,
    /// Event kinds the service reacts to.
    pub event_types: Vec<HostEventKind>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            notification_timeout_ms: 60,
            event_types: HostEventKind::ALL.to_vec(),
        }
    }
}

impl ServiceConfig {
    pub fn is_subscribed(&self, kind: HostEventKind) -> bool {
        self.event_types.contains(&kind)
    }
}
