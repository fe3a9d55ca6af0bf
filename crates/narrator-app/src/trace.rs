//! Recorded host sessions.
//!
//! A trace is a JSON-lines file, one host signal per line, each stamped with
//! its offset from the start of the session:
//!
//! ```text
//! {"type":"connected"}
//! {"type":"event","kind":"content_changed","at_ms":120,"root":{"text":"Inbox"}}
//! {"type":"event","kind":"text_changed","at_ms":400,"text":["a"]}
//! {"type":"destroy","at_ms":900}
//! ```
//!
//! Replay runs in virtual time, so coalescing windows behave as they would
//! live without the replay actually sleeping.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;

use narrator_core::error::{NarratorError, Result};
use narrator_core::events::NarrationEvent;
use narrator_core::types::{AccessibilityNode, HostEvent, HostEventKind};
use narrator_service::{AccessibilityService, ServiceAdapter, ServiceSignal, SharedRootHost};
use narrator_speech::DeviceInitStatus;

/// One recorded signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceLine {
    Connected {
        #[serde(default)]
        at_ms: u64,
    },
    /// An accessibility notification. `root`, when present, replaces the
    /// active window before the event is delivered.
    Event {
        kind: HostEventKind,
        #[serde(default)]
        text: Option<Vec<String>>,
        #[serde(default)]
        root: Option<AccessibilityNode>,
        #[serde(default)]
        at_ms: u64,
    },
    /// The active window went away.
    ClearRoot {
        #[serde(default)]
        at_ms: u64,
    },
    /// The speech engine answered the creation request.
    DeviceInit {
        success: bool,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        at_ms: u64,
    },
    Interrupt {
        #[serde(default)]
        at_ms: u64,
    },
    Destroy {
        #[serde(default)]
        at_ms: u64,
    },
}

impl TraceLine {
    pub fn at_ms(&self) -> u64 {
        match self {
            TraceLine::Connected { at_ms }
            | TraceLine::Event { at_ms, .. }
            | TraceLine::ClearRoot { at_ms }
            | TraceLine::DeviceInit { at_ms, .. }
            | TraceLine::Interrupt { at_ms }
            | TraceLine::Destroy { at_ms } => *at_ms,
        }
    }
}

/// Parse a trace. Blank lines and lines starting with `#` are skipped.
pub fn parse_trace(content: &str) -> Result<Vec<TraceLine>> {
    let mut lines = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let line: TraceLine = serde_json::from_str(raw)
            .map_err(|e| NarratorError::Trace(format!("line {}: {}", index + 1, e)))?;
        lines.push(line);
    }
    Ok(lines)
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceLine>> {
    let content = std::fs::read_to_string(path)?;
    let lines = parse_trace(&content)?;
    tracing::info!(path = %path.display(), lines = lines.len(), "Trace loaded");
    Ok(lines)
}

/// Replay `lines` through `adapter`, collecting narration decisions.
///
/// If the trace records a `device_init` line, device creation is answered by
/// the trace; otherwise the adapter waits on the device's own callback right
/// after connecting.
pub async fn replay<S: AccessibilityService>(
    adapter: &mut ServiceAdapter<S>,
    host: &SharedRootHost,
    lines: &[TraceLine],
    decisions: &mut broadcast::Receiver<NarrationEvent>,
) -> Vec<NarrationEvent> {
    let manual_init = lines
        .iter()
        .any(|line| matches!(line, TraceLine::DeviceInit { .. }));
    let start = Instant::now();
    let mut log = Vec::new();

    for line in lines {
        let at = start + Duration::from_millis(line.at_ms());
        adapter.flush_due(at);

        let running = match line.clone() {
            TraceLine::Connected { .. } => {
                adapter.handle(ServiceSignal::Connected, at);
                if !manual_init {
                    adapter.await_init().await;
                }
                true
            }
            TraceLine::Event {
                kind, text, root, ..
            } => {
                if let Some(root) = root {
                    host.set_root(root);
                }
                let event = HostEvent {
                    kind,
                    changed_text: text,
                };
                adapter.handle(ServiceSignal::Event(event), at)
            }
            TraceLine::ClearRoot { .. } => {
                host.clear_root();
                true
            }
            TraceLine::DeviceInit {
                success, reason, ..
            } => {
                let status = if success {
                    DeviceInitStatus::Success
                } else {
                    DeviceInitStatus::Failure(reason.unwrap_or_else(|| "unspecified".to_string()))
                };
                adapter.complete_init(status);
                true
            }
            TraceLine::Interrupt { .. } => adapter.handle(ServiceSignal::Interrupt, at),
            TraceLine::Destroy { .. } => adapter.handle(ServiceSignal::Destroy, at),
        };
        drain_into(decisions, &mut log);
        if !running {
            tracing::debug!(at_ms = line.at_ms(), "Service destroyed, replay stopped");
            return log;
        }
    }

    adapter.flush();
    drain_into(decisions, &mut log);
    log
}

fn drain_into(rx: &mut broadcast::Receiver<NarrationEvent>, log: &mut Vec<NarrationEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => log.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Narration decisions lost");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
