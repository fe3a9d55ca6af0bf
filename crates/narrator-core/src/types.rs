use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Speech queue discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Queue behind whatever is already playing or pending.
    Append,
    /// Cancel current and pending playback, then speak immediately.
    Flush,
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueMode::Append => write!(f, "append"),
            QueueMode::Flush => write!(f, "flush"),
        }
    }
}

/// Logical channel an utterance belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UtteranceTag {
    /// One-shot startup announcement.
    #[serde(rename = "INIT")]
    Init,
    /// Screen narration or typing echo.
    #[serde(rename = "UPDATE")]
    Update,
}

impl UtteranceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtteranceTag::Init => "INIT",
            UtteranceTag::Update => "UPDATE",
        }
    }
}

impl fmt::Display for UtteranceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of accessibility notifications delivered by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEventKind {
    ContentChanged,
    StateChanged,
    Scrolled,
    TextChanged,
    /// Input focus moved to a view.
    FocusChanged,
    /// Accessibility focus moved to a view.
    AccessibilityFocused,
}

impl HostEventKind {
    /// Every kind the service subscribes to by default.
    pub const ALL: [HostEventKind; 6] = [
        HostEventKind::ContentChanged,
        HostEventKind::StateChanged,
        HostEventKind::Scrolled,
        HostEventKind::TextChanged,
        HostEventKind::FocusChanged,
        HostEventKind::AccessibilityFocused,
    ];

    /// Whether this kind triggers a full-screen re-read.
    pub fn is_content_class(&self) -> bool {
        !matches!(self, HostEventKind::TextChanged)
    }
}

impl fmt::Display for HostEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostEventKind::ContentChanged => "content_changed",
            HostEventKind::StateChanged => "state_changed",
            HostEventKind::Scrolled => "scrolled",
            HostEventKind::TextChanged => "text_changed",
            HostEventKind::FocusChanged => "focus_changed",
            HostEventKind::AccessibilityFocused => "accessibility_focused",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Accessibility tree
// =============================================================================

fn default_visible() -> bool {
    true
}

/// One node of the host's accessibility tree.
///
/// Nodes are owned by the host. The narrator only borrows a root for the
/// duration of a single traversal and never keeps one across events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityNode {
    #[serde(default = "default_visible", alias = "visible")]
    pub visible_to_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AccessibilityNode>,
}

impl AccessibilityNode {
    /// A visible node with no label of its own.
    pub fn container(children: Vec<AccessibilityNode>) -> Self {
        Self {
            visible_to_user: true,
            text: None,
            content_description: None,
            children,
        }
    }

    /// A visible leaf carrying `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            visible_to_user: true,
            text: Some(text.into()),
            content_description: None,
            children: Vec::new(),
        }
    }

    /// A visible leaf carrying only a content description (icons, images).
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            visible_to_user: true,
            text: None,
            content_description: Some(description.into()),
            children: Vec::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible_to_user = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.content_description = Some(description.into());
        self
    }

    pub fn with_children(mut self, children: Vec<AccessibilityNode>) -> Self {
        self.children = children;
        self
    }

    /// The label a screen reader would speak for this node alone.
    ///
    /// `text` wins over `content_description`; blank values count as absent.
    pub fn label(&self) -> Option<&str> {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.trim().is_empty())
        }
        non_blank(&self.text).or_else(|| non_blank(&self.content_description))
    }
}

// =============================================================================
// Snapshot / fingerprint
// =============================================================================

/// Linearized visible text of one screen, produced fresh per event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScreenSnapshot {
    text: String,
}

impl ScreenSnapshot {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    /// The raw linearization, including the trailing separator.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The text handed to the filter and the speech device.
    pub fn narration(&self) -> &str {
        self.text.trim()
    }

    /// True when no visible label was found.
    pub fn is_empty(&self) -> bool {
        self.narration().is_empty()
    }
}

impl fmt::Display for ScreenSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.narration())
    }
}

/// 32-bit hash of a snapshot's narration text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenFingerprint(pub i32);

impl ScreenFingerprint {
    /// Numeric distance between two fingerprints, with 32-bit wrapping.
    ///
    /// `i32::MIN` is its own absolute value, so a distance of exactly
    /// `2^31` comes back negative.
    pub fn distance(&self, other: ScreenFingerprint) -> i32 {
        self.0.wrapping_sub(other.0).wrapping_abs()
    }
}

impl fmt::Display for ScreenFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Host events
// =============================================================================

/// A single accessibility notification from the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEvent {
    pub kind: HostEventKind,
    /// Changed text carried by text-changed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_text: Option<Vec<String>>,
}

impl HostEvent {
    pub fn new(kind: HostEventKind) -> Self {
        Self {
            kind,
            changed_text: None,
        }
    }

    pub fn text_changed<I, S>(text: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: HostEventKind::TextChanged,
            changed_text: Some(text.into_iter().map(Into::into).collect()),
        }
    }

    /// The changed text joined with single spaces and trimmed.
    pub fn typed_text(&self) -> Option<String> {
        let typed = self.changed_text.as_ref()?.join(" ");
        let typed = typed.trim();
        if typed.is_empty() {
            None
        } else {
            Some(typed.to_string())
        }
    }
}

// =============================================================================
// Speech
// =============================================================================

/// A unit of speech submitted to the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: Uuid,
    pub text: String,
    pub mode: QueueMode,
    pub tag: UtteranceTag,
}

impl Utterance {
    pub fn new(text: impl Into<String>, mode: QueueMode, tag: UtteranceTag) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            mode,
            tag,
        }
    }

    /// Startup announcement: appended, tagged INIT.
    pub fn announcement(text: impl Into<String>) -> Self {
        Self::new(text, QueueMode::Append, UtteranceTag::Init)
    }

    /// Narration update: flushes, tagged UPDATE.
    pub fn update(text: impl Into<String>) -> Self {
        Self::new(text, QueueMode::Flush, UtteranceTag::Update)
    }
}

/// A voice offered by the speech device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    /// ISO 639 language code, e.g. "en".
    pub language: String,
    /// Device quality score; higher is better. 400 is "high".
    pub quality: u32,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, language: impl Into<String>, quality: u32) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            quality,
        }
    }
}

/// Settings applied to the device once it reports ready.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    /// `None` keeps the device default voice.
    pub voice: Option<VoiceInfo>,
}

// =============================================================================
// Timestamp
// =============================================================================

/// Wall-clock instant in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // AccessibilityNode
    // =========================================================================

    #[test]
    fn test_label_prefers_text() {
        let node = AccessibilityNode::text("Send").with_description("paper plane icon");
        assert_eq!(node.label(), Some("Send"));
    }

    #[test]
    fn test_label_falls_back_to_description() {
        let node = AccessibilityNode::described("Settings");
        assert_eq!(node.label(), Some("Settings"));
    }

    #[test]
    fn test_label_blank_text_uses_description() {
        let node = AccessibilityNode::text("   ").with_description("Close");
        assert_eq!(node.label(), Some("Close"));
    }

    #[test]
    fn test_label_none_when_both_blank() {
        let node = AccessibilityNode::text("").with_description("\t");
        assert_eq!(node.label(), None);
        assert_eq!(AccessibilityNode::container(vec![]).label(), None);
    }

    #[test]
    fn test_node_deserialize_defaults() {
        let json = r#"{"text":"Hello","children":[{"visible":false,"text":"x"}]}"#;
        let node: AccessibilityNode = serde_json::from_str(json).unwrap();
        assert!(node.visible_to_user);
        assert_eq!(node.text.as_deref(), Some("Hello"));
        assert_eq!(node.children.len(), 1);
        assert!(!node.children[0].visible_to_user);
        assert!(node.children[0].children.is_empty());
    }

    // =========================================================================
    // Snapshot / fingerprint
    // =========================================================================

    #[test]
    fn test_snapshot_narration_is_trimmed() {
        let snapshot = ScreenSnapshot::new("Hello. World. ".to_string());
        assert_eq!(snapshot.as_str(), "Hello. World. ");
        assert_eq!(snapshot.narration(), "Hello. World.");
        assert!(!snapshot.is_empty());
        assert!(ScreenSnapshot::new("  ".to_string()).is_empty());
    }

    #[test]
    fn test_fingerprint_distance_is_symmetric() {
        let a = ScreenFingerprint(100);
        let b = ScreenFingerprint(-25);
        assert_eq!(a.distance(b), 125);
        assert_eq!(b.distance(a), 125);
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn test_fingerprint_distance_wraps() {
        // MAX - MIN wraps to -1, whose absolute value is 1.
        let a = ScreenFingerprint(i32::MAX);
        let b = ScreenFingerprint(i32::MIN);
        assert_eq!(a.distance(b), 1);

        // 0 - MIN wraps to MIN, which stays negative.
        let zero = ScreenFingerprint(0);
        assert_eq!(zero.distance(ScreenFingerprint(i32::MIN)), i32::MIN);
    }

    // =========================================================================
    // Events / utterances
    // =========================================================================

    #[test]
    fn test_event_kind_classes() {
        assert!(!HostEventKind::TextChanged.is_content_class());
        for kind in HostEventKind::ALL {
            if kind != HostEventKind::TextChanged {
                assert!(kind.is_content_class(), "{kind} should be content class");
            }
        }
    }

    #[test]
    fn test_event_kind_serde_names() {
        let json = serde_json::to_string(&HostEventKind::AccessibilityFocused).unwrap();
        assert_eq!(json, "\"accessibility_focused\"");
        let kind: HostEventKind = serde_json::from_str("\"text_changed\"").unwrap();
        assert_eq!(kind, HostEventKind::TextChanged);
    }

    #[test]
    fn test_typed_text_joins_with_spaces() {
        let event = HostEvent::text_changed(["a", "b"]);
        assert_eq!(event.typed_text().as_deref(), Some("a b"));
    }

    #[test]
    fn test_typed_text_empty_payloads() {
        assert_eq!(HostEvent::new(HostEventKind::TextChanged).typed_text(), None);
        assert_eq!(HostEvent::text_changed(Vec::<String>::new()).typed_text(), None);
        assert_eq!(HostEvent::text_changed([" ", ""]).typed_text(), None);
    }

    #[test]
    fn test_utterance_constructors() {
        let init = Utterance::announcement("Screen Reader Activated");
        assert_eq!(init.mode, QueueMode::Append);
        assert_eq!(init.tag, UtteranceTag::Init);

        let update = Utterance::update("Hello");
        assert_eq!(update.mode, QueueMode::Flush);
        assert_eq!(update.tag, UtteranceTag::Update);
        assert_ne!(init.id, update.id);
    }

    #[test]
    fn test_utterance_tag_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&UtteranceTag::Init).unwrap(), "\"INIT\"");
        assert_eq!(UtteranceTag::Update.to_string(), "UPDATE");
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let now = Utc::now();
        let ts = Timestamp::from_datetime(now);
        assert_eq!(ts.to_datetime().timestamp_millis(), now.timestamp_millis());
    }
}
