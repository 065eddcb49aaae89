//! Diagnostic Event Types
//!
//! Immutable, timestamped records of what the terminal UI observed.
//! These events are the core data structure for formatting, export and
//! problem detection. Payloads never carry user content: text is reduced
//! to a one-way hash and a length before it gets here.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::constants::{UNKNOWN, UNSERIALIZABLE};

// ============================================================================
// EVENT CATEGORIES
// ============================================================================

/// Categories of diagnostic events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// Key pressed / released on some UI element
    Keyboard,
    /// Text pasted into the terminal
    Paste,
    /// Focus moved between UI elements
    Focus,
    /// Frame sent to / received from the terminal transport
    Wire,
    /// Background transcript logging pipeline
    BackgroundLog,
    /// Startup lifecycle phase
    Init,
    /// Terminal rendered output
    Output,
}

impl EventCategory {
    pub const ALL: [EventCategory; 7] = [
        EventCategory::Keyboard,
        EventCategory::Paste,
        EventCategory::Focus,
        EventCategory::Wire,
        EventCategory::BackgroundLog,
        EventCategory::Init,
        EventCategory::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Keyboard => "KEYBOARD",
            EventCategory::Paste => "PASTE",
            EventCategory::Focus => "FOCUS",
            EventCategory::Wire => "WIRE",
            EventCategory::BackgroundLog => "BACKGROUND_LOG",
            EventCategory::Init => "INIT",
            EventCategory::Output => "OUTPUT",
        }
    }
}

/// Well-known subtypes
pub mod subtype {
    pub const KEYDOWN: &str = "keydown";
    pub const KEYUP: &str = "keyup";

    pub const PASTE: &str = "paste";

    pub const FOCUS: &str = "focus";
    pub const BLUR: &str = "blur";

    pub const SEND: &str = "send";
    pub const RECEIVE: &str = "receive";

    pub const OUTPUT: &str = "output";

    pub const INPUT_CAPTURED: &str = "input_captured";
    pub const OUTPUT_CAPTURED: &str = "output_captured";
    pub const FILE_WRITE: &str = "file_write";
    pub const CONVERSATION_START: &str = "conversation_start";
    pub const CONVERSATION_END: &str = "conversation_end";

    pub const MOUNTED: &str = "mounted";
    pub const CREATED: &str = "created";
    pub const HANDLERS_ATTACHED: &str = "handlers_attached";
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Modifier keys held during a keystroke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyboardData {
    pub key: String,
    pub code: String,
    /// Tag name of the element that received the event
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_class: Option<String>,
    pub prevented: bool,
    pub repeat: bool,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasteData {
    pub content_hash: String,
    pub content_length: usize,
    pub line_count: usize,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FocusData {
    pub target: String,
    pub related_target: String,
}

/// Direction of a transport frame, seen from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireDirection {
    Send,
    Receive,
}

impl WireDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireDirection::Send => subtype::SEND,
            WireDirection::Receive => subtype::RECEIVE,
        }
    }

    /// Parse loose producer labels ("sent", "out", "recv", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "send" | "sent" | "out" | "outgoing" => Some(WireDirection::Send),
            "receive" | "received" | "recv" | "in" | "incoming" => Some(WireDirection::Receive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireData {
    pub direction: WireDirection,
    #[serde(default)]
    pub payload_size: usize,
    #[serde(default)]
    pub message_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundLogData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Remaining (already sanitised) producer fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BackgroundLogData {
    /// A write the pipeline did not confirm: failed, errored, or never verified.
    /// A missing `verified` flag counts as unverified.
    pub fn is_failed_write(&self) -> bool {
        self.success == Some(false) || self.verified != Some(true) || self.error.is_some()
    }

    /// Human-readable verification outcome
    pub fn outcome(&self) -> &'static str {
        if self.error.is_some() || self.success == Some(false) {
            "FAILED"
        } else {
            match self.verified {
                Some(true) => "verified",
                Some(false) => "NOT verified",
                None => "unverified (no check reported)",
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitData {
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputData {
    pub length: usize,
}

/// Category-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Keyboard(KeyboardData),
    Paste(PasteData),
    Focus(FocusData),
    Wire(WireData),
    BackgroundLog(BackgroundLogData),
    Init(InitData),
    Output(OutputData),
    /// Payload that did not match its category's shape when parsed back
    Opaque(EventCategory, Value),
}

impl EventData {
    pub fn category(&self) -> EventCategory {
        match self {
            EventData::Keyboard(_) => EventCategory::Keyboard,
            EventData::Paste(_) => EventCategory::Paste,
            EventData::Focus(_) => EventCategory::Focus,
            EventData::Wire(_) => EventCategory::Wire,
            EventData::BackgroundLog(_) => EventCategory::BackgroundLog,
            EventData::Init(_) => EventCategory::Init,
            EventData::Output(_) => EventCategory::Output,
            EventData::Opaque(category, _) => *category,
        }
    }

    /// Rebuild a typed payload from its serialized form
    pub fn from_value(category: EventCategory, value: Value) -> Self {
        let parsed = match category {
            EventCategory::Keyboard => serde_json::from_value(value.clone()).map(EventData::Keyboard),
            EventCategory::Paste => serde_json::from_value(value.clone()).map(EventData::Paste),
            EventCategory::Focus => serde_json::from_value(value.clone()).map(EventData::Focus),
            EventCategory::Wire => serde_json::from_value(value.clone()).map(EventData::Wire),
            EventCategory::BackgroundLog => {
                serde_json::from_value(value.clone()).map(EventData::BackgroundLog)
            }
            EventCategory::Init => serde_json::from_value(value.clone()).map(EventData::Init),
            EventCategory::Output => serde_json::from_value(value.clone()).map(EventData::Output),
        };

        parsed.unwrap_or_else(|e| {
            log::debug!("Keeping {} payload opaque: {}", category.as_str(), e);
            EventData::Opaque(category, value)
        })
    }
}

impl Serialize for EventData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EventData::Keyboard(data) => data.serialize(serializer),
            EventData::Paste(data) => data.serialize(serializer),
            EventData::Focus(data) => data.serialize(serializer),
            EventData::Wire(data) => data.serialize(serializer),
            EventData::BackgroundLog(data) => data.serialize(serializer),
            EventData::Init(data) => data.serialize(serializer),
            EventData::Output(data) => data.serialize(serializer),
            EventData::Opaque(_, value) => value.serialize(serializer),
        }
    }
}

// ============================================================================
// DIAGNOSTIC EVENT (Main struct)
// ============================================================================

/// Immutable diagnostic event
///
/// Events are append-only and are never modified after being pushed.
/// `relative_ms` is measured from the session start and never decreases
/// across a buffer; `gap_ms` is the distance to the previously recorded
/// event of any category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventRecord", into = "EventRecord")]
pub struct DiagnosticEvent {
    pub subtype: String,
    /// Absolute capture time (epoch ms)
    pub timestamp: i64,
    pub relative_ms: u64,
    pub gap_ms: u64,
    pub data: EventData,
}

impl DiagnosticEvent {
    pub fn new(
        subtype: impl Into<String>,
        timestamp: i64,
        relative_ms: u64,
        gap_ms: u64,
        data: EventData,
    ) -> Self {
        Self {
            subtype: subtype.into(),
            timestamp,
            relative_ms,
            gap_ms,
            data,
        }
    }

    pub fn category(&self) -> EventCategory {
        self.data.category()
    }

    pub fn is(&self, category: EventCategory, subtype: &str) -> bool {
        self.category() == category && self.subtype == subtype
    }

    pub fn keyboard(&self) -> Option<&KeyboardData> {
        match &self.data {
            EventData::Keyboard(data) => Some(data),
            _ => None,
        }
    }

    pub fn paste(&self) -> Option<&PasteData> {
        match &self.data {
            EventData::Paste(data) => Some(data),
            _ => None,
        }
    }

    pub fn wire(&self) -> Option<&WireData> {
        match &self.data {
            EventData::Wire(data) => Some(data),
            _ => None,
        }
    }

    pub fn background_log(&self) -> Option<&BackgroundLogData> {
        match &self.data {
            EventData::BackgroundLog(data) => Some(data),
            _ => None,
        }
    }

    /// Keydown payload, if this is a keydown
    pub fn keydown(&self) -> Option<&KeyboardData> {
        if self.subtype == subtype::KEYDOWN {
            self.keyboard()
        } else {
            None
        }
    }

    /// Outgoing wire frame payload, if this is a send
    pub fn wire_send(&self) -> Option<&WireData> {
        self.wire().filter(|w| w.direction == WireDirection::Send)
    }

    pub fn is_output(&self) -> bool {
        self.category() == EventCategory::Output
    }
}

/// Serialized shape of an event (stable across implementations)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    category: EventCategory,
    #[serde(default)]
    subtype: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    relative_ms: u64,
    #[serde(default)]
    gap_ms: u64,
    #[serde(default)]
    data: Value,
}

impl From<DiagnosticEvent> for EventRecord {
    fn from(event: DiagnosticEvent) -> Self {
        let category = event.category();
        let data = payload_value(category, &event.data);

        Self {
            category,
            subtype: event.subtype,
            timestamp: event.timestamp,
            relative_ms: event.relative_ms,
            gap_ms: event.gap_ms,
            data,
        }
    }
}

/// JSON form of an event payload.
///
/// The one place serialization failure is absorbed: the payload becomes the
/// `[unserializable]` placeholder and the rest of the event is kept.
pub(crate) fn payload_value<T: Serialize + ?Sized>(category: EventCategory, data: &T) -> Value {
    serde_json::to_value(data).unwrap_or_else(|e| {
        log::warn!("Replacing unserializable {} payload: {}", category.as_str(), e);
        Value::String(UNSERIALIZABLE.to_string())
    })
}

impl From<EventRecord> for DiagnosticEvent {
    fn from(record: EventRecord) -> Self {
        Self {
            subtype: record.subtype,
            timestamp: record.timestamp,
            relative_ms: record.relative_ms,
            gap_ms: record.gap_ms,
            data: EventData::from_value(record.category, record.data),
        }
    }
}

// ============================================================================
// RAW PRODUCER INPUTS
// ============================================================================

/// UI element reference as reported by a producer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTarget {
    pub tag_name: Option<String>,
    pub class_name: Option<String>,
    pub id: Option<String>,
}

impl RawTarget {
    pub fn tag(tag_name: &str) -> Self {
        Self {
            tag_name: Some(tag_name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }
}

/// Normalize an optional element reference to an upper-case tag name
pub fn normalize_target(target: Option<&RawTarget>) -> String {
    target
        .and_then(|t| t.tag_name.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Keyboard event as forwarded by the key capture layer.
/// Every field is optional so partial input never fails to record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawKeyEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub key: Option<String>,
    pub code: Option<String>,
    pub target: Option<RawTarget>,
    pub default_prevented: bool,
    pub repeat: bool,
    pub ctrl_key: bool,
    pub alt_key: bool,
    pub shift_key: bool,
    pub meta_key: bool,
}

impl RawKeyEvent {
    pub fn keydown(key: &str) -> Self {
        Self {
            kind: Some(subtype::KEYDOWN.to_string()),
            key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn keyup(key: &str) -> Self {
        Self {
            kind: Some(subtype::KEYUP.to_string()),
            key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_target(mut self, target: RawTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn prevented(mut self) -> Self {
        self.default_prevented = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    /// Normalize into (subtype, payload)
    pub fn normalize(&self) -> (String, KeyboardData) {
        let kind = self
            .kind
            .as_deref()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let data = KeyboardData {
            key: self.key.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            code: self.code.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            target: normalize_target(self.target.as_ref()),
            target_class: self
                .target
                .as_ref()
                .and_then(|t| t.class_name.clone())
                .filter(|c| !c.is_empty()),
            prevented: self.default_prevented,
            repeat: self.repeat,
            modifiers: Modifiers {
                ctrl: self.ctrl_key,
                alt: self.alt_key,
                shift: self.shift_key,
                meta: self.meta_key,
            },
        };

        (kind, data)
    }
}

/// Focus change as forwarded by the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFocusEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub target: Option<RawTarget>,
    pub related_target: Option<RawTarget>,
}

impl RawFocusEvent {
    pub fn focus(target: RawTarget) -> Self {
        Self {
            kind: Some(subtype::FOCUS.to_string()),
            target: Some(target),
            related_target: None,
        }
    }

    pub fn blur(target: RawTarget) -> Self {
        Self {
            kind: Some(subtype::BLUR.to_string()),
            target: Some(target),
            related_target: None,
        }
    }

    pub fn normalize(&self) -> (String, FocusData) {
        let kind = match self.kind.as_deref().map(|k| k.trim().to_lowercase()) {
            Some(k) if k == "focus" || k == "focusin" => subtype::FOCUS.to_string(),
            Some(k) if k == "blur" || k == "focusout" => subtype::BLUR.to_string(),
            _ => UNKNOWN.to_string(),
        };

        let data = FocusData {
            target: normalize_target(self.target.as_ref()),
            related_target: normalize_target(self.related_target.as_ref()),
        };

        (kind, data)
    }
}

/// Frame metadata as reported by the transport layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireInfo {
    pub length: Option<usize>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

impl WireInfo {
    pub fn new(length: usize, message_type: &str) -> Self {
        Self {
            length: Some(length),
            message_type: Some(message_type.to_string()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_event_normalization() {
        let raw = RawKeyEvent::keydown(" ")
            .with_code("Space")
            .with_target(RawTarget::tag("textarea").with_class("xterm-helper-textarea"));
        let (kind, data) = raw.normalize();

        assert_eq!(kind, "keydown");
        assert_eq!(data.key, " ");
        assert_eq!(data.target, "TEXTAREA");
        assert_eq!(data.target_class.as_deref(), Some("xterm-helper-textarea"));
        assert!(!data.prevented);
    }

    #[test]
    fn test_missing_target_defaults_to_unknown() {
        let (kind, data) = RawKeyEvent::default().normalize();
        assert_eq!(kind, "UNKNOWN");
        assert_eq!(data.key, "UNKNOWN");
        assert_eq!(data.target, "UNKNOWN");

        let blank = RawKeyEvent::keydown("a").with_target(RawTarget::default());
        assert_eq!(blank.normalize().1.target, "UNKNOWN");
    }

    #[test]
    fn test_raw_key_event_from_browser_json() {
        let raw: RawKeyEvent = serde_json::from_str(
            r#"{"type":"keydown","key":"a","code":"KeyA","target":{"tagName":"TEXTAREA"},"defaultPrevented":true,"ctrlKey":true}"#,
        )
        .unwrap();
        let (_, data) = raw.normalize();
        assert!(data.prevented);
        assert!(data.modifiers.ctrl);
        assert_eq!(data.code, "KeyA");
    }

    #[test]
    fn test_focus_normalization() {
        let (kind, data) = RawFocusEvent::blur(RawTarget::tag("textarea")).normalize();
        assert_eq!(kind, "blur");
        assert_eq!(data.target, "TEXTAREA");
        assert_eq!(data.related_target, "UNKNOWN");
    }

    #[test]
    fn test_wire_direction_labels() {
        assert_eq!(WireDirection::from_label("sent"), Some(WireDirection::Send));
        assert_eq!(WireDirection::from_label("RECV"), Some(WireDirection::Receive));
        assert_eq!(WireDirection::from_label("sideways"), None);
    }

    #[test]
    fn test_event_serialized_shape() {
        let event = DiagnosticEvent::new(
            subtype::SEND,
            1_700_000_000_123,
            42,
            7,
            EventData::Wire(WireData {
                direction: WireDirection::Send,
                payload_size: 12,
                message_type: "input".to_string(),
            }),
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["category"], "WIRE");
        assert_eq!(json["subtype"], "send");
        assert_eq!(json["relativeMs"], 42);
        assert_eq!(json["gapMs"], 7);
        assert_eq!(json["data"]["payloadSize"], 12);

        let back: DiagnosticEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_mismatched_payload_is_kept_opaque() {
        let json = serde_json::json!({
            "category": "WIRE",
            "subtype": "send",
            "timestamp": 1,
            "relativeMs": 1,
            "gapMs": 0,
            "data": "garbage"
        });
        let event: DiagnosticEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.category(), EventCategory::Wire);
        assert!(event.wire().is_none());
        assert!(matches!(event.data, EventData::Opaque(EventCategory::Wire, _)));
    }

    #[test]
    fn test_failed_write_flags() {
        let ok = BackgroundLogData {
            success: Some(true),
            verified: Some(true),
            ..Default::default()
        };
        assert!(!ok.is_failed_write());
        assert_eq!(ok.outcome(), "verified");

        let unverified = BackgroundLogData {
            verified: Some(false),
            ..Default::default()
        };
        assert!(unverified.is_failed_write());

        let unchecked = BackgroundLogData {
            path: Some("/x.log".to_string()),
            success: Some(true),
            ..Default::default()
        };
        assert!(unchecked.is_failed_write());
        assert_eq!(unchecked.outcome(), "unverified (no check reported)");

        let errored = BackgroundLogData {
            error: Some("disk full".to_string()),
            ..Default::default()
        };
        assert!(errored.is_failed_write());
        assert_eq!(errored.outcome(), "FAILED");
    }

    struct Unwritable;

    impl Serialize for Unwritable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("payload refused"))
        }
    }

    #[test]
    fn test_unserializable_payload_placeholder() {
        let value = payload_value(EventCategory::Init, &Unwritable);
        assert_eq!(value, Value::String(UNSERIALIZABLE.to_string()));

        let fine = payload_value(EventCategory::Output, &OutputData { length: 2 });
        assert_eq!(fine, serde_json::json!({ "length": 2 }));
    }
}
