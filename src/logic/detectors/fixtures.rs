//! Synthetic event sequences for exercising detectors offline
//!
//! Builds the same `DiagnosticEvent`s the engine would record, positioned
//! at explicit relative times, so detector behaviour can be checked without
//! a clock or an engine.

use serde_json::{json, Map};

use crate::logic::telemetry::event::{
    subtype, BackgroundLogData, DiagnosticEvent, EventData, InitData, KeyboardData, OutputData,
    PasteData, WireData, WireDirection,
};

/// Absolute time (epoch ms) of relative time zero
pub const BASE_TIMESTAMP: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    events: Vec<DiagnosticEvent>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary payload at `rel` ms
    pub fn push(mut self, rel: u64, subtype: &str, data: EventData) -> Self {
        let gap = self
            .events
            .last()
            .map(|e| rel.saturating_sub(e.relative_ms))
            .unwrap_or(0);
        self.events.push(DiagnosticEvent::new(
            subtype,
            BASE_TIMESTAMP + rel as i64,
            rel,
            gap,
            data,
        ));
        self
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn paste(self, rel: u64, length: usize) -> Self {
        let data = PasteData {
            content_hash: format!("{:016x}", length),
            content_length: length,
            line_count: 1,
            source: "clipboard".to_string(),
        };
        self.push(rel, subtype::PASTE, EventData::Paste(data))
    }

    pub fn keydown(self, rel: u64, key: &str, target: &str) -> Self {
        self.key(rel, subtype::KEYDOWN, key, target, false)
    }

    pub fn keydown_prevented(self, rel: u64, key: &str, target: &str) -> Self {
        self.key(rel, subtype::KEYDOWN, key, target, true)
    }

    pub fn keyup(self, rel: u64, key: &str, target: &str) -> Self {
        self.key(rel, subtype::KEYUP, key, target, false)
    }

    /// Keydown with a full payload (modifiers, code, class)
    pub fn keyboard(self, rel: u64, data: KeyboardData) -> Self {
        self.push(rel, subtype::KEYDOWN, EventData::Keyboard(data))
    }

    fn key(self, rel: u64, kind: &str, key: &str, target: &str, prevented: bool) -> Self {
        let data = KeyboardData {
            key: key.to_string(),
            code: key_code(key),
            target: target.to_uppercase(),
            prevented,
            ..Default::default()
        };
        self.push(rel, kind, EventData::Keyboard(data))
    }

    // ------------------------------------------------------------------------
    // Transport + terminal
    // ------------------------------------------------------------------------

    pub fn send(self, rel: u64, size: usize) -> Self {
        self.wire(rel, WireDirection::Send, size)
    }

    pub fn receive(self, rel: u64, size: usize) -> Self {
        self.wire(rel, WireDirection::Receive, size)
    }

    fn wire(self, rel: u64, direction: WireDirection, size: usize) -> Self {
        let data = WireData {
            direction,
            payload_size: size,
            message_type: "input".to_string(),
        };
        self.push(rel, direction.as_str(), EventData::Wire(data))
    }

    pub fn output(self, rel: u64, length: usize) -> Self {
        self.push(rel, subtype::OUTPUT, EventData::Output(OutputData { length }))
    }

    // ------------------------------------------------------------------------
    // Lifecycle + background logging
    // ------------------------------------------------------------------------

    pub fn init(self, rel: u64, phase: &str) -> Self {
        let mut details = Map::new();
        details.insert("component".to_string(), json!("Terminal"));
        self.push(rel, phase, EventData::Init(InitData { details }))
    }

    /// Activity marker (`input_captured` / `output_captured`)
    pub fn capture(self, rel: u64, kind: &str) -> Self {
        self.push(rel, kind, EventData::BackgroundLog(BackgroundLogData::default()))
    }

    pub fn file_write(self, rel: u64, path: &str, verified: bool) -> Self {
        let data = BackgroundLogData {
            path: Some(path.to_string()),
            success: Some(true),
            verified: Some(verified),
            bytes_written: Some(128),
            ..Default::default()
        };
        self.push(rel, subtype::FILE_WRITE, EventData::BackgroundLog(data))
    }

    pub fn failed_write(self, rel: u64, path: &str, error: &str) -> Self {
        let data = BackgroundLogData {
            path: Some(path.to_string()),
            success: Some(false),
            error: Some(error.to_string()),
            ..Default::default()
        };
        self.push(rel, subtype::FILE_WRITE, EventData::BackgroundLog(data))
    }

    pub fn conversation_start(self, rel: u64, id: &str) -> Self {
        self.conversation(rel, subtype::CONVERSATION_START, id)
    }

    pub fn conversation_end(self, rel: u64, id: &str) -> Self {
        self.conversation(rel, subtype::CONVERSATION_END, id)
    }

    fn conversation(self, rel: u64, kind: &str, id: &str) -> Self {
        let data = BackgroundLogData {
            conversation_id: Some(id.to_string()),
            ..Default::default()
        };
        self.push(rel, kind, EventData::BackgroundLog(data))
    }

    pub fn build(self) -> Vec<DiagnosticEvent> {
        self.events
    }
}

/// Best-effort `KeyboardEvent.code` for a key value
fn key_code(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(' '), None) => "Space".to_string(),
        (Some(c), None) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
        (Some(c), None) if c.is_ascii_digit() => format!("Digit{}", c),
        _ => key.to_string(),
    }
}
