//! Plain-language event formatting
//!
//! Pure functions: the same event and neighbours always give the same text.
//! The duplicate-send marker uses the duplicate-delivery detector's rule
//! verbatim, so the readable log and the automated verdict cannot disagree.

use serde::Serialize;

use super::event::{
    subtype, BackgroundLogData, DiagnosticEvent, EventCategory, EventData, KeyboardData,
    WireDirection,
};
use crate::constants::UNKNOWN;
use crate::logic::config::DiagnosticsConfig;
use crate::logic::detectors::duplicate_paste::find_duplicate_after_paste;

/// Human-readable rendition of one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedEvent {
    pub relative_ms: u64,
    pub gap_ms: u64,
    pub category: EventCategory,
    pub subtype: String,
    pub plain_text: String,
    /// Derived warnings (duplicate send, blocked key, failed write, ...)
    pub warnings: Vec<String>,
}

impl FormattedEvent {
    pub fn is_duplicate(&self) -> bool {
        self.plain_text.contains("DUPLICATE")
    }

    /// One log line: `[+1234ms] text`
    pub fn line(&self) -> String {
        format!("[+{}ms] {}", self.relative_ms, self.plain_text)
    }
}

/// Format every event against the events recorded before it
pub fn format_events(events: &[DiagnosticEvent], config: &DiagnosticsConfig) -> Vec<FormattedEvent> {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| format_event(event, &events[..i], config))
        .collect()
}

/// Format one event. `preceding` are the events recorded before it, oldest first.
pub fn format_event(
    event: &DiagnosticEvent,
    preceding: &[DiagnosticEvent],
    config: &DiagnosticsConfig,
) -> FormattedEvent {
    let mut warnings = Vec::new();

    let mut plain_text = match &event.data {
        EventData::Keyboard(key) => describe_key(&event.subtype, key, config, &mut warnings),
        EventData::Paste(paste) => format!(
            "Pasted {} characters ({} lines) from {} [hash {}]",
            paste.content_length, paste.line_count, paste.source, paste.content_hash
        ),
        EventData::Focus(focus) => match event.subtype.as_str() {
            subtype::FOCUS if focus.related_target != UNKNOWN => {
                format!("Focus moved to {} from {}", focus.target, focus.related_target)
            }
            subtype::FOCUS => format!("Focus moved to {}", focus.target),
            subtype::BLUR => format!("Focus left {}", focus.target),
            other => format!("Focus event '{}' on {}", other, focus.target),
        },
        EventData::Wire(wire) => match wire.direction {
            WireDirection::Send => format!(
                "Sent {} bytes to the terminal ({})",
                wire.payload_size, wire.message_type
            ),
            WireDirection::Receive => format!(
                "Received {} bytes from the terminal ({})",
                wire.payload_size, wire.message_type
            ),
        },
        EventData::BackgroundLog(log) => describe_background_log(&event.subtype, log, &mut warnings),
        EventData::Init(_) => format!("Startup phase: {}", event.subtype.replace('_', " ")),
        EventData::Output(output) => format!("Terminal displayed {} bytes of output", output.length),
        EventData::Opaque(category, _) => {
            format!("{} {} (unreadable payload)", category.as_str(), event.subtype)
        }
    };

    if let Some(prior) = find_duplicate_after_paste(preceding, event, config.duplicate_window_ms) {
        let warning = format!(
            "DUPLICATE: same size as the send at +{}ms, {}ms earlier",
            prior.relative_ms,
            event.relative_ms.saturating_sub(prior.relative_ms)
        );
        plain_text.push_str(&format!(" [{}]", warning));
        warnings.push(warning);
    }

    FormattedEvent {
        relative_ms: event.relative_ms,
        gap_ms: event.gap_ms,
        category: event.category(),
        subtype: event.subtype.clone(),
        plain_text,
        warnings,
    }
}

fn describe_key(
    kind: &str,
    key: &KeyboardData,
    config: &DiagnosticsConfig,
    warnings: &mut Vec<String>,
) -> String {
    let name = key_name(key);
    let mut text = match kind {
        subtype::KEYDOWN => format!("Pressed {} in {}", name, key.target),
        subtype::KEYUP => format!("Released {} in {}", name, key.target),
        other => format!("Key event '{}' for {} in {}", other, name, key.target),
    };

    if key.repeat {
        text.push_str(" (held)");
    }
    if key.prevented {
        text.push_str(" (default prevented)");
        warnings.push(format!("{} was prevented from reaching the terminal", name));
    }
    if kind == subtype::KEYDOWN && !config.is_input_target(&key.target) {
        warnings.push(format!("{} is not a terminal input element", key.target));
    }

    text
}

fn describe_background_log(
    kind: &str,
    log: &BackgroundLogData,
    warnings: &mut Vec<String>,
) -> String {
    match kind {
        subtype::FILE_WRITE => {
            let path = log.path.as_deref().unwrap_or(UNKNOWN);
            let mut text = format!("Background log wrote to {}: {}", path, log.outcome());
            if let Some(bytes) = log.bytes_written {
                text.push_str(&format!(" ({} bytes)", bytes));
            }
            if let Some(error) = &log.error {
                text.push_str(&format!(" - {}", error));
            }
            if log.is_failed_write() {
                warnings.push(format!("Transcript write to {} was not confirmed", path));
            }
            text
        }
        subtype::INPUT_CAPTURED => "Background log captured terminal input".to_string(),
        subtype::OUTPUT_CAPTURED => "Background log captured terminal output".to_string(),
        subtype::CONVERSATION_START => format!(
            "Background log started conversation {}",
            log.conversation_id.as_deref().unwrap_or(UNKNOWN)
        ),
        subtype::CONVERSATION_END => format!(
            "Background log ended conversation {}",
            log.conversation_id.as_deref().unwrap_or(UNKNOWN)
        ),
        other => format!("Background log: {}", other.replace('_', " ")),
    }
}

/// Readable key name, modifiers first ("Ctrl+Alt+Delete", "Spacebar")
pub fn key_name(key: &KeyboardData) -> String {
    let base = base_key_name(&key.key);
    let single_char = base.chars().count() == 1;
    let mut name = String::new();

    if key.modifiers.ctrl && !base.starts_with("Ctrl+") {
        name.push_str("Ctrl+");
    }
    if key.modifiers.alt {
        name.push_str("Alt+");
    }
    if key.modifiers.meta {
        name.push_str("Meta+");
    }
    // A printable character already shows its shifted form
    if key.modifiers.shift && !single_char && base != "Shift" {
        name.push_str("Shift+");
    }
    name.push_str(&base);
    name
}

fn base_key_name(key: &str) -> String {
    match key {
        " " | "Spacebar" | "Space" => "Spacebar".to_string(),
        "\r" | "\n" | "Enter" => "Enter".to_string(),
        "\t" | "Tab" => "Tab".to_string(),
        "\u{1b}" | "Escape" | "Esc" => "Escape".to_string(),
        "\u{7f}" | "\u{8}" | "Backspace" => "Backspace".to_string(),
        "ArrowUp" | "Up" => "Up arrow".to_string(),
        "ArrowDown" | "Down" => "Down arrow".to_string(),
        "ArrowLeft" | "Left" => "Left arrow".to_string(),
        "ArrowRight" | "Right" => "Right arrow".to_string(),
        "" => UNKNOWN.to_string(),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c @ '\u{1}'..='\u{1a}'), None) => {
                    format!("Ctrl+{}", (b'A' + (c as u8 - 1)) as char)
                }
                (Some(c), None) if c.is_control() => format!("U+{:04X}", c as u32),
                _ => other.to_string(),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::telemetry::event::{Modifiers, OutputData, PasteData, WireData};

    fn key_event(rel: u64, kind: &str, key: &str, target: &str) -> DiagnosticEvent {
        DiagnosticEvent::new(
            kind,
            rel as i64,
            rel,
            0,
            EventData::Keyboard(KeyboardData {
                key: key.to_string(),
                target: target.to_string(),
                ..Default::default()
            }),
        )
    }

    fn send(rel: u64, size: usize) -> DiagnosticEvent {
        DiagnosticEvent::new(
            subtype::SEND,
            rel as i64,
            rel,
            0,
            EventData::Wire(WireData {
                direction: WireDirection::Send,
                payload_size: size,
                message_type: "input".to_string(),
            }),
        )
    }

    fn paste(rel: u64) -> DiagnosticEvent {
        DiagnosticEvent::new(
            subtype::PASTE,
            rel as i64,
            rel,
            0,
            EventData::Paste(PasteData {
                content_hash: "abcd".to_string(),
                content_length: 12,
                line_count: 1,
                source: "clipboard".to_string(),
            }),
        )
    }

    #[test]
    fn test_spacebar_and_target() {
        let config = DiagnosticsConfig::default();
        let formatted = format_event(&key_event(10, "keydown", " ", "TEXTAREA"), &[], &config);
        assert_eq!(formatted.plain_text, "Pressed Spacebar in TEXTAREA");
        assert!(formatted.warnings.is_empty());
        assert_eq!(formatted.line(), "[+10ms] Pressed Spacebar in TEXTAREA");
    }

    #[test]
    fn test_wrong_target_warning() {
        let config = DiagnosticsConfig::default();
        let formatted = format_event(&key_event(10, "keydown", "a", "BODY"), &[], &config);
        assert!(formatted.plain_text.contains("BODY"));
        assert_eq!(formatted.warnings.len(), 1);
    }

    #[test]
    fn test_key_names() {
        let mut key = KeyboardData {
            key: "\u{3}".to_string(),
            ..Default::default()
        };
        assert_eq!(key_name(&key), "Ctrl+C");

        key.key = "\r".to_string();
        assert_eq!(key_name(&key), "Enter");

        key.key = "Tab".to_string();
        key.modifiers = Modifiers {
            shift: true,
            ..Default::default()
        };
        assert_eq!(key_name(&key), "Shift+Tab");

        key.key = "A".to_string();
        assert_eq!(key_name(&key), "A");

        key.key = "c".to_string();
        key.modifiers = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        assert_eq!(key_name(&key), "Ctrl+c");

        key.key = String::new();
        key.modifiers = Modifiers::default();
        assert_eq!(key_name(&key), "UNKNOWN");
    }

    #[test]
    fn test_duplicate_send_marker() {
        let config = DiagnosticsConfig::default();
        let events = vec![paste(0), send(5, 12), send(40, 12)];
        let formatted = format_events(&events, &config);

        assert!(!formatted[1].is_duplicate());
        assert!(formatted[2].is_duplicate());
        assert!(formatted[2].plain_text.contains("+5ms, 35ms earlier"));
    }

    #[test]
    fn test_no_marker_outside_window_or_size() {
        let config = DiagnosticsConfig::default();
        let far = format_events(&[paste(0), send(5, 12), send(200, 12)], &config);
        assert!(!far[2].is_duplicate());

        let sized = format_events(&[paste(0), send(5, 12), send(20, 13)], &config);
        assert!(!sized[2].is_duplicate());
    }

    #[test]
    fn test_no_marker_without_owning_paste() {
        let config = DiagnosticsConfig::default();
        let unowned = format_events(&[send(5, 12), send(40, 12)], &config);
        assert!(unowned.iter().all(|f| !f.is_duplicate()));

        let typed = format_events(
            &[paste(0), key_event(2, "keydown", "a", "TEXTAREA"), send(5, 12), send(40, 12)],
            &config,
        );
        assert!(typed.iter().all(|f| !f.is_duplicate()));
    }

    #[test]
    fn test_keydown_between_sends_is_compensating() {
        let config = DiagnosticsConfig::default();
        let events = vec![
            key_event(0, "keydown", "a", "TEXTAREA"),
            send(2, 1),
            key_event(30, "keydown", "a", "TEXTAREA"),
            send(32, 1),
        ];
        let formatted = format_events(&events, &config);
        assert!(formatted.iter().all(|f| !f.is_duplicate()));
    }

    #[test]
    fn test_file_write_includes_path_and_outcome() {
        let config = DiagnosticsConfig::default();
        let event = DiagnosticEvent::new(
            subtype::FILE_WRITE,
            0,
            0,
            0,
            EventData::BackgroundLog(BackgroundLogData {
                path: Some("/home/u/.logs/session.jsonl".to_string()),
                verified: Some(false),
                ..Default::default()
            }),
        );
        let formatted = format_event(&event, &[], &config);
        assert!(formatted.plain_text.contains("/home/u/.logs/session.jsonl"));
        assert!(formatted.plain_text.contains("NOT verified"));
        assert_eq!(formatted.warnings.len(), 1);
    }

    #[test]
    fn test_output_and_init_text() {
        let config = DiagnosticsConfig::default();
        let output = DiagnosticEvent::new("output", 0, 0, 0, EventData::Output(OutputData { length: 3 }));
        assert_eq!(
            format_event(&output, &[], &config).plain_text,
            "Terminal displayed 3 bytes of output"
        );

        let init = DiagnosticEvent::new(
            subtype::HANDLERS_ATTACHED,
            0,
            0,
            0,
            EventData::Init(Default::default()),
        );
        assert_eq!(
            format_event(&init, &[], &config).plain_text,
            "Startup phase: handlers attached"
        );
    }
}
