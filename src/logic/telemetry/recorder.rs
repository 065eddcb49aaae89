//! Diagnostic Event Recorder
//!
//! `DiagnosticsEngine` owns one recording session: the circular buffer,
//! the session identity and the clock. Producers call the `record_*`
//! methods from hot paths (every keystroke), so recording never fails,
//! never panics and does nothing at all while disabled.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::event::{
    BackgroundLogData, DiagnosticEvent, EventCategory, EventData, InitData, OutputData,
    PasteData, RawFocusEvent, RawKeyEvent, WireData, WireDirection, WireInfo,
};
use super::format::{format_events, FormattedEvent};
use super::exporter::SessionSnapshot;
use super::privacy::{content_hash, content_length, sanitize_payload};
use super::store::EventStore;
use crate::constants::{APP_VERSION, UNKNOWN};
use crate::logic::clock::{Clock, SystemClock};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::detectors::{AnalysisContext, AnalysisReport, BackendStatus, DetectorManager, ProblemSummary};

// ============================================================================
// SESSION
// ============================================================================

/// Static platform description, captured once per session (triage only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub cpu_count: usize,
    pub app_version: String,
}

impl PlatformInfo {
    pub fn collect() -> Self {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_cpu();

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            os_name: System::name(),
            os_version: System::os_version(),
            kernel_version: System::kernel_version(),
            cpu_count: sys.cpus().len().max(1),
            app_version: APP_VERSION.to_string(),
        }
    }
}

/// One diagnostic recording lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    /// Absolute start (epoch ms); every `relative_ms` is measured from here
    pub start_time: i64,
    pub platform: PlatformInfo,
}

impl Session {
    fn start(now_ms: i64) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            start_time: now_ms,
            platform: PlatformInfo::collect(),
        }
    }
}

// ============================================================================
// STATS
// ============================================================================

/// Statistics about the current session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub session_id: Option<String>,
    pub enabled: bool,
    pub buffered: usize,
    pub capacity: usize,
    pub total_event_count: u64,
    pub evicted: u64,
    pub by_category: BTreeMap<EventCategory, usize>,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct DiagnosticsEngine {
    config: DiagnosticsConfig,
    clock: Arc<dyn Clock>,
    store: EventStore,
    session: Option<Session>,
    enabled: bool,
    /// `relative_ms` of the most recently pushed event
    last_relative_ms: Option<u64>,
}

impl DiagnosticsEngine {
    /// Engine on the wall clock
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Engine on an injected clock (tests, replay)
    pub fn with_clock(config: DiagnosticsConfig, clock: Arc<dyn Clock>) -> Self {
        let mut engine = Self {
            store: EventStore::new(config.capacity),
            config,
            clock,
            session: None,
            enabled: false,
            last_relative_ms: None,
        };

        if engine.config.enable_on_start {
            engine.enable();
        }
        engine
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Start recording. Opens a new session if none is active.
    pub fn enable(&mut self) {
        if self.session.is_none() {
            let session = Session::start(self.clock.now_ms());
            log::info!(
                "Diagnostics session {} started ({} {})",
                session.session_id,
                session.platform.os,
                session.platform.arch
            );
            self.session = Some(session);
        }
        self.enabled = true;
    }

    /// Stop recording; the buffer and session are kept
    pub fn disable(&mut self) {
        if self.enabled {
            log::info!("Diagnostics recording disabled ({} events buffered)", self.store.len());
        }
        self.enabled = false;
    }

    /// Destroy the session: clear the buffer, reset counters and identity
    pub fn cleanup(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!(
                "Diagnostics session {} cleaned up. Total events: {}",
                session.session_id,
                self.store.total_event_count()
            );
        }
        self.store.clear();
        self.enabled = false;
        self.last_relative_ms = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ------------------------------------------------------------------------
    // Recorders
    // ------------------------------------------------------------------------

    pub fn record_keyboard_event(&mut self, raw: &RawKeyEvent) {
        if !self.enabled {
            return;
        }
        let (kind, data) = raw.normalize();
        self.push(kind, EventData::Keyboard(data));
    }

    /// Record a paste. Only a fingerprint and the length are kept.
    pub fn record_paste_event(&mut self, text: &str, source: &str) {
        if !self.enabled {
            return;
        }
        let data = PasteData {
            content_hash: content_hash(text),
            content_length: content_length(text),
            line_count: text.lines().count(),
            source: non_empty_or_unknown(source),
        };
        self.push(super::event::subtype::PASTE.to_string(), EventData::Paste(data));
    }

    pub fn record_focus_event(&mut self, raw: &RawFocusEvent) {
        if !self.enabled {
            return;
        }
        let (kind, data) = raw.normalize();
        self.push(kind, EventData::Focus(data));
    }

    pub fn record_websocket_event(&mut self, direction: WireDirection, info: &WireInfo) {
        if !self.enabled {
            return;
        }
        let data = WireData {
            direction,
            payload_size: info.length.unwrap_or(0),
            message_type: info
                .message_type
                .as_deref()
                .map(non_empty_or_unknown)
                .unwrap_or_else(|| UNKNOWN.to_string()),
        };
        self.push(direction.as_str().to_string(), EventData::Wire(data));
    }

    /// Record a background-logging pipeline event (`action` is the subtype)
    pub fn record_am_event(&mut self, action: &str, payload: Value) {
        if !self.enabled {
            return;
        }
        let data = background_log_data(sanitize_payload(payload));
        self.push(normalize_label(action), EventData::BackgroundLog(data));
    }

    /// Record a startup lifecycle phase (`phase` is the subtype)
    pub fn record_init_event(&mut self, phase: &str, payload: Value) {
        if !self.enabled {
            return;
        }
        let data = InitData {
            details: sanitize_payload(payload),
        };
        self.push(normalize_label(phase), EventData::Init(data));
    }

    /// Record that the terminal rendered `length` bytes of output
    pub fn record_output_event(&mut self, length: usize) {
        if !self.enabled {
            return;
        }
        self.push(
            super::event::subtype::OUTPUT.to_string(),
            EventData::Output(OutputData { length }),
        );
    }

    fn push(&mut self, subtype: String, data: EventData) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let now = self.clock.now_ms();
        // Clamp so relative time never runs backwards with the wall clock
        let elapsed = (now - session.start_time).max(0) as u64;
        let relative_ms = elapsed.max(self.last_relative_ms.unwrap_or(0));
        let gap_ms = self
            .last_relative_ms
            .map(|last| relative_ms - last)
            .unwrap_or(0);

        log::trace!("{} {} at +{}ms", data.category().as_str(), subtype, relative_ms);

        self.store
            .push(DiagnosticEvent::new(subtype, now, relative_ms, gap_ms, data));
        self.last_relative_ms = Some(relative_ms);
    }

    // ------------------------------------------------------------------------
    // Consumers
    // ------------------------------------------------------------------------

    /// Buffer contents, oldest to newest
    pub fn get_events(&self) -> Vec<DiagnosticEvent> {
        self.store.get_events()
    }

    pub fn events(&self) -> impl DoubleEndedIterator<Item = &DiagnosticEvent> + '_ {
        self.store.iter()
    }

    pub fn get_total_event_count(&self) -> u64 {
        self.store.total_event_count()
    }

    pub fn get_formatted_events(&self) -> Vec<FormattedEvent> {
        format_events(&self.get_events(), &self.config)
    }

    pub fn export_session(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self)
    }

    /// Run every detector over the live buffer at the engine's "now"
    pub fn analyze(&self) -> AnalysisReport {
        DetectorManager::new(self.config.clone())
            .analyze_all(&self.get_events(), &AnalysisContext::at(self.now_ms()))
    }

    pub fn analyze_with_backend(&self, backend: &BackendStatus) -> AnalysisReport {
        DetectorManager::new(self.config.clone()).analyze_with_backend(
            &self.get_events(),
            backend,
            &AnalysisContext::at(self.now_ms()),
        )
    }

    pub fn summary(&self) -> ProblemSummary {
        self.analyze().summary()
    }

    pub fn stats(&self) -> EngineStats {
        let mut by_category = BTreeMap::new();
        for event in self.store.iter() {
            *by_category.entry(event.category()).or_insert(0) += 1;
        }

        EngineStats {
            session_id: self.session.as_ref().map(|s| s.session_id.clone()),
            enabled: self.enabled,
            buffered: self.store.len(),
            capacity: self.store.capacity(),
            total_event_count: self.store.total_event_count(),
            evicted: self.store.evicted_count(),
            by_category,
        }
    }
}

impl Default for DiagnosticsEngine {
    fn default() -> Self {
        Self::new(DiagnosticsConfig::default())
    }
}

impl std::fmt::Debug for DiagnosticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsEngine")
            .field("session", &self.session.as_ref().map(|s| &s.session_id))
            .field("enabled", &self.enabled)
            .field("buffered", &self.store.len())
            .field("total", &self.store.total_event_count())
            .finish()
    }
}

// ============================================================================
// NORMALIZATION HELPERS
// ============================================================================

fn non_empty_or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

/// "Handlers Attached" -> "handlers_attached"
fn normalize_label(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        return UNKNOWN.to_string();
    }
    label
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Lift the well-known pipeline fields out of a sanitised payload
fn background_log_data(mut fields: Map<String, Value>) -> BackgroundLogData {
    let path = take_string(&mut fields, &["path", "filePath", "file"]);
    let error = take_string(&mut fields, &["error", "errorMessage"]);
    let conversation_id = take_string(&mut fields, &["conversationId", "conversation"]);
    let success = take_bool(&mut fields, &["success", "ok"]);
    let verified = take_bool(&mut fields, &["verified"]);
    let bytes_written = ["bytesWritten", "bytes", "size"]
        .iter()
        .find_map(|key| fields.remove(*key).and_then(|v| v.as_u64()));

    BackgroundLogData {
        path,
        success,
        verified,
        bytes_written,
        error,
        conversation_id,
        extra: fields,
    }
}

fn take_string(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.remove(*key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

fn take_bool(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| fields.remove(*key).and_then(|v| v.as_bool()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::clock::ManualClock;
    use crate::logic::telemetry::event::RawTarget;
    use serde_json::json;

    fn engine_at(start_ms: i64) -> (DiagnosticsEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        let mut engine = DiagnosticsEngine::with_clock(DiagnosticsConfig::default(), clock.clone());
        engine.enable();
        (engine, clock)
    }

    #[test]
    fn test_platform_info_collected() {
        let platform = PlatformInfo::collect();
        assert!(platform.cpu_count >= 1);
        assert_eq!(platform.os, std::env::consts::OS);
        assert_eq!(platform.app_version, APP_VERSION);
    }

    #[test]
    fn test_disabled_engine_records_nothing() {
        let clock = Arc::new(ManualClock::new(0));
        let mut engine = DiagnosticsEngine::with_clock(DiagnosticsConfig::default(), clock);
        engine.record_output_event(10);
        assert!(engine.get_events().is_empty());
        assert!(engine.session().is_none());

        engine.enable();
        engine.disable();
        engine.record_paste_event("ls", "clipboard");
        assert!(engine.get_events().is_empty());
        assert_eq!(engine.get_total_event_count(), 0);

        engine.enable();
        engine.record_paste_event("ls", "clipboard");
        assert_eq!(engine.get_events().len(), 1);
    }

    #[test]
    fn test_relative_and_gap_times() {
        let (mut engine, clock) = engine_at(10_000);
        clock.advance(50);
        engine.record_keyboard_event(&RawKeyEvent::keydown("a"));
        clock.advance(20);
        engine.record_output_event(1);

        let events = engine.get_events();
        assert_eq!(events[0].relative_ms, 50);
        assert_eq!(events[0].gap_ms, 0);
        assert_eq!(events[0].timestamp, 10_050);
        assert_eq!(events[1].relative_ms, 70);
        assert_eq!(events[1].gap_ms, 20);
    }

    #[test]
    fn test_relative_time_never_decreases() {
        let (mut engine, clock) = engine_at(10_000);
        clock.advance(500);
        engine.record_output_event(1);
        clock.set(9_000); // wall clock stepped back
        engine.record_output_event(2);

        let events = engine.get_events();
        assert_eq!(events[1].relative_ms, 500);
        assert_eq!(events[1].gap_ms, 0);
    }

    #[test]
    fn test_paste_never_stores_content() {
        let (mut engine, _) = engine_at(0);
        engine.record_paste_event("rm -rf secret", "clipboard");
        engine.record_paste_event("rm -rf secret", "clipboard");

        let events = engine.get_events();
        let first = events[0].paste().unwrap();
        assert_eq!(first.content_length, 13);
        assert_eq!(first.content_hash, events[1].paste().unwrap().content_hash);

        let json = serde_json::to_value(&events[0]).unwrap();
        assert!(json["data"].get("content").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_malformed_inputs_use_defaults() {
        let (mut engine, _) = engine_at(0);
        engine.record_keyboard_event(&RawKeyEvent::default());
        engine.record_focus_event(&RawFocusEvent::default());
        engine.record_websocket_event(WireDirection::Send, &WireInfo::default());
        engine.record_paste_event("", "");
        engine.record_init_event("", Value::Null);

        let events = engine.get_events();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].keyboard().unwrap().target, "UNKNOWN");
        assert_eq!(events[2].wire().unwrap().payload_size, 0);
        assert_eq!(events[3].paste().unwrap().source, "UNKNOWN");
        assert_eq!(events[4].subtype, "UNKNOWN");
    }

    #[test]
    fn test_am_event_fields_are_lifted() {
        let (mut engine, _) = engine_at(0);
        engine.record_am_event(
            "file_write",
            json!({ "path": "/logs/a.jsonl", "verified": false, "bytes": 120, "text": "secret" }),
        );

        let events = engine.get_events();
        let data = events[0].background_log().unwrap();
        assert_eq!(data.path.as_deref(), Some("/logs/a.jsonl"));
        assert_eq!(data.verified, Some(false));
        assert_eq!(data.bytes_written, Some(120));
        assert!(data.extra.get("text").is_none());
        assert!(data.extra.get("textHash").is_some());
    }

    #[test]
    fn test_init_phase_label_normalized() {
        let (mut engine, _) = engine_at(0);
        engine.record_init_event("Handlers Attached", json!({ "component": "Terminal" }));
        assert_eq!(engine.get_events()[0].subtype, "handlers_attached");
    }

    #[test]
    fn test_cleanup_starts_fresh_session() {
        let (mut engine, clock) = engine_at(1_000);
        let first_id = engine.session().unwrap().session_id.clone();
        engine.record_output_event(5);

        engine.cleanup();
        engine.cleanup();
        assert!(engine.session().is_none());
        assert!(!engine.is_enabled());
        assert_eq!(engine.get_total_event_count(), 0);

        clock.advance(5_000);
        engine.enable();
        let session = engine.session().unwrap();
        assert_ne!(session.session_id, first_id);
        assert_eq!(session.start_time, 6_000);

        engine.record_output_event(1);
        assert_eq!(engine.get_events()[0].gap_ms, 0);
        assert_eq!(engine.get_events()[0].relative_ms, 0);
    }

    #[test]
    fn test_stats_by_category() {
        let (mut engine, _) = engine_at(0);
        engine.record_keyboard_event(
            &RawKeyEvent::keydown("a").with_target(RawTarget::tag("TEXTAREA")),
        );
        engine.record_output_event(1);
        engine.record_output_event(1);

        let stats = engine.stats();
        assert!(stats.enabled);
        assert_eq!(stats.buffered, 3);
        assert_eq!(stats.by_category.get(&EventCategory::Output), Some(&2));
        assert_eq!(stats.by_category.get(&EventCategory::Keyboard), Some(&1));
    }

    #[test]
    fn test_enable_on_start() {
        let engine = DiagnosticsEngine::with_clock(
            DiagnosticsConfig::default().enabled(),
            Arc::new(ManualClock::new(0)),
        );
        assert!(engine.is_enabled());
        assert!(engine.session().is_some());
    }
}
