//! Process-wide diagnostics engine
//!
//! Free-function recording surface for producers that have no engine
//! handle of their own. Independent `DiagnosticsEngine` instances (one per
//! window, for example) remain available and never share state with this one.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;

use super::event::{DiagnosticEvent, RawFocusEvent, RawKeyEvent, WireDirection, WireInfo};
use super::exporter::SessionSnapshot;
use super::format::FormattedEvent;
use super::recorder::{DiagnosticsEngine, EngineStats};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::detectors::ProblemSummary;

// ============================================================================
// STATE
// ============================================================================

static ENGINE: Lazy<Mutex<DiagnosticsEngine>> =
    Lazy::new(|| Mutex::new(DiagnosticsEngine::new(DiagnosticsConfig::from_env())));

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Replace the process-wide engine with one built from `config`.
/// Any previous session is cleaned up first.
pub fn init(config: DiagnosticsConfig) {
    let mut guard = ENGINE.lock();
    guard.cleanup();
    *guard = DiagnosticsEngine::new(config);
}

pub fn enable() {
    ENGINE.lock().enable();
}

pub fn disable() {
    ENGINE.lock().disable();
}

pub fn cleanup() {
    ENGINE.lock().cleanup();
}

pub fn is_enabled() -> bool {
    ENGINE.lock().is_enabled()
}

/// Run `f` with the process-wide engine locked
pub fn with_engine<R>(f: impl FnOnce(&mut DiagnosticsEngine) -> R) -> R {
    f(&mut ENGINE.lock())
}

// ============================================================================
// RECORDING
// ============================================================================

pub fn record_keyboard_event(raw: &RawKeyEvent) {
    ENGINE.lock().record_keyboard_event(raw);
}

pub fn record_paste_event(text: &str, source: &str) {
    ENGINE.lock().record_paste_event(text, source);
}

pub fn record_focus_event(raw: &RawFocusEvent) {
    ENGINE.lock().record_focus_event(raw);
}

pub fn record_websocket_event(direction: WireDirection, info: &WireInfo) {
    ENGINE.lock().record_websocket_event(direction, info);
}

pub fn record_am_event(action: &str, payload: Value) {
    ENGINE.lock().record_am_event(action, payload);
}

pub fn record_init_event(phase: &str, payload: Value) {
    ENGINE.lock().record_init_event(phase, payload);
}

pub fn record_output_event(length: usize) {
    ENGINE.lock().record_output_event(length);
}

// ============================================================================
// QUERY API
// ============================================================================

pub fn get_events() -> Vec<DiagnosticEvent> {
    ENGINE.lock().get_events()
}

pub fn get_total_event_count() -> u64 {
    ENGINE.lock().get_total_event_count()
}

pub fn get_formatted_events() -> Vec<FormattedEvent> {
    ENGINE.lock().get_formatted_events()
}

pub fn export_session() -> SessionSnapshot {
    ENGINE.lock().export_session()
}

pub fn summary() -> ProblemSummary {
    ENGINE.lock().summary()
}

pub fn stats() -> EngineStats {
    ENGINE.lock().stats()
}
