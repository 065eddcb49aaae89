//! Session Exporter
//!
//! Serializes the live buffer plus session metadata into a portable
//! snapshot that any external viewer (or `diag-replay`) can read back.
//! A payload that fails to serialize is replaced by a placeholder when the
//! event is converted (`event::payload_value`), so one bad payload never
//! costs the rest of the snapshot.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::event::DiagnosticEvent;
use super::format::format_events;
use super::recorder::{DiagnosticsEngine, PlatformInfo};
use crate::constants::{APP_NAME, EXPORT_DIR};
use crate::error::{DiagError, DiagResult};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::detectors::{AnalysisContext, AnalysisReport, BackendStatus, DetectorManager};

// ============================================================================
// EXPORT FORMATS
// ============================================================================

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty JSON snapshot (default)
    Json,
    /// Header line, then one event per line
    Jsonl,
    /// Plain-language log followed by the problem summary
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Text => "txt",
        }
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Portable copy of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub start_time: i64,
    #[serde(default)]
    pub platform: PlatformInfo,
    #[serde(default)]
    pub exported_at: i64,
    #[serde(default)]
    pub total_event_count: u64,
    #[serde(default)]
    pub events: Vec<DiagnosticEvent>,
}

/// Session metadata line of a JSONL export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotHeader {
    session_id: String,
    start_time: i64,
    #[serde(default)]
    platform: PlatformInfo,
    #[serde(default)]
    exported_at: i64,
    #[serde(default)]
    total_event_count: u64,
}

impl SessionSnapshot {
    /// Copy the engine's current session and buffer.
    /// Without an active session the snapshot has an empty id.
    pub fn capture(engine: &DiagnosticsEngine) -> Self {
        let (session_id, start_time, platform) = match engine.session() {
            Some(session) => (
                session.session_id.clone(),
                session.start_time,
                session.platform.clone(),
            ),
            None => (String::new(), 0, PlatformInfo::default()),
        };

        Self {
            session_id,
            start_time,
            platform,
            exported_at: engine.now_ms(),
            total_event_count: engine.get_total_event_count(),
            events: engine.get_events(),
        }
    }

    fn header(&self) -> SnapshotHeader {
        SnapshotHeader {
            session_id: self.session_id.clone(),
            start_time: self.start_time,
            platform: self.platform.clone(),
            exported_at: self.exported_at,
            total_event_count: self.total_event_count,
        }
    }

    /// Pretty JSON snapshot
    pub fn to_json(&self) -> DiagResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render in the given format. `config` drives text formatting and analysis.
    pub fn render(&self, format: ExportFormat, config: &DiagnosticsConfig) -> DiagResult<String> {
        match format {
            ExportFormat::Json => self.to_json(),
            ExportFormat::Jsonl => {
                let mut out = serde_json::to_string(&self.header())?;
                out.push('\n');
                for event in &self.events {
                    out.push_str(&serde_json::to_string(event)?);
                    out.push('\n');
                }
                Ok(out)
            }
            ExportFormat::Text => Ok(self.render_text(config)),
        }
    }

    fn render_text(&self, config: &DiagnosticsConfig) -> String {
        let mut out = String::new();
        out.push_str(&format!("Diagnostics session {}\n", self.session_id));
        out.push_str(&format!(
            "Platform: {} {} ({}), app v{}\n",
            self.platform.os,
            self.platform.arch,
            self.platform.os_version.as_deref().unwrap_or("unknown version"),
            self.platform.app_version
        ));
        out.push_str(&format!(
            "Events: {} buffered, {} recorded in total\n\n",
            self.events.len(),
            self.total_event_count
        ));

        for formatted in format_events(&self.events, config) {
            out.push_str(&formatted.line());
            out.push('\n');
        }

        let summary = self.analyze(config).summary();
        out.push_str(&format!("\nProblems detected: {}\n", summary.problem_count));
        for problem in &summary.problems {
            out.push_str(&format!("- {}: {}\n", problem.problem, problem.explanation));
        }
        out
    }

    /// Run every detector as of the export time
    pub fn analyze(&self, config: &DiagnosticsConfig) -> AnalysisReport {
        DetectorManager::new(config.clone()).analyze_all(&self.events, &self.analysis_context())
    }

    pub fn analyze_with_backend(
        &self,
        config: &DiagnosticsConfig,
        backend: &BackendStatus,
    ) -> AnalysisReport {
        DetectorManager::new(config.clone()).analyze_with_backend(
            &self.events,
            backend,
            &self.analysis_context(),
        )
    }

    fn analysis_context(&self) -> AnalysisContext {
        if self.exported_at > 0 {
            AnalysisContext::at(self.exported_at)
        } else {
            AnalysisContext::from_events(&self.events)
        }
    }

    /// Parse a JSON snapshot
    pub fn parse(json: &str) -> DiagResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSONL export (header line, then events)
    pub fn parse_jsonl(text: &str) -> DiagResult<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: SnapshotHeader = serde_json::from_str(lines.next().unwrap_or(""))?;

        let mut events = Vec::new();
        for line in lines {
            match serde_json::from_str::<DiagnosticEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Skipping unreadable event line: {}", e),
            }
        }

        Ok(Self {
            session_id: header.session_id,
            start_time: header.start_time,
            platform: header.platform,
            exported_at: header.exported_at,
            total_event_count: header.total_event_count,
            events,
        })
    }

    /// Suggested file name: `diagnostics_<id8>_<YYYYmmdd_HHMMSS>.<ext>`
    pub fn file_name(&self, format: ExportFormat) -> String {
        let id: String = if self.session_id.is_empty() {
            "nosession".to_string()
        } else {
            self.session_id.chars().take(8).collect()
        };
        let stamp = Utc
            .timestamp_millis_opt(self.exported_at)
            .single()
            .map(|t| t.format("%Y%m%d_%H%M%S").to_string())
            .unwrap_or_else(|| "00000000_000000".to_string());

        format!("diagnostics_{}_{}.{}", id, stamp, format.extension())
    }
}

// ============================================================================
// FILE EXPORT
// ============================================================================

/// Default export directory: `<local data dir>/terminal-diagnostics/sessions`
pub fn default_export_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_NAME).join(EXPORT_DIR))
}

/// Write the engine's current session to `dir` (or the default directory)
pub fn export_to_file(
    engine: &DiagnosticsEngine,
    dir: Option<&Path>,
    format: ExportFormat,
) -> DiagResult<PathBuf> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => default_export_dir().ok_or(DiagError::NoExportDirectory)?,
    };
    std::fs::create_dir_all(&dir)?;

    let snapshot = engine.export_session();
    let path = dir.join(snapshot.file_name(format));

    let mut file = std::fs::File::create(&path)?;
    file.write_all(snapshot.render(format, engine.config())?.as_bytes())?;
    file.flush()?;

    log::info!(
        "Exported diagnostics session {} ({} events) to {:?}",
        snapshot.session_id,
        snapshot.events.len(),
        path
    );
    Ok(path)
}

/// Read a snapshot written by `export_to_file` (JSON or JSONL)
pub fn read_snapshot(path: &Path) -> DiagResult<SessionSnapshot> {
    let content = std::fs::read_to_string(path)?;
    if path.extension().map_or(false, |e| e == "jsonl") {
        SessionSnapshot::parse_jsonl(&content)
    } else {
        SessionSnapshot::parse(&content)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::clock::ManualClock;
    use crate::logic::telemetry::event::{RawKeyEvent, RawTarget, WireDirection, WireInfo};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn recorded_engine() -> DiagnosticsEngine {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let mut engine = DiagnosticsEngine::with_clock(DiagnosticsConfig::default(), clock.clone());
        engine.enable();

        engine.record_init_event("mounted", serde_json::json!({}));
        clock.advance(30);
        engine.record_keyboard_event(
            &RawKeyEvent::keydown("l").with_target(RawTarget::tag("TEXTAREA")),
        );
        clock.advance(2);
        engine.record_websocket_event(WireDirection::Send, &WireInfo::new(1, "input"));
        clock.advance(5);
        engine.record_output_event(1);
        engine
    }

    #[test]
    fn test_snapshot_round_trip() {
        let engine = recorded_engine();
        let snapshot = engine.export_session();
        let parsed = SessionSnapshot::parse(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(parsed.session_id, engine.session().unwrap().session_id);
        assert_eq!(parsed.events.len(), engine.get_events().len());
        assert_eq!(parsed.total_event_count, 4);
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_snapshot_shape() {
        let snapshot = recorded_engine().export_session();
        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert!(json["sessionId"].is_string());
        assert!(json["startTime"].is_i64());
        assert!(json["platform"]["os"].is_string());
        let first = &json["events"][0];
        for field in ["category", "subtype", "timestamp", "relativeMs", "gapMs", "data"] {
            assert!(first.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_snapshot_without_session() {
        let engine = DiagnosticsEngine::with_clock(
            DiagnosticsConfig::default(),
            Arc::new(ManualClock::new(0)),
        );
        let snapshot = engine.export_session();
        assert!(snapshot.session_id.is_empty());
        assert!(snapshot.events.is_empty());
        assert!(snapshot.file_name(ExportFormat::Json).starts_with("diagnostics_nosession_"));
    }

    #[test]
    fn test_jsonl_round_trip() {
        let engine = recorded_engine();
        let snapshot = engine.export_session();
        let text = snapshot.render(ExportFormat::Jsonl, engine.config()).unwrap();
        assert_eq!(text.lines().count(), 5);

        let parsed = SessionSnapshot::parse_jsonl(&text).unwrap();
        assert_eq!(parsed.session_id, snapshot.session_id);
        assert_eq!(parsed.events, snapshot.events);
    }

    #[test]
    fn test_text_export_contains_summary() {
        let engine = recorded_engine();
        let text = engine.export_session().render(ExportFormat::Text, engine.config()).unwrap();
        assert!(text.contains("Pressed l in TEXTAREA"));
        assert!(text.contains("Problems detected: 0"));
    }

    #[test]
    fn test_export_to_file_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let engine = recorded_engine();

        for format in [ExportFormat::Json, ExportFormat::Jsonl] {
            let path = export_to_file(&engine, Some(temp_dir.path()), format).unwrap();
            assert!(path.exists());
            assert_eq!(path.extension().unwrap(), format.extension());

            let snapshot = read_snapshot(&path).unwrap();
            assert_eq!(snapshot.events.len(), 4);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SessionSnapshot::parse("not json").is_err());
        assert!(SessionSnapshot::parse_jsonl("").is_err());
    }
}
