//! Stale Background Pipeline Detection
//!
//! The background logger reports what it captured (`input_captured`,
//! `output_captured`) and what it persisted (`file_write`). Captures that
//! are never followed by a successful write, or writes that report a
//! failure, mean the transcript on disk is silently falling behind.

use super::types::{AnalysisContext, BackendStatus, DetectionResult, ProblemDetector, ProblemKind};
use crate::constants::UNKNOWN;
use crate::logic::config::DiagnosticsConfig;
use crate::logic::telemetry::{subtype, DiagnosticEvent, EventCategory};

#[derive(Debug, Clone)]
pub struct StalePipelineDetector {
    threshold_ms: u64,
}

impl StalePipelineDetector {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            threshold_ms: config.stale_pipeline_ms,
        }
    }

    /// Cross-check the frontend's view of the active conversation against
    /// the backend's. Falls back to `analyze` when both agree.
    pub fn analyze_with_backend(
        &self,
        events: &[DiagnosticEvent],
        backend: &BackendStatus,
        ctx: &AnalysisContext,
    ) -> DetectionResult {
        if let Some(start) = active_conversation(events) {
            let frontend_id = start
                .background_log()
                .and_then(|d| d.conversation_id.as_deref())
                .unwrap_or(UNKNOWN);

            if !backend.has_active() {
                return DetectionResult::found(
                    ProblemKind::AmBackendMismatch,
                    format!(
                        "Frontend believes conversation {} (started at +{}ms) is active, but the backend reports no active conversations; captured activity is not being logged",
                        frontend_id, start.relative_ms
                    ),
                );
            }

            if let Some(backend_id) = backend.active_conversation_id.as_deref() {
                if frontend_id != UNKNOWN && backend_id != frontend_id {
                    return DetectionResult::found(
                        ProblemKind::AmBackendMismatch,
                        format!(
                            "Frontend believes conversation {} is active, but the backend is logging conversation {}",
                            frontend_id, backend_id
                        ),
                    );
                }
            }
        }

        self.analyze(events, ctx)
    }
}

impl Default for StalePipelineDetector {
    fn default() -> Self {
        Self::new(&DiagnosticsConfig::default())
    }
}

impl ProblemDetector for StalePipelineDetector {
    fn name(&self) -> &'static str {
        "stale_pipeline"
    }

    fn analyze(&self, events: &[DiagnosticEvent], ctx: &AnalysisContext) -> DetectionResult {
        let log_events: Vec<&DiagnosticEvent> = events
            .iter()
            .filter(|e| e.category() == EventCategory::BackgroundLog)
            .collect();

        if log_events.is_empty() {
            return DetectionResult::clear("No background-log events recorded");
        }

        // 1. Failed or unverified writes, regardless of timing
        let failed: Vec<&DiagnosticEvent> = log_events
            .iter()
            .copied()
            .filter(|e| is_write(e) && e.background_log().map_or(false, |d| d.is_failed_write()))
            .collect();

        if let Some(first) = failed.first() {
            let data = first.background_log().cloned().unwrap_or_default();
            let mut explanation = format!(
                "Background log write to {} at +{}ms {}",
                data.path.as_deref().unwrap_or(UNKNOWN),
                first.relative_ms,
                data.outcome()
            );
            if let Some(error) = &data.error {
                explanation.push_str(&format!(": {}", error));
            }
            if failed.len() > 1 {
                explanation.push_str(&format!(" ({} failed writes in total)", failed.len()));
            }
            return DetectionResult::found(ProblemKind::AmWriteFailed, explanation);
        }

        // 2. Captures still waiting for a write
        let last_write = log_events.iter().rposition(|e| is_write(e));
        let pending: Vec<&DiagnosticEvent> = log_events
            .iter()
            .skip(last_write.map_or(0, |i| i + 1))
            .copied()
            .filter(|e| is_capture(e))
            .collect();

        let Some(oldest) = pending.first() else {
            return DetectionResult::clear(match last_write {
                Some(i) => format!(
                    "Every capture was followed by a successful file write (last at +{}ms)",
                    log_events[i].relative_ms
                ),
                None => "No background-log activity captured yet".to_string(),
            });
        };

        let now = ctx.now_or_last(events);
        let waiting = now.saturating_sub(oldest.timestamp).max(0) as u64;

        if waiting > self.threshold_ms {
            DetectionResult::found(
                ProblemKind::AmNoOutput,
                format!(
                    "Background log captured activity at +{}ms ({} capture(s) pending) but nothing has been written for {}ms (threshold {}ms)",
                    oldest.relative_ms,
                    pending.len(),
                    waiting,
                    self.threshold_ms
                ),
            )
        } else {
            DetectionResult::clear(format!(
                "{} capture(s) waiting {}ms for a file write (threshold {}ms)",
                pending.len(),
                waiting,
                self.threshold_ms
            ))
        }
    }
}

fn is_write(event: &DiagnosticEvent) -> bool {
    event.subtype == subtype::FILE_WRITE
}

fn is_capture(event: &DiagnosticEvent) -> bool {
    event.subtype == subtype::INPUT_CAPTURED || event.subtype == subtype::OUTPUT_CAPTURED
}

/// Last `conversation_start` with no `conversation_end` after it
fn active_conversation(events: &[DiagnosticEvent]) -> Option<&DiagnosticEvent> {
    let start = events
        .iter()
        .rposition(|e| e.is(EventCategory::BackgroundLog, subtype::CONVERSATION_START))?;

    let ended = events[start + 1..]
        .iter()
        .any(|e| e.is(EventCategory::BackgroundLog, subtype::CONVERSATION_END));

    if ended {
        None
    } else {
        Some(&events[start])
    }
}

// ============================================================================
// TESTS
// ============================================================================
