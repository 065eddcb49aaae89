//! Detector Types

use serde::{Deserialize, Serialize};

use crate::logic::telemetry::DiagnosticEvent;

// ============================================================================
// PROBLEM KINDS
// ============================================================================

/// Stable identifiers of the UI malfunctions the detectors recognise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemKind {
    /// One paste delivered to the terminal twice
    DoublePaste,
    /// Spacebar keydown never reached the terminal
    SpacebarBlocked,
    /// Any other keydown never reached the terminal
    KeyBlocked,
    /// Background log captured activity but wrote nothing
    AmNoOutput,
    /// Background log write failed or was not verified
    AmWriteFailed,
    /// Frontend and backend disagree about the active conversation
    AmBackendMismatch,
    /// Input handling was slow to become responsive after startup
    HydrationDelay,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::DoublePaste => "DOUBLE_PASTE",
            ProblemKind::SpacebarBlocked => "SPACEBAR_BLOCKED",
            ProblemKind::KeyBlocked => "KEY_BLOCKED",
            ProblemKind::AmNoOutput => "AM_NO_OUTPUT",
            ProblemKind::AmWriteFailed => "AM_WRITE_FAILED",
            ProblemKind::AmBackendMismatch => "AM_BACKEND_MISMATCH",
            ProblemKind::HydrationDelay => "HYDRATION_DELAY",
        }
    }
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DETECTION RESULT
// ============================================================================

/// Verdict of one detector, with the evidence spelled out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub detected: bool,
    /// Set only when `detected`
    pub problem: Option<ProblemKind>,
    pub explanation: String,
}

impl DetectionResult {
    pub fn found(problem: ProblemKind, explanation: impl Into<String>) -> Self {
        Self {
            detected: true,
            problem: Some(problem),
            explanation: explanation.into(),
        }
    }

    pub fn clear(explanation: impl Into<String>) -> Self {
        Self {
            detected: false,
            problem: None,
            explanation: explanation.into(),
        }
    }

    pub fn is(&self, problem: ProblemKind) -> bool {
        self.detected && self.problem == Some(problem)
    }
}

// ============================================================================
// ANALYSIS CONTEXT
// ============================================================================

/// Inputs a detector needs besides the events themselves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisContext {
    /// Absolute "now" (epoch ms); `None` means "time of the last event"
    pub now_ms: Option<i64>,
}

impl AnalysisContext {
    pub fn at(now_ms: i64) -> Self {
        Self { now_ms: Some(now_ms) }
    }

    /// "Now" is the timestamp of the newest event
    pub fn from_events(events: &[DiagnosticEvent]) -> Self {
        Self {
            now_ms: events.last().map(|e| e.timestamp),
        }
    }

    pub fn now_or_last(&self, events: &[DiagnosticEvent]) -> i64 {
        self.now_ms
            .or_else(|| events.last().map(|e| e.timestamp))
            .unwrap_or(0)
    }
}

/// Backend's view of the background-logging pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendStatus {
    pub active_conversation_id: Option<String>,
    pub active_conversations: usize,
}

impl BackendStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn active(conversation_id: &str) -> Self {
        Self {
            active_conversation_id: Some(conversation_id.to_string()),
            active_conversations: 1,
        }
    }

    pub fn has_active(&self) -> bool {
        self.active_conversations > 0 || self.active_conversation_id.is_some()
    }
}

// ============================================================================
// DETECTOR TRAIT
// ============================================================================

/// A pure classifier over an ordered event list.
/// Implementations never mutate the events and never panic on short input.
pub trait ProblemDetector {
    fn name(&self) -> &'static str;

    fn analyze(&self, events: &[DiagnosticEvent], ctx: &AnalysisContext) -> DetectionResult;
}
