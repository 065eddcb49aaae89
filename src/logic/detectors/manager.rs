//! Detector Manager
//!
//! Runs every detector over one event list and reports each verdict under
//! a stable key, plus a compact summary of what was actually found.

use serde::{Deserialize, Serialize};

use super::blocked_key::BlockedKeyDetector;
use super::duplicate_paste::DuplicatePasteDetector;
use super::slow_hydration::SlowHydrationDetector;
use super::stale_pipeline::StalePipelineDetector;
use super::types::{AnalysisContext, BackendStatus, DetectionResult, ProblemDetector, ProblemKind};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::telemetry::DiagnosticEvent;

// ============================================================================
// REPORTS
// ============================================================================

/// Every detector's verdict. Keys are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub duplicate_paste: DetectionResult,
    pub blocked_key: DetectionResult,
    pub stale_pipeline: DetectionResult,
    pub slow_hydration: DetectionResult,
}

impl AnalysisReport {
    /// (key, result) pairs in report order
    pub fn results(&self) -> [(&'static str, &DetectionResult); 4] {
        [
            ("duplicatePaste", &self.duplicate_paste),
            ("blockedKey", &self.blocked_key),
            ("stalePipeline", &self.stale_pipeline),
            ("slowHydration", &self.slow_hydration),
        ]
    }

    pub fn summary(&self) -> ProblemSummary {
        let problems: Vec<DetectedProblem> = self
            .results()
            .into_iter()
            .filter(|(_, result)| result.detected)
            .filter_map(|(detector, result)| {
                result.problem.map(|problem| DetectedProblem {
                    detector: detector.to_string(),
                    problem,
                    explanation: result.explanation.clone(),
                })
            })
            .collect();

        ProblemSummary {
            problem_count: problems.len(),
            problems,
        }
    }
}

/// One detected problem in a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedProblem {
    pub detector: String,
    pub problem: ProblemKind,
    pub explanation: String,
}

/// Only what was detected, in report order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummary {
    pub problem_count: usize,
    pub problems: Vec<DetectedProblem>,
}

impl ProblemSummary {
    pub fn is_clean(&self) -> bool {
        self.problem_count == 0
    }

    pub fn kinds(&self) -> Vec<ProblemKind> {
        self.problems.iter().map(|p| p.problem).collect()
    }
}

// ============================================================================
// MANAGER
// ============================================================================

#[derive(Debug, Clone)]
pub struct DetectorManager {
    duplicate_paste: DuplicatePasteDetector,
    blocked_key: BlockedKeyDetector,
    stale_pipeline: StalePipelineDetector,
    slow_hydration: SlowHydrationDetector,
}

impl DetectorManager {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self {
            duplicate_paste: DuplicatePasteDetector::new(&config),
            blocked_key: BlockedKeyDetector::new(&config),
            stale_pipeline: StalePipelineDetector::new(&config),
            slow_hydration: SlowHydrationDetector::new(&config),
        }
    }

    pub fn analyze_all(&self, events: &[DiagnosticEvent], ctx: &AnalysisContext) -> AnalysisReport {
        let report = AnalysisReport {
            duplicate_paste: self.duplicate_paste.analyze(events, ctx),
            blocked_key: self.blocked_key.analyze(events, ctx),
            stale_pipeline: self.stale_pipeline.analyze(events, ctx),
            slow_hydration: self.slow_hydration.analyze(events, ctx),
        };
        log_detections(&report);
        report
    }

    /// `analyze_all` with the stale-pipeline entry cross-checked against the backend
    pub fn analyze_with_backend(
        &self,
        events: &[DiagnosticEvent],
        backend: &BackendStatus,
        ctx: &AnalysisContext,
    ) -> AnalysisReport {
        let report = AnalysisReport {
            duplicate_paste: self.duplicate_paste.analyze(events, ctx),
            blocked_key: self.blocked_key.analyze(events, ctx),
            stale_pipeline: self.stale_pipeline.analyze_with_backend(events, backend, ctx),
            slow_hydration: self.slow_hydration.analyze(events, ctx),
        };
        log_detections(&report);
        report
    }

    pub fn get_summary(&self, events: &[DiagnosticEvent], ctx: &AnalysisContext) -> ProblemSummary {
        self.analyze_all(events, ctx).summary()
    }

    /// Detector names, in report order
    pub fn detector_names(&self) -> [&'static str; 4] {
        [
            self.duplicate_paste.name(),
            self.blocked_key.name(),
            self.stale_pipeline.name(),
            self.slow_hydration.name(),
        ]
    }
}

impl Default for DetectorManager {
    fn default() -> Self {
        Self::new(DiagnosticsConfig::default())
    }
}

fn log_detections(report: &AnalysisReport) {
    for (key, result) in report.results() {
        if let (true, Some(problem)) = (result.detected, result.problem) {
            log::debug!("[{}] {}: {}", key, problem, result.explanation);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
