//! Slow Hydration Detection
//!
//! After the terminal mounts there is a window in which key handlers are
//! not attached yet. Two traces give it away: a long pause between the
//! last startup phase and the first keystroke, and early keystrokes that
//! hit the wrong element while the same key pressed later lands correctly.

use super::types::{AnalysisContext, DetectionResult, ProblemDetector, ProblemKind};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::telemetry::format::key_name;
use crate::logic::telemetry::{DiagnosticEvent, EventCategory, KeyboardData};

#[derive(Debug, Clone)]
pub struct SlowHydrationDetector {
    config: DiagnosticsConfig,
}

impl SlowHydrationDetector {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// First keystroke on an input element, answered by output in time
    fn responsive(&self, events: &[DiagnosticEvent], idx: usize, key: &KeyboardData) -> Option<u64> {
        if key.prevented || !self.config.is_input_target(&key.target) {
            return None;
        }
        let pressed_at = events[idx].relative_ms;
        events[idx + 1..]
            .iter()
            .take_while(|e| e.relative_ms.saturating_sub(pressed_at) <= self.config.output_response_ms)
            .find(|e| e.is_output())
            .map(|e| e.relative_ms.saturating_sub(pressed_at))
    }

    /// Early keystroke on the wrong element, repeated later on the right one
    fn warm_up(&self, keydowns: &[(usize, &KeyboardData)]) -> Option<(usize, usize)> {
        for (n, (early_idx, early)) in keydowns.iter().enumerate().take(self.config.warmup_key_count) {
            if self.config.is_input_target(&early.target) {
                continue;
            }
            let later = keydowns[n + 1..].iter().find(|(_, k)| {
                k.key == early.key && k.code == early.code && self.config.is_input_target(&k.target)
            });
            if let Some((later_idx, _)) = later {
                return Some((*early_idx, *later_idx));
            }
        }
        None
    }
}

impl Default for SlowHydrationDetector {
    fn default() -> Self {
        Self::new(&DiagnosticsConfig::default())
    }
}

impl ProblemDetector for SlowHydrationDetector {
    fn name(&self) -> &'static str {
        "slow_hydration"
    }

    fn analyze(&self, events: &[DiagnosticEvent], _ctx: &AnalysisContext) -> DetectionResult {
        let keydowns: Vec<(usize, &KeyboardData)> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.keydown().map(|k| (i, k)))
            .collect();

        let Some(&(first_idx, first_key)) = keydowns.first() else {
            return DetectionResult::clear("No keydown events recorded");
        };
        let first = &events[first_idx];

        if let Some(delay) = self.responsive(events, first_idx, first_key) {
            return DetectionResult::clear(format!(
                "First keystroke at +{}ms reached {} and produced output {}ms later",
                first.relative_ms, first_key.target, delay
            ));
        }

        let last_init = events[..first_idx]
            .iter()
            .rev()
            .find(|e| e.category() == EventCategory::Init);

        if let Some(init) = last_init {
            let gap = first.relative_ms.saturating_sub(init.relative_ms);
            if gap > self.config.hydration_gap_ms {
                return DetectionResult::found(
                    ProblemKind::HydrationDelay,
                    format!(
                        "First keystroke at +{}ms came {}ms after the last startup phase ({} at +{}ms) and got no prompt output; threshold {}ms",
                        first.relative_ms,
                        gap,
                        init.subtype,
                        init.relative_ms,
                        self.config.hydration_gap_ms
                    ),
                );
            }
        }

        if let Some((early_idx, later_idx)) = self.warm_up(&keydowns) {
            let (early, later) = (&events[early_idx], &events[later_idx]);
            let target = |e: &DiagnosticEvent| e.keyboard().map(|k| k.target.clone()).unwrap_or_default();
            let name = early.keyboard().map(key_name).unwrap_or_default();

            return DetectionResult::found(
                ProblemKind::HydrationDelay,
                format!(
                    "Early {} keystroke at +{}ms landed on {}, while the same key at +{}ms reached {}; input handling was still warming up",
                    name,
                    early.relative_ms,
                    target(early),
                    later.relative_ms,
                    target(later)
                ),
            );
        }

        match last_init {
            Some(init) => DetectionResult::clear(format!(
                "First keystroke at +{}ms followed the last startup phase by {}ms (threshold {}ms)",
                first.relative_ms,
                first.relative_ms.saturating_sub(init.relative_ms),
                self.config.hydration_gap_ms
            )),
            None => DetectionResult::clear("No startup phases recorded before the first keystroke"),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
