//! Blocked Key Detection
//!
//! A keydown that never reaches the terminal shows up as one of three
//! shapes in the event log: the handler swallowed it (`prevented`), focus
//! sat on the wrong element, or the keystroke simply produced no output
//! before the next one arrived.

use super::types::{AnalysisContext, DetectionResult, ProblemDetector, ProblemKind};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::telemetry::format::key_name;
use crate::logic::telemetry::{DiagnosticEvent, KeyboardData};

/// Keys that never produce terminal output on their own
const MODIFIER_KEYS: &[&str] = &["Shift", "Control", "Alt", "Meta", "CapsLock", "AltGraph", "OS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockCause {
    Prevented,
    WrongTarget,
    NoOutput,
}

#[derive(Debug, Clone)]
pub struct BlockedKeyDetector {
    config: DiagnosticsConfig,
}

impl BlockedKeyDetector {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Why the keydown at `idx` was blocked, if it was.
    /// `None` also covers a keydown still waiting for its output.
    fn cause(&self, events: &[DiagnosticEvent], idx: usize, key: &KeyboardData) -> Option<BlockCause> {
        if key.prevented {
            return Some(BlockCause::Prevented);
        }
        if !self.config.is_input_target(&key.target) {
            return Some(BlockCause::WrongTarget);
        }
        if is_modifier_only(key) {
            return None;
        }

        for later in &events[idx + 1..] {
            if later.is_output() {
                return None;
            }
            if later.keydown().is_some() {
                return Some(BlockCause::NoOutput);
            }
        }
        // Nothing after it yet: pending
        None
    }

    fn explain(&self, event: &DiagnosticEvent, key: &KeyboardData, cause: BlockCause) -> String {
        let name = key_name(key);
        match cause {
            BlockCause::Prevented => format!(
                "{} keydown at +{}ms on {} was prevented by a handler (defaultPrevented) and never reached the terminal",
                name, event.relative_ms, key.target
            ),
            BlockCause::WrongTarget => format!(
                "{} keydown at +{}ms landed on {} instead of an input element ({}); keyboard focus was in the wrong place",
                name,
                event.relative_ms,
                key.target,
                self.config.input_targets.join(", ")
            ),
            BlockCause::NoOutput => format!(
                "{} keydown at +{}ms on {} produced no terminal output before the next keystroke",
                name, event.relative_ms, key.target
            ),
        }
    }
}

impl Default for BlockedKeyDetector {
    fn default() -> Self {
        Self::new(&DiagnosticsConfig::default())
    }
}

impl ProblemDetector for BlockedKeyDetector {
    fn name(&self) -> &'static str {
        "blocked_key"
    }

    fn analyze(&self, events: &[DiagnosticEvent], _ctx: &AnalysisContext) -> DetectionResult {
        let mut keydowns = 0usize;
        let mut blocked = 0usize;
        let mut first: Option<(usize, BlockCause)> = None;

        for (i, event) in events.iter().enumerate() {
            let Some(key) = event.keydown() else { continue };
            keydowns += 1;

            if let Some(cause) = self.cause(events, i, key) {
                blocked += 1;
                first.get_or_insert((i, cause));
            }
        }

        let Some((idx, cause)) = first else {
            return if keydowns == 0 {
                DetectionResult::clear("No keydown events recorded")
            } else {
                DetectionResult::clear(format!(
                    "All {} keydown(s) reached an input element without being prevented",
                    keydowns
                ))
            };
        };

        let event = &events[idx];
        let Some(key) = event.keydown() else {
            return DetectionResult::clear("No keydown events recorded");
        };

        let problem = if is_space(key) {
            ProblemKind::SpacebarBlocked
        } else {
            ProblemKind::KeyBlocked
        };

        let mut explanation = self.explain(event, key, cause);
        if blocked > 1 {
            explanation.push_str(&format!(" ({} of {} keydowns blocked)", blocked, keydowns));
        }

        DetectionResult::found(problem, explanation)
    }
}

fn is_space(key: &KeyboardData) -> bool {
    key.key == " " || key.key == "Space" || key.key == "Spacebar"
}

fn is_modifier_only(key: &KeyboardData) -> bool {
    key.modifiers.meta || MODIFIER_KEYS.contains(&key.key.as_str())
}

// ============================================================================
// TESTS
// ============================================================================
