//! Duplicate Delivery Detection
//!
//! One paste should reach the transport as one frame. Two outgoing frames
//! of identical size inside a short window, with no fresh user input
//! between them, mean the paste handler fired twice.
//!
//! `find_duplicate_after_paste` is the single definition of "duplicate
//! send"; the formatter and the detector both call it.

use super::types::{AnalysisContext, DetectionResult, ProblemDetector, ProblemKind};
use crate::logic::config::DiagnosticsConfig;
use crate::logic::telemetry::{DiagnosticEvent, EventCategory};

/// A fresh user action that legitimately explains another send
fn is_compensating(event: &DiagnosticEvent) -> bool {
    event.category() == EventCategory::Paste || event.keydown().is_some()
}

/// Find an earlier send that `send` duplicates.
///
/// Only sends owned by a paste count: the nearest paste or keydown before
/// `send` in `preceding` must be a paste. The matching send is searched
/// backwards and the search stops at the window edge or at a compensating
/// event. Returns `None` if `send` is not an outgoing wire frame.
pub fn find_duplicate_after_paste<'a>(
    preceding: &'a [DiagnosticEvent],
    send: &DiagnosticEvent,
    window_ms: u64,
) -> Option<&'a DiagnosticEvent> {
    duplicate_after_paste_index(preceding, send, window_ms).map(|i| &preceding[i])
}

fn duplicate_after_paste_index(
    preceding: &[DiagnosticEvent],
    send: &DiagnosticEvent,
    window_ms: u64,
) -> Option<usize> {
    let owner = preceding
        .iter()
        .rev()
        .find(|e| e.paste().is_some() || e.keydown().is_some())?;
    if owner.paste().is_none() {
        return None;
    }
    prior_duplicate_index(preceding, send, window_ms)
}

fn prior_duplicate_index(
    preceding: &[DiagnosticEvent],
    send: &DiagnosticEvent,
    window_ms: u64,
) -> Option<usize> {
    let size = send.wire_send()?.payload_size;

    for (i, prior) in preceding.iter().enumerate().rev() {
        if send.relative_ms.saturating_sub(prior.relative_ms) > window_ms {
            return None;
        }
        if is_compensating(prior) {
            return None;
        }
        if prior.wire_send().map_or(false, |w| w.payload_size == size) {
            return Some(i);
        }
    }

    None
}

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct DuplicatePasteDetector {
    window_ms: u64,
}

impl DuplicatePasteDetector {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            window_ms: config.duplicate_window_ms,
        }
    }
}

impl Default for DuplicatePasteDetector {
    fn default() -> Self {
        Self::new(&DiagnosticsConfig::default())
    }
}

impl ProblemDetector for DuplicatePasteDetector {
    fn name(&self) -> &'static str {
        "duplicate_paste"
    }

    fn analyze(&self, events: &[DiagnosticEvent], _ctx: &AnalysisContext) -> DetectionResult {
        // Index of the paste that owns the current run of sends
        let mut paste_idx: Option<usize> = None;
        let mut pastes = 0usize;
        let mut sends_after_paste = 0usize;
        let mut first_hit: Option<(usize, usize, usize)> = None;
        let mut duplicates = 0usize;

        for (i, event) in events.iter().enumerate() {
            if event.paste().is_some() {
                paste_idx = Some(i);
                pastes += 1;
                continue;
            }
            if event.keydown().is_some() {
                paste_idx = None;
                continue;
            }
            let Some(p) = paste_idx else { continue };
            if event.wire_send().is_none() {
                continue;
            }

            sends_after_paste += 1;
            if let Some(prior) = duplicate_after_paste_index(&events[..i], event, self.window_ms) {
                duplicates += 1;
                if first_hit.is_none() {
                    first_hit = Some((p, prior, i));
                }
            }
        }

        if let Some((p, a, b)) = first_hit {
            let paste = &events[p];
            let length = paste.paste().map(|d| d.content_length).unwrap_or(0);
            let size = events[b].wire_send().map(|w| w.payload_size).unwrap_or(0);
            let (first, second) = (&events[a], &events[b]);

            return DetectionResult::found(
                ProblemKind::DoublePaste,
                format!(
                    "Paste of {} characters at +{}ms was delivered twice: two wire sends of {} bytes at +{}ms and +{}ms ({}ms apart, window {}ms){}",
                    length,
                    paste.relative_ms,
                    size,
                    first.relative_ms,
                    second.relative_ms,
                    second.relative_ms.saturating_sub(first.relative_ms),
                    self.window_ms,
                    if duplicates > 1 {
                        format!("; {} duplicate sends in total", duplicates)
                    } else {
                        String::new()
                    }
                ),
            );
        }

        if pastes == 0 {
            DetectionResult::clear("No paste events recorded")
        } else if sends_after_paste < 2 {
            DetectionResult::clear(format!(
                "{} paste(s) followed by {} wire send(s); nothing was sent twice",
                pastes, sends_after_paste
            ))
        } else {
            DetectionResult::clear(format!(
                "{} wire sends after {} paste(s), none of equal size within {}ms of each other",
                sends_after_paste, pastes, self.window_ms
            ))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
