//! Property-based invariant tests for recording and detection.
//!
//! Verifies:
//! 1. Buffer length is min(total, capacity) and keeps the newest events in order
//! 2. relativeMs never decreases and gapMs is the difference of neighbours, whatever the clock does
//! 3. Nothing recorded while disabled is ever observed
//! 4. Formatter DUPLICATE marker and duplicate-delivery verdict agree
//! 5. Detectors never panic on arbitrary event sequences
//! 6. Content hashes are deterministic and fixed-length

use std::sync::Arc;

use proptest::prelude::*;
use terminal_diagnostics::logic::detectors::fixtures::EventBuilder;
use terminal_diagnostics::logic::detectors::DuplicatePasteDetector;
use terminal_diagnostics::logic::telemetry::{content_hash, format_events, subtype};
use terminal_diagnostics::{
    AnalysisContext, BackendStatus, DiagnosticEvent, DiagnosticsConfig, DiagnosticsEngine,
    DetectorManager, ManualClock, ProblemDetector, ProblemKind,
};

// ── Strategy helpers ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Paste(usize),
    Send(usize),
    Receive(usize),
    Keydown(&'static str, &'static str),
    PreventedKey,
    Output,
    Init,
    Capture,
    Write(bool),
    ConversationStart,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..4).prop_map(Op::Paste),
        (1usize..4).prop_map(Op::Send),
        (1usize..4).prop_map(Op::Receive),
        prop_oneof![
            Just(("a", "TEXTAREA")),
            Just((" ", "TEXTAREA")),
            Just((" ", "BODY")),
            Just(("Shift", "INPUT")),
        ]
        .prop_map(|(k, t)| Op::Keydown(k, t)),
        Just(Op::PreventedKey),
        Just(Op::Output),
        Just(Op::Init),
        prop_oneof![
            Just(Op::Capture),
            any::<bool>().prop_map(Op::Write),
            Just(Op::ConversationStart),
        ],
    ]
}

/// Ops at non-decreasing relative times
fn arb_events() -> impl Strategy<Value = Vec<DiagnosticEvent>> {
    prop::collection::vec((0u64..80, arb_op()), 0..40).prop_map(|steps| {
        let mut rel = 0u64;
        steps
            .into_iter()
            .fold(EventBuilder::new(), |builder, (delta, op)| {
                rel += delta;
                match op {
                    Op::Paste(len) => builder.paste(rel, len),
                    Op::Send(size) => builder.send(rel, size),
                    Op::Receive(size) => builder.receive(rel, size),
                    Op::Keydown(key, target) => builder.keydown(rel, key, target),
                    Op::PreventedKey => builder.keydown_prevented(rel, "a", "TEXTAREA"),
                    Op::Output => builder.output(rel, 1),
                    Op::Init => builder.init(rel, subtype::MOUNTED),
                    Op::Capture => builder.capture(rel, subtype::INPUT_CAPTURED),
                    Op::Write(verified) => builder.file_write(rel, "/logs/t.jsonl", verified),
                    Op::ConversationStart => builder.conversation_start(rel, "c-1"),
                }
            })
            .build()
    })
}

fn engine_at(capacity: usize, start_ms: i64) -> (DiagnosticsEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    let config = DiagnosticsConfig::default().with_capacity(capacity);
    let mut engine = DiagnosticsEngine::with_clock(config, clock.clone());
    engine.enable();
    (engine, clock)
}

// ── Properties ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn buffer_keeps_newest_in_order(capacity in 1usize..50, count in 0usize..200) {
        let (mut engine, _) = engine_at(capacity, 0);
        for i in 0..count {
            engine.record_output_event(i);
        }

        let events = engine.get_events();
        prop_assert_eq!(events.len(), count.min(capacity));
        prop_assert_eq!(engine.get_total_event_count(), count as u64);

        let lengths: Vec<usize> = events
            .iter()
            .filter_map(|e| match &e.data {
                terminal_diagnostics::logic::telemetry::EventData::Output(o) => Some(o.length),
                _ => None,
            })
            .collect();
        let expected: Vec<usize> = (count.saturating_sub(capacity)..count).collect();
        prop_assert_eq!(lengths, expected);
    }

    #[test]
    fn relative_time_is_monotonic(steps in prop::collection::vec(-500i64..500, 1..60)) {
        let (mut engine, clock) = engine_at(500, 1_700_000_000_000);
        for step in &steps {
            clock.advance(*step);
            engine.record_output_event(1);
        }

        let events = engine.get_events();
        prop_assert_eq!(events[0].gap_ms, 0);
        for pair in events.windows(2) {
            prop_assert!(pair[1].relative_ms >= pair[0].relative_ms);
            prop_assert_eq!(pair[1].gap_ms, pair[1].relative_ms - pair[0].relative_ms);
        }
    }

    #[test]
    fn disabled_recording_is_never_observed(before in 0usize..10, during in 1usize..10) {
        let (mut engine, _) = engine_at(500, 0);
        for _ in 0..before {
            engine.record_output_event(1);
        }
        engine.disable();
        for _ in 0..during {
            engine.record_paste_event("x", "clipboard");
        }
        prop_assert_eq!(engine.get_events().len(), before);

        engine.enable();
        engine.record_paste_event("x", "clipboard");
        prop_assert_eq!(engine.get_events().len(), before + 1);
    }

    #[test]
    fn formatter_and_detector_agree(events in arb_events()) {
        let config = DiagnosticsConfig::default();
        let verdict = DuplicatePasteDetector::new(&config).analyze(&events, &AnalysisContext::default());
        let formatted = format_events(&events, &config);

        if verdict.detected {
            prop_assert_eq!(verdict.problem, Some(ProblemKind::DoublePaste));
            prop_assert!(formatted.iter().any(|f| f.is_duplicate()));
        }

        if formatted.iter().any(|f| f.is_duplicate()) {
            prop_assert!(verdict.detected);
        }
    }

    #[test]
    fn detectors_never_panic(events in arb_events(), now in proptest::option::of(any::<i64>())) {
        let manager = DetectorManager::default();
        let ctx = AnalysisContext { now_ms: now };

        let report = manager.analyze_all(&events, &ctx);
        for (_, result) in report.results() {
            prop_assert_eq!(result.detected, result.problem.is_some());
            prop_assert!(!result.explanation.is_empty());
        }

        let summary = manager.get_summary(&events, &ctx);
        prop_assert_eq!(summary.problem_count, summary.problems.len());

        let _ = manager.analyze_with_backend(&events, &BackendStatus::idle(), &ctx);
        let _ = manager.analyze_with_backend(&events, &BackendStatus::active("c-2"), &ctx);
    }

    #[test]
    fn content_hash_is_deterministic(text in ".*") {
        let a = content_hash(&text);
        prop_assert_eq!(&a, &content_hash(&text));
        prop_assert_eq!(a.len(), 16);
        prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
