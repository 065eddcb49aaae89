//! Terminal Diagnostics - Diagnostic Event Engine
//!
//! Records what the terminal UI observes (keystrokes, pastes, focus moves,
//! transport frames, background logging, startup phases, output) into a
//! bounded buffer, renders it as a plain-language log, exports it as a
//! portable snapshot, and runs detectors for known UI malfunctions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  producers ──record_*──▶ DiagnosticsEngine ──▶ EventStore     │
//! │                                │                (ring, 500)  │
//! │            ┌───────────────────┼───────────────────┐         │
//! │            ▼                   ▼                   ▼         │
//! │        Formatter        SessionExporter     DetectorManager  │
//! │      (plain text)     (JSON / JSONL / text)  (4 detectors)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{DiagError, DiagResult};
pub use logic::clock::{Clock, ManualClock, SystemClock};
pub use logic::config::DiagnosticsConfig;
pub use logic::detectors::{
    AnalysisContext, AnalysisReport, BackendStatus, DetectionResult, DetectorManager,
    ProblemDetector, ProblemKind, ProblemSummary,
};
pub use logic::telemetry::{
    DiagnosticEvent, DiagnosticsEngine, EventCategory, ExportFormat, FormattedEvent,
    SessionSnapshot,
};
