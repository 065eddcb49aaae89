//! Telemetry Module
//!
//! Diagnostic event recording for the terminal UI.
//! Producers (key capture, paste capture, transport, background logging,
//! startup lifecycle) record into a bounded buffer; consumers read it back
//! as plain language, as a portable snapshot, or through the detectors.
//!
//! ## Structure
//! - `event.rs` - DiagnosticEvent + payloads (immutable, timestamped)
//! - `privacy.rs` - content fingerprints, payload sanitising
//! - `store.rs` - fixed-capacity circular buffer
//! - `recorder.rs` - DiagnosticsEngine (session lifecycle + recorders)
//! - `format.rs` - plain-language formatting
//! - `exporter.rs` - session snapshot export / import
//! - `global.rs` - process-wide engine handle
//!
//! ## Usage
//! ```ignore
//! use terminal_diagnostics::logic::telemetry::{DiagnosticsEngine, RawKeyEvent, RawTarget};
//!
//! let mut engine = DiagnosticsEngine::new(DiagnosticsConfig::from_env());
//! engine.enable();
//!
//! engine.record_keyboard_event(&RawKeyEvent::keydown(" ").with_target(RawTarget::tag("TEXTAREA")));
//! engine.record_output_event(1);
//!
//! for line in engine.get_formatted_events() {
//!     println!("{}", line.line());
//! }
//! ```

pub mod event;
pub mod exporter;
pub mod format;
pub mod global;
pub mod privacy;
pub mod recorder;
pub mod store;

// Re-export main types and functions
pub use event::{
    subtype,
    BackgroundLogData,
    DiagnosticEvent,
    EventCategory,
    EventData,
    FocusData,
    InitData,
    KeyboardData,
    Modifiers,
    OutputData,
    PasteData,
    RawFocusEvent,
    RawKeyEvent,
    RawTarget,
    WireData,
    WireDirection,
    WireInfo,
};

pub use recorder::{
    DiagnosticsEngine,
    EngineStats,
    PlatformInfo,
    Session,
};

pub use exporter::{
    ExportFormat,
    SessionSnapshot,
    default_export_dir,
    export_to_file,
    read_snapshot,
};

pub use format::{FormattedEvent, format_event, format_events, key_name};
pub use privacy::content_hash;
pub use store::EventStore;
