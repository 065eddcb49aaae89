//! Detectors Module - Known UI Malfunction Signatures
//!
//! Pure classifiers over an ordered list of diagnostic events. Each one
//! answers a single question with a verdict and a plain-language reason.
//!
//! # Components
//! - `duplicate_paste.rs`: one paste delivered to the terminal twice
//! - `blocked_key.rs`: keystrokes that never reached the terminal
//! - `stale_pipeline.rs`: background transcript logging falling behind
//! - `slow_hydration.rs`: input handling slow to come alive after startup
//! - `manager.rs`: runs all of the above, builds the summary
//! - `fixtures.rs`: synthetic event sequences for offline checks

pub mod blocked_key;
pub mod duplicate_paste;
pub mod fixtures;
pub mod manager;
pub mod slow_hydration;
pub mod stale_pipeline;
pub mod types;

// Re-exports from types
pub use types::{AnalysisContext, BackendStatus, DetectionResult, ProblemDetector, ProblemKind};

// Re-exports from submodules
pub use blocked_key::BlockedKeyDetector;
pub use duplicate_paste::{find_duplicate_after_paste, DuplicatePasteDetector};
pub use manager::{AnalysisReport, DetectedProblem, DetectorManager, ProblemSummary};
pub use slow_hydration::SlowHydrationDetector;
pub use stale_pipeline::StalePipelineDetector;
