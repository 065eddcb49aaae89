//! Diagnostics configuration
//!
//! Detector thresholds are policy, not structure: every one of them lives
//! here so a host can tune sensitivity without touching detector code.

use serde::{Deserialize, Serialize};

use crate::constants::{
    env_flag, env_u64, env_usize, DEFAULT_CAPACITY, DEFAULT_DUPLICATE_WINDOW_MS,
    DEFAULT_HYDRATION_GAP_MS, DEFAULT_INPUT_TARGETS, DEFAULT_OUTPUT_RESPONSE_MS,
    DEFAULT_STALE_PIPELINE_MS, DEFAULT_WARMUP_KEY_COUNT,
};

/// Engine + detector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagnosticsConfig {
    /// Circular buffer capacity (never below 1)
    pub capacity: usize,

    /// Max distance between two equal-size wire sends to call them duplicates
    pub duplicate_window_ms: u64,

    /// Background-log activity older than this without a file write is stale
    pub stale_pipeline_ms: u64,

    /// Max gap between the last startup phase and the first keystroke
    pub hydration_gap_ms: u64,

    /// Window in which a keystroke must be answered by terminal output
    pub output_response_ms: u64,

    /// Number of leading keystrokes checked for the warm-up pattern
    pub warmup_key_count: usize,

    /// Element tags allowed to receive keyboard input (upper case)
    pub input_targets: Vec<String>,

    /// Start recording as soon as the engine is created
    pub enable_on_start: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            duplicate_window_ms: DEFAULT_DUPLICATE_WINDOW_MS,
            stale_pipeline_ms: DEFAULT_STALE_PIPELINE_MS,
            hydration_gap_ms: DEFAULT_HYDRATION_GAP_MS,
            output_response_ms: DEFAULT_OUTPUT_RESPONSE_MS,
            warmup_key_count: DEFAULT_WARMUP_KEY_COUNT,
            input_targets: DEFAULT_INPUT_TARGETS.iter().map(|t| t.to_string()).collect(),
            enable_on_start: false,
        }
    }
}

impl DiagnosticsConfig {
    /// Load configuration from `TERM_DIAG_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            capacity: env_usize("TERM_DIAG_CAPACITY", defaults.capacity).max(1),
            duplicate_window_ms: env_u64("TERM_DIAG_DUPLICATE_WINDOW_MS", defaults.duplicate_window_ms),
            stale_pipeline_ms: env_u64("TERM_DIAG_STALE_PIPELINE_MS", defaults.stale_pipeline_ms),
            hydration_gap_ms: env_u64("TERM_DIAG_HYDRATION_GAP_MS", defaults.hydration_gap_ms),
            output_response_ms: env_u64("TERM_DIAG_OUTPUT_RESPONSE_MS", defaults.output_response_ms),
            warmup_key_count: defaults.warmup_key_count,
            input_targets: defaults.input_targets,
            enable_on_start: env_flag("TERM_DIAG_ENABLED", defaults.enable_on_start),
        }
    }

    // Builder pattern methods
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_duplicate_window_ms(mut self, window_ms: u64) -> Self {
        self.duplicate_window_ms = window_ms;
        self
    }

    pub fn with_stale_pipeline_ms(mut self, threshold_ms: u64) -> Self {
        self.stale_pipeline_ms = threshold_ms;
        self
    }

    pub fn with_hydration_gap_ms(mut self, threshold_ms: u64) -> Self {
        self.hydration_gap_ms = threshold_ms;
        self
    }

    pub fn enabled(mut self) -> Self {
        self.enable_on_start = true;
        self
    }

    /// Check whether a (normalized, upper-case) tag may receive input
    pub fn is_input_target(&self, tag: &str) -> bool {
        self.input_targets.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
