//! Central Configuration Constants
//!
//! Single source of truth for all diagnostic policy defaults.
//! To tune a threshold for every session, only edit this file
//! (or set the matching `TERM_DIAG_*` environment variable).

/// Circular buffer capacity (most recent events kept in memory)
pub const DEFAULT_CAPACITY: usize = 500;

/// Two wire sends of equal size closer than this are a duplicate delivery
pub const DEFAULT_DUPLICATE_WINDOW_MS: u64 = 100;

/// Background-log activity without a file write for this long is stale
pub const DEFAULT_STALE_PIPELINE_MS: u64 = 60_000;

/// Gap between the last startup phase and the first keystroke considered slow
pub const DEFAULT_HYDRATION_GAP_MS: u64 = 500;

/// A keystroke answered by terminal output within this window was delivered
pub const DEFAULT_OUTPUT_RESPONSE_MS: u64 = 250;

/// How many of the first keystrokes are inspected for input warm-up
pub const DEFAULT_WARMUP_KEY_COUNT: usize = 2;

/// Element tags that legitimately receive terminal keyboard input
pub const DEFAULT_INPUT_TARGETS: &[&str] = &["TEXTAREA", "INPUT"];

/// Placeholder used when a target or key cannot be determined
pub const UNKNOWN: &str = "UNKNOWN";

/// Placeholder used when a payload cannot be serialized
pub const UNSERIALIZABLE: &str = "[unserializable]";

/// Length of the hex content fingerprint stored for pasted text
pub const CONTENT_HASH_HEX_LEN: usize = 16;

/// Export sub-directory below the local data dir
pub const EXPORT_DIR: &str = "sessions";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name (also the data directory name)
pub const APP_NAME: &str = "terminal-diagnostics";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read an unsigned integer from the environment or use the default
pub fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a size from the environment or use the default
pub fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a boolean flag from the environment or use the default
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|s| {
            let s = s.trim().to_lowercase();
            !(s == "false" || s == "0" || s == "off" || s.is_empty())
        })
        .unwrap_or(default)
}
