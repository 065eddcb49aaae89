//! Logic Module - Recording, Formatting & Detection
//!
//! - `telemetry/` - event model, ring buffer, recorders, formatter, exporter
//! - `detectors/` - known-problem detectors + manager
//! - `config.rs` - policy thresholds
//! - `clock.rs` - injectable time source

pub mod clock;
pub mod config;
pub mod detectors;
pub mod telemetry;
