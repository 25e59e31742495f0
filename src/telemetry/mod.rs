//! # Telemetry Module
//!
//! Records orientation samples to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting each sent report as one JSON line
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

pub mod logger;

pub use logger::{SampleRecord, TelemetryLogger};
