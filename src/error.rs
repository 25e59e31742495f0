//! # Error Types
//!
//! Custom error types for IMU Joy using `thiserror`.

use thiserror::Error;

use crate::orientation::MappingError;

/// Main error type for IMU Joy
#[derive(Debug, Error)]
pub enum ImuJoyError {
    /// SHTP protocol errors (framing, header, report layout)
    #[error("SHTP protocol error: {0}")]
    ShtpProtocol(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No usable serial device among the candidates
    #[error("No sensor serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// Sensor did not come up
    #[error("Sensor initialization failed: {0}")]
    SensorInit(String),

    /// Gamepad peripheral errors
    #[error("Gamepad error: {0}")]
    Gamepad(String),

    /// Orientation could not be mapped to axis values
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for IMU Joy
pub type Result<T> = std::result::Result<T, ImuJoyError>;
