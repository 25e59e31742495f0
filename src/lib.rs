//! # IMU Joy Library
//!
//! Turn a BNO08x orientation sensor into a gamepad.
//!
//! This library reads orientation quaternions from the sensor over UART-SHTP,
//! converts them to yaw/pitch/roll and reports the angles as joystick axes
//! of a virtual gamepad.

pub mod bridge;
pub mod config;
pub mod error;
pub mod gamepad;
pub mod orientation;
pub mod sensor;
pub mod serial;
pub mod shtp;
pub mod sweep;
pub mod telemetry;
pub mod ticker;
