//! # Orientation Module
//!
//! Turns sensor quaternions into gamepad axis values.
//!
//! This module handles:
//! - Quaternion to yaw/pitch/roll conversion (with the gimbal-lock guard)
//! - Scaling angles onto the 0-32767 axis range
//! - Assigning the three angles to gamepad axes

pub mod axis;
pub mod mapper;
pub mod quaternion;

pub use axis::{
    map_to_joystick_value, map_to_joystick_value_clamped, MappingError, AXIS_VALUE_CENTER,
    AXIS_VALUE_MAX, AXIS_VALUE_MIN,
};
pub use mapper::{AxisBinding, MappedOrientation, OrientationMapper, OutOfRangePolicy};
pub use quaternion::{quaternion_to_euler, EulerAngles, Quaternion};
