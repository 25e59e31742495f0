//! # Angle to Axis Scaling
//!
//! Linear rescale of an angle from `[angle_min, angle_max]` onto the
//! joystick axis range `[0, 32767]`, rounding toward zero.
//!
//! ## Value Ranges
//!
//! - Input: degrees, typically [-180, 180]
//! - Output: 0-32767 (positive half of a signed 16-bit HID axis)
//!
//! The raw transform is unbounded. Inputs outside the domain, a NaN angle
//! or an empty domain are reported as [`MappingError`] instead of being
//! forwarded as out-of-range axis values.

use thiserror::Error;

/// Lowest axis value reported to the gamepad.
pub const AXIS_VALUE_MIN: i16 = 0;

/// Highest axis value reported to the gamepad.
pub const AXIS_VALUE_MAX: i16 = 32767;

/// Axis center for a symmetric domain (e.g. 0° on [-180, 180]).
pub const AXIS_VALUE_CENTER: i16 = 16383;

/// Reasons an orientation cannot be turned into axis values.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MappingError {
    /// `angle_max` is not above `angle_min`, or a bound is not finite
    #[error("degenerate angle range [{min}, {max}]")]
    DegenerateRange { min: f32, max: f32 },

    /// Angle is NaN or infinite
    #[error("angle is not finite: {0}")]
    NonFinite(f32),

    /// Angle lies outside the configured domain
    #[error("angle {angle} outside [{min}, {max}]")]
    OutOfRange { angle: f32, min: f32, max: f32 },

    /// Quaternion norm too small to describe a rotation
    #[error("degenerate quaternion (norm {0})")]
    DegenerateQuaternion(f32),
}

/// Maps `angle` from `[angle_min, angle_max]` to `[0, 32767]`.
///
/// Uses `trunc((angle - angle_min) * 32767 / (angle_max - angle_min))`.
///
/// # Errors
///
/// - [`MappingError::DegenerateRange`] if `angle_max <= angle_min`
/// - [`MappingError::NonFinite`] if `angle` is NaN or infinite
/// - [`MappingError::OutOfRange`] if `angle` lies outside the domain
///
/// # Examples
///
/// ```
/// use imu_joy::orientation::map_to_joystick_value;
///
/// assert_eq!(map_to_joystick_value(-180.0, -180.0, 180.0), Ok(0));
/// assert_eq!(map_to_joystick_value(0.0, -180.0, 180.0), Ok(16383));
/// assert_eq!(map_to_joystick_value(180.0, -180.0, 180.0), Ok(32767));
/// assert!(map_to_joystick_value(181.0, -180.0, 180.0).is_err());
/// ```
pub fn map_to_joystick_value(
    angle: f32,
    angle_min: f32,
    angle_max: f32,
) -> Result<i16, MappingError> {
    check_domain(angle, angle_min, angle_max)?;

    if angle < angle_min || angle > angle_max {
        return Err(MappingError::OutOfRange {
            angle,
            min: angle_min,
            max: angle_max,
        });
    }

    Ok(scale(angle, angle_min, angle_max))
}

/// Like [`map_to_joystick_value`], but pins out-of-domain angles to the
/// nearest bound instead of failing.
///
/// # Errors
///
/// Still rejects NaN/infinite angles and degenerate ranges.
///
/// # Examples
///
/// ```
/// use imu_joy::orientation::map_to_joystick_value_clamped;
///
/// assert_eq!(map_to_joystick_value_clamped(120.0, -90.0, 90.0), Ok(32767));
/// assert_eq!(map_to_joystick_value_clamped(-120.0, -90.0, 90.0), Ok(0));
/// ```
pub fn map_to_joystick_value_clamped(
    angle: f32,
    angle_min: f32,
    angle_max: f32,
) -> Result<i16, MappingError> {
    check_domain(angle, angle_min, angle_max)?;
    Ok(scale(angle.clamp(angle_min, angle_max), angle_min, angle_max))
}

fn check_domain(angle: f32, angle_min: f32, angle_max: f32) -> Result<(), MappingError> {
    if !angle_min.is_finite() || !angle_max.is_finite() || angle_max <= angle_min {
        return Err(MappingError::DegenerateRange {
            min: angle_min,
            max: angle_max,
        });
    }

    if !angle.is_finite() {
        return Err(MappingError::NonFinite(angle));
    }

    Ok(())
}

/// Raw transform. Caller guarantees `angle_min <= angle <= angle_max`.
fn scale(angle: f32, angle_min: f32, angle_max: f32) -> i16 {
    let span = f32::from(AXIS_VALUE_MAX);
    let value = (angle - angle_min) * span / (angle_max - angle_min);

    // `as` truncates toward zero; the domain check keeps it in [0, 32767]
    value as i16
}

/// Mirrors an axis value within `[0, 32767]`.
#[must_use]
pub fn reverse_axis_value(value: i16) -> i16 {
    AXIS_VALUE_MAX - value
}
