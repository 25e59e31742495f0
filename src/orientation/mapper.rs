//! # Orientation Mapper Module
//!
//! Maps a sensor quaternion to gamepad axis values.
//!
//! ## Axis Assignments (defaults)
//!
//! | Angle | Axis | Domain |
//! |-------|------|--------|
//! | Pitch | Rx | [-180, 180] |
//! | Roll | Ry | [-180, 180] |
//! | Yaw | Rz | [-180, 180] |
//!
//! The remaining five axes are always zero.
//!
//! ## Usage
//!
//! ```
//! use imu_joy::orientation::{OrientationMapper, Quaternion};
//!
//! let mapper = OrientationMapper::new();
//! let mapped = mapper.map(&Quaternion::identity())?;
//!
//! assert_eq!(mapped.report.rx, 16383);
//! assert_eq!(mapped.report.x, 0);
//! # Ok::<(), imu_joy::orientation::MappingError>(())
//! ```

use serde::Deserialize;

use super::axis::{
    map_to_joystick_value, map_to_joystick_value_clamped, reverse_axis_value, MappingError,
};
use super::quaternion::{quaternion_to_euler, EulerAngles, Quaternion};
use crate::gamepad::{AxisReport, HidAxis};

/// Quaternions with a smaller norm carry no usable rotation.
const MIN_QUATERNION_NORM: f32 = 1e-3;

/// What to do with an angle outside its binding's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Drop the sample
    #[default]
    Reject,
    /// Pin the angle to the nearest bound
    Clamp,
}

/// Where one angle goes and over which domain it is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisBinding {
    pub axis: HidAxis,

    #[serde(default = "default_angle_min")]
    pub min: f32,

    #[serde(default = "default_angle_max")]
    pub max: f32,

    #[serde(default)]
    pub reversed: bool,
}

fn default_angle_min() -> f32 { -180.0 }
fn default_angle_max() -> f32 { 180.0 }

impl AxisBinding {
    /// Binding over the full [-180, 180] domain.
    #[must_use]
    pub fn new(axis: HidAxis) -> Self {
        Self {
            axis,
            min: default_angle_min(),
            max: default_angle_max(),
            reversed: false,
        }
    }

    /// Same binding with a different domain.
    #[must_use]
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Same binding, mirrored.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    fn apply(&self, angle: f32, policy: OutOfRangePolicy) -> Result<i16, MappingError> {
        let value = match policy {
            OutOfRangePolicy::Reject => map_to_joystick_value(angle, self.min, self.max)?,
            OutOfRangePolicy::Clamp => map_to_joystick_value_clamped(angle, self.min, self.max)?,
        };

        Ok(if self.reversed { reverse_axis_value(value) } else { value })
    }
}

/// Result of mapping one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedOrientation {
    pub angles: EulerAngles,
    pub report: AxisReport,
}

/// Maps quaternions to gamepad axis reports.
///
/// # Examples
///
/// ```
/// use imu_joy::gamepad::HidAxis;
/// use imu_joy::orientation::{AxisBinding, OrientationMapper, OutOfRangePolicy, Quaternion};
///
/// let mapper = OrientationMapper::with_bindings(
///     AxisBinding::new(HidAxis::X),
///     AxisBinding::new(HidAxis::Y),
///     AxisBinding::new(HidAxis::Z).with_range(-90.0, 90.0),
///     OutOfRangePolicy::Clamp,
/// );
/// let mapped = mapper.map(&Quaternion::new(0.7071, 0.0, 0.0, 0.7071))?;
/// assert!(mapped.report.z > 32700);
/// # Ok::<(), imu_joy::orientation::MappingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OrientationMapper {
    pitch: AxisBinding,
    roll: AxisBinding,
    yaw: AxisBinding,
    policy: OutOfRangePolicy,
}

impl Default for OrientationMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationMapper {
    /// Pitch → Rx, roll → Ry, yaw → Rz, all over [-180, 180].
    #[must_use]
    pub fn new() -> Self {
        Self {
            pitch: AxisBinding::new(HidAxis::Rx),
            roll: AxisBinding::new(HidAxis::Ry),
            yaw: AxisBinding::new(HidAxis::Rz),
            policy: OutOfRangePolicy::Reject,
        }
    }

    /// Creates a mapper with explicit bindings.
    ///
    /// Bindings are not checked for overlapping axes here; the config loader
    /// rejects that case.
    #[must_use]
    pub fn with_bindings(
        pitch: AxisBinding,
        roll: AxisBinding,
        yaw: AxisBinding,
        policy: OutOfRangePolicy,
    ) -> Self {
        Self {
            pitch,
            roll,
            yaw,
            policy,
        }
    }

    /// Maps one quaternion to Euler angles and an axis report.
    ///
    /// # Errors
    ///
    /// - [`MappingError::DegenerateQuaternion`] for a (near) zero or
    ///   non-finite quaternion
    /// - any error of [`map_to_joystick_value`] for the three angles
    pub fn map(&self, quaternion: &Quaternion) -> Result<MappedOrientation, MappingError> {
        let norm = quaternion.norm();
        if !norm.is_finite() || norm < MIN_QUATERNION_NORM {
            return Err(MappingError::DegenerateQuaternion(norm));
        }

        let angles = quaternion_to_euler(quaternion);

        let mut report = AxisReport::default();
        report.set(self.pitch.axis, self.pitch.apply(angles.pitch, self.policy)?);
        report.set(self.roll.axis, self.roll.apply(angles.roll, self.policy)?);
        report.set(self.yaw.axis, self.yaw.apply(angles.yaw, self.policy)?);

        Ok(MappedOrientation { angles, report })
    }
}
