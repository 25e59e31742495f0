//! # Quaternion to Euler Conversion
//!
//! Converts the orientation quaternion reported by the sensor into three
//! angles in degrees.
//!
//! ## Formulas
//!
//! | Angle | Formula | Range |
//! |-------|---------|-------|
//! | yaw | `atan2(2(xy + wz), w² + x² − y² − z²)` | [-180, 180] |
//! | roll | `asin(2(wy − zx))`, ±90 when the argument leaves [-1, 1] | [-90, 90] |
//! | pitch | `atan2(2(wx + yz), w² − x² − y² + z²)` | [-180, 180] |
//!
//! The three angles are independent extractions, not a decomposition in
//! one declared rotation order. They are kept exactly as the device
//! firmware has always reported them; substituting a textbook ZYX or XYZ
//! conversion changes the axis values seen by the host.

use serde::Serialize;

/// Orientation quaternion `(w, x, y, z)`.
///
/// `w` is the scalar part. Unit norm is expected but never enforced.
///
/// # Examples
///
/// ```
/// use imu_joy::orientation::Quaternion;
///
/// let q = Quaternion::identity();
/// assert_eq!(q.w, 1.0);
/// assert_eq!(q.x, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Creates a quaternion from its components.
    #[must_use]
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Euclidean norm of the four components.
    #[must_use]
    pub fn norm(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Three orientation angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EulerAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Converts a quaternion into yaw, pitch and roll (degrees).
///
/// Pure function with no validation. NaN components propagate into the
/// angles and an all-zero quaternion reads as level; rejecting either is
/// left to [`OrientationMapper`](super::OrientationMapper).
///
/// # Examples
///
/// ```
/// use imu_joy::orientation::{quaternion_to_euler, Quaternion};
///
/// let angles = quaternion_to_euler(&Quaternion::identity());
/// assert_eq!(angles.yaw, 0.0);
/// assert_eq!(angles.pitch, 0.0);
/// assert_eq!(angles.roll, 0.0);
/// ```
#[must_use]
pub fn quaternion_to_euler(q: &Quaternion) -> EulerAngles {
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);
    let (ww, xx, yy, zz) = (w * w, x * x, y * y, z * z);

    let yaw = (2.0 * (x * y + w * z)).atan2(ww + xx - yy - zz).to_degrees();

    // Rounding near the poles can push the argument just past ±1
    let sin_roll = 2.0 * (w * y - z * x);
    let roll = if sin_roll.abs() >= 1.0 {
        90.0_f32.copysign(sin_roll)
    } else {
        sin_roll.asin().to_degrees()
    };

    let pitch = (2.0 * (w * x + y * z)).atan2(ww - xx - yy + zz).to_degrees();

    EulerAngles { yaw, pitch, roll }
}
