//! # Gamepad Axis Report
//!
//! The eight axes sent in one gamepad report.
//!
//! | Axis | Field | uinput code |
//! |------|-------|-------------|
//! | X | `x` | ABS_X |
//! | Y | `y` | ABS_Y |
//! | Z | `z` | ABS_Z |
//! | Rx | `rx` | ABS_RX |
//! | Ry | `ry` | ABS_RY |
//! | Rz | `rz` | ABS_RZ |
//! | Slider 1 | `slider1` | ABS_THROTTLE |
//! | Slider 2 | `slider2` | ABS_RUDDER |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of axes in a report.
pub const NUM_AXES: usize = 8;

/// One of the eight gamepad axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HidAxis {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
    Slider1,
    Slider2,
}

impl HidAxis {
    /// All axes in report order.
    pub const ALL: [HidAxis; NUM_AXES] = [
        HidAxis::X,
        HidAxis::Y,
        HidAxis::Z,
        HidAxis::Rx,
        HidAxis::Ry,
        HidAxis::Rz,
        HidAxis::Slider1,
        HidAxis::Slider2,
    ];

    /// Position of this axis within the report.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            HidAxis::X => 0,
            HidAxis::Y => 1,
            HidAxis::Z => 2,
            HidAxis::Rx => 3,
            HidAxis::Ry => 4,
            HidAxis::Rz => 5,
            HidAxis::Slider1 => 6,
            HidAxis::Slider2 => 7,
        }
    }
}

impl fmt::Display for HidAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HidAxis::X => "x",
            HidAxis::Y => "y",
            HidAxis::Z => "z",
            HidAxis::Rx => "rx",
            HidAxis::Ry => "ry",
            HidAxis::Rz => "rz",
            HidAxis::Slider1 => "slider1",
            HidAxis::Slider2 => "slider2",
        };
        f.write_str(name)
    }
}

/// Values for all eight axes. Unused axes stay at zero.
///
/// # Examples
///
/// ```
/// use imu_joy::gamepad::{AxisReport, HidAxis};
///
/// let mut report = AxisReport::default();
/// report.set(HidAxis::Rz, 32767);
/// assert_eq!(report.rz, 32767);
/// assert_eq!(report.to_array(), [0, 0, 0, 0, 0, 32767, 0, 0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AxisReport {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub rx: i16,
    pub ry: i16,
    pub rz: i16,
    pub slider1: i16,
    pub slider2: i16,
}

impl AxisReport {
    /// Sets one axis.
    pub fn set(&mut self, axis: HidAxis, value: i16) {
        *self.slot(axis) = value;
    }

    /// Reads one axis.
    #[must_use]
    pub fn get(&self, axis: HidAxis) -> i16 {
        self.to_array()[axis.index()]
    }

    /// Axes in report order: x, y, z, rx, ry, rz, slider1, slider2.
    #[must_use]
    pub fn to_array(&self) -> [i16; NUM_AXES] {
        [
            self.x,
            self.y,
            self.z,
            self.rx,
            self.ry,
            self.rz,
            self.slider1,
            self.slider2,
        ]
    }

    fn slot(&mut self, axis: HidAxis) -> &mut i16 {
        match axis {
            HidAxis::X => &mut self.x,
            HidAxis::Y => &mut self.y,
            HidAxis::Z => &mut self.z,
            HidAxis::Rx => &mut self.rx,
            HidAxis::Ry => &mut self.ry,
            HidAxis::Rz => &mut self.rz,
            HidAxis::Slider1 => &mut self.slider1,
            HidAxis::Slider2 => &mut self.slider2,
        }
    }
}
