//! # Gamepad Module
//!
//! Gamepad peripheral the mapped axes are sent to.
//!
//! This module handles:
//! - The [`GamepadSink`] interface (begin, connection state, axis reports)
//! - The eight-axis [`AxisReport`]
//! - A Linux uinput implementation ([`VirtualGamepad`])

pub mod report;
pub mod uinput;

use crate::config::GamepadConfig;
use crate::error::Result;
pub use report::{AxisReport, HidAxis, NUM_AXES};
pub use uinput::VirtualGamepad;

/// Interface of a gamepad peripheral
///
/// Reports are fire-and-forget: an `Ok` from [`set_axes`](Self::set_axes)
/// means the report was handed off, not that a host consumed it.
#[cfg_attr(test, mockall::automock)]
pub trait GamepadSink: Send {
    /// Create/advertise the peripheral
    fn begin(&mut self, config: &GamepadConfig) -> Result<()>;

    /// Whether a host is attached and reports are delivered
    fn is_connected(&self) -> bool;

    /// Send all eight axes
    fn set_axes(&mut self, report: &AxisReport) -> Result<()>;
}
