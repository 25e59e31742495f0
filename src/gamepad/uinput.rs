//! # uinput Virtual Gamepad
//!
//! Exposes the mapped orientation as a virtual joystick through the Linux
//! uinput interface, so games see it like any Bluetooth gamepad.
//!
//! ## Device Layout
//!
//! - Bus type: Bluetooth, vendor/product ids from config
//! - Axes: ABS_X, ABS_Y, ABS_Z, ABS_RX, ABS_RY, ABS_RZ, ABS_THROTTLE,
//!   ABS_RUDDER, each 0-32767
//! - One button (BTN_SOUTH) so udev classifies the device as a joystick
//!
//! Requires write access to `/dev/uinput`.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use tracing::{debug, info};

use super::{AxisReport, GamepadSink, HidAxis, NUM_AXES};
use crate::config::GamepadConfig;
use crate::error::{ImuJoyError, Result};
use crate::orientation::{AXIS_VALUE_MAX, AXIS_VALUE_MIN};

/// Device version reported to the input subsystem
const DEVICE_VERSION: u16 = 0x0100;

/// evdev axis code for each report slot
fn abs_axis(axis: HidAxis) -> AbsoluteAxisType {
    match axis {
        HidAxis::X => AbsoluteAxisType::ABS_X,
        HidAxis::Y => AbsoluteAxisType::ABS_Y,
        HidAxis::Z => AbsoluteAxisType::ABS_Z,
        HidAxis::Rx => AbsoluteAxisType::ABS_RX,
        HidAxis::Ry => AbsoluteAxisType::ABS_RY,
        HidAxis::Rz => AbsoluteAxisType::ABS_RZ,
        HidAxis::Slider1 => AbsoluteAxisType::ABS_THROTTLE,
        HidAxis::Slider2 => AbsoluteAxisType::ABS_RUDDER,
    }
}

/// Input events for one report (SYN_REPORT is appended by `emit`)
pub fn report_events(report: &AxisReport) -> [InputEvent; NUM_AXES] {
    let values = report.to_array();
    HidAxis::ALL.map(|axis| {
        InputEvent::new(
            EventType::ABSOLUTE,
            abs_axis(axis).0,
            i32::from(values[axis.index()]),
        )
    })
}

/// Virtual gamepad backed by a uinput device
///
/// # Examples
///
/// ```no_run
/// use imu_joy::config::GamepadConfig;
/// use imu_joy::gamepad::{AxisReport, GamepadSink, VirtualGamepad};
///
/// let mut gamepad = VirtualGamepad::new();
/// gamepad.begin(&GamepadConfig::default())?;
/// gamepad.set_axes(&AxisReport::default())?;
/// # Ok::<(), imu_joy::error::ImuJoyError>(())
/// ```
#[derive(Default)]
pub struct VirtualGamepad {
    device: Option<VirtualDevice>,
}

impl std::fmt::Debug for VirtualGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualGamepad")
            .field("created", &self.device.is_some())
            .finish()
    }
}

impl VirtualGamepad {
    /// Create an unconnected gamepad; call `begin` to create the device
    pub fn new() -> Self {
        Self { device: None }
    }

    fn build_device(config: &GamepadConfig) -> std::io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_SOUTH);

        let mut builder = VirtualDeviceBuilder::new()?
            .name(config.name.as_str())
            .input_id(InputId::new(
                BusType::BUS_BLUETOOTH,
                config.vendor_id,
                config.product_id,
                DEVICE_VERSION,
            ))
            .with_keys(&keys)?;

        for axis in HidAxis::ALL {
            let info = AbsInfo::new(
                0,
                i32::from(AXIS_VALUE_MIN),
                i32::from(AXIS_VALUE_MAX),
                0,
                0,
                0,
            );
            builder = builder.with_absolute_axis(&UinputAbsSetup::new(abs_axis(axis), info))?;
        }

        builder.build()
    }
}

impl GamepadSink for VirtualGamepad {
    fn begin(&mut self, config: &GamepadConfig) -> Result<()> {
        let device = Self::build_device(config)
            .map_err(|e| ImuJoyError::Gamepad(format!("Failed to create uinput device: {}", e)))?;

        info!(
            "Virtual gamepad '{}' by {} ready (vendor 0x{:04x}, product 0x{:04x}, battery {}%)",
            config.name, config.manufacturer, config.vendor_id, config.product_id,
            config.battery_level
        );
        self.device = Some(device);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    fn set_axes(&mut self, report: &AxisReport) -> Result<()> {
        let device = self.device.as_mut()
            .ok_or_else(|| ImuJoyError::Gamepad("gamepad not started".to_string()))?;

        device.emit(&report_events(report))
            .map_err(|e| ImuJoyError::Gamepad(format!("Failed to emit report: {}", e)))?;

        debug!("Sent axes {:?}", report.to_array());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_codes_are_distinct() {
        let mut codes: Vec<u16> = HidAxis::ALL.iter().map(|&a| abs_axis(a).0).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), NUM_AXES);
    }

    #[test]
    fn test_slider_axes() {
        assert_eq!(abs_axis(HidAxis::Slider1), AbsoluteAxisType::ABS_THROTTLE);
        assert_eq!(abs_axis(HidAxis::Slider2), AbsoluteAxisType::ABS_RUDDER);
    }

    #[test]
    fn test_report_events_carry_values_in_order() {
        let mut report = AxisReport::default();
        report.set(HidAxis::Rx, 100);
        report.set(HidAxis::Rz, 32767);

        let events = report_events(&report);
        assert_eq!(events.len(), NUM_AXES);
        assert!(events.iter().all(|e| e.event_type() == EventType::ABSOLUTE));
        assert_eq!(events[3].code(), AbsoluteAxisType::ABS_RX.0);
        assert_eq!(events[3].value(), 100);
        assert_eq!(events[5].code(), AbsoluteAxisType::ABS_RZ.0);
        assert_eq!(events[5].value(), 32767);
        assert_eq!(events[0].value(), 0);
    }

    #[test]
    fn test_not_connected_before_begin() {
        let gamepad = VirtualGamepad::new();
        assert!(!gamepad.is_connected());
    }

    #[test]
    fn test_set_axes_before_begin_fails() {
        let mut gamepad = VirtualGamepad::new();
        let result = gamepad.set_axes(&AxisReport::default());
        assert!(matches!(result, Err(ImuJoyError::Gamepad(_))));
    }

    // Needs write access to /dev/uinput
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_begin_with_real_uinput() {
        let mut gamepad = VirtualGamepad::new();
        if gamepad.begin(&GamepadConfig::default()).is_ok() {
            assert!(gamepad.is_connected());
            assert!(gamepad.set_axes(&AxisReport::default()).is_ok());
        } else {
            println!("uinput not available (this is OK for CI/CD)");
        }
    }
}
