//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock setup: BNO08x on an auto-detected port, rotation vector every
//! 5 ms, pitch/roll/yaw on Rx/Ry/Rz over [-180, 180].

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::bridge::BridgeMode;
use crate::error::{ImuJoyError, Result};
use crate::gamepad::HidAxis;
use crate::orientation::{AxisBinding, OrientationMapper, OutOfRangePolicy};
use crate::serial::SUPPORTED_BAUD_RATES;
use crate::shtp::protocol::ReportKind;
use crate::sweep::DEFAULT_SWEEP_STEP;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub gamepad: GamepadConfig,
    pub mapping: MappingConfig,
    pub bridge: BridgeConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Sensor (serial link + report) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    /// Empty = auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,

    #[serde(default = "default_report")]
    pub report: ReportKind,

    #[serde(default = "default_report_interval_us")]
    pub report_interval_us: u32,
}

/// Gamepad peripheral configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    #[serde(default = "default_gamepad_name")]
    pub name: String,

    /// Shown in the startup log; uinput devices carry no manufacturer string
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// Battery level in percent (0-100). uinput has no battery report, so
    /// the virtual gamepad only logs it; a BLE backend would advertise it.
    #[serde(default = "default_battery_level")]
    pub battery_level: u8,

    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_id")]
    pub product_id: u16,
}

/// Angle to axis mapping configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MappingConfig {
    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,

    #[serde(default = "default_pitch_binding")]
    pub pitch: AxisBinding,

    #[serde(default = "default_roll_binding")]
    pub roll: AxisBinding,

    #[serde(default = "default_yaw_binding")]
    pub yaw: AxisBinding,
}

/// Polling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    /// `sensor` forwards orientation, `sweep` sends a test sawtooth
    #[serde(default)]
    pub mode: BridgeMode,

    /// Axis increment per tick in sweep mode
    #[serde(default = "default_sweep_step")]
    pub sweep_step: u16,

    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    /// Sent reports between status log lines
    #[serde(default = "default_status_log_interval")]
    pub status_log_interval: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty = stdout only
    #[serde(default)]
    pub file_dir: String,
}

// Default value functions
fn default_baud_rate() -> u32 { 3_000_000 }
fn default_read_timeout_ms() -> u64 { 2 }
fn default_init_timeout_ms() -> u64 { 1000 }
fn default_report() -> ReportKind { ReportKind::RotationVector }
fn default_report_interval_us() -> u32 { 5000 }

fn default_gamepad_name() -> String { "MDS-IMUJoy".to_string() }
fn default_manufacturer() -> String { "MSmithDev".to_string() }
fn default_battery_level() -> u8 { 100 }
fn default_vendor_id() -> u16 { 0xe502 }
fn default_product_id() -> u16 { 0xbbab }

fn default_pitch_binding() -> AxisBinding { AxisBinding::new(HidAxis::Rx) }
fn default_roll_binding() -> AxisBinding { AxisBinding::new(HidAxis::Ry) }
fn default_yaw_binding() -> AxisBinding { AxisBinding::new(HidAxis::Rz) }

fn default_report_interval_ms() -> u64 { 5 }
fn default_sweep_step() -> u16 { DEFAULT_SWEEP_STEP }
fn default_status_log_interval() -> u64 { 1000 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            init_timeout_ms: default_init_timeout_ms(),
            report: default_report(),
            report_interval_us: default_report_interval_us(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            name: default_gamepad_name(),
            manufacturer: default_manufacturer(),
            battery_level: default_battery_level(),
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            out_of_range: OutOfRangePolicy::default(),
            pitch: default_pitch_binding(),
            roll: default_roll_binding(),
            yaw: default_yaw_binding(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: BridgeMode::default(),
            sweep_step: default_sweep_step(),
            report_interval_ms: default_report_interval_ms(),
            status_log_interval: default_status_log_interval(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: String::new(),
        }
    }
}

impl MappingConfig {
    /// Build the orientation mapper for these bindings
    pub fn to_mapper(&self) -> OrientationMapper {
        OrientationMapper::with_bindings(self.pitch, self.roll, self.yaw, self.out_of_range)
    }
}

fn invalid(message: impl std::fmt::Display) -> ImuJoyError {
    ImuJoyError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imu_joy::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate sensor link
        if !SUPPORTED_BAUD_RATES.contains(&self.sensor.baud_rate) {
            return Err(invalid("baud_rate must be one of: 115200, 921600, 1000000, 3000000"));
        }

        if self.sensor.read_timeout_ms == 0 || self.sensor.read_timeout_ms > 1000 {
            return Err(invalid("read_timeout_ms must be between 1 and 1000"));
        }

        if self.sensor.init_timeout_ms == 0 || self.sensor.init_timeout_ms > 10000 {
            return Err(invalid("init_timeout_ms must be between 1 and 10000"));
        }

        if !self.sensor.report.is_orientation() {
            return Err(invalid("report must be 'rotation_vector' or 'game_rotation_vector'"));
        }

        if self.sensor.report_interval_us < 1000 || self.sensor.report_interval_us > 1_000_000 {
            return Err(invalid("report_interval_us must be between 1000 and 1000000"));
        }

        // Validate gamepad
        if self.gamepad.name.is_empty() {
            return Err(invalid("gamepad name cannot be empty"));
        }

        if self.gamepad.battery_level > 100 {
            return Err(invalid("battery_level must be between 0 and 100"));
        }

        // Validate axis bindings
        for (name, binding) in [
            ("pitch", &self.mapping.pitch),
            ("roll", &self.mapping.roll),
            ("yaw", &self.mapping.yaw),
        ] {
            if !binding.min.is_finite() || !binding.max.is_finite() || binding.min >= binding.max {
                return Err(invalid(format!("{} min must be less than max", name)));
            }
        }

        let axes = [self.mapping.pitch.axis, self.mapping.roll.axis, self.mapping.yaw.axis];
        if axes[0] == axes[1] || axes[0] == axes[2] || axes[1] == axes[2] {
            return Err(invalid("pitch, roll and yaw must use different axes"));
        }

        // Validate loop timing
        if self.bridge.report_interval_ms == 0 || self.bridge.report_interval_ms > 1000 {
            return Err(invalid("report_interval_ms must be between 1 and 1000"));
        }

        if self.bridge.status_log_interval == 0 {
            return Err(invalid("status_log_interval must be greater than 0"));
        }

        if self.bridge.sweep_step == 0 || self.bridge.sweep_step > 32767 {
            return Err(invalid("sweep_step must be between 1 and 32767"));
        }

        // Validate telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        // Validate logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.sensor.port, "");
        assert_eq!(config.sensor.baud_rate, 3_000_000);
        assert_eq!(config.sensor.report, ReportKind::RotationVector);
        assert_eq!(config.gamepad.name, "MDS-IMUJoy");
        assert_eq!(config.gamepad.battery_level, 100);
        assert_eq!(config.bridge.report_interval_ms, 5);
        assert_eq!(config.mapping.pitch.axis, HidAxis::Rx);
        assert_eq!(config.mapping.roll.axis, HidAxis::Ry);
        assert_eq!(config.mapping.yaw.axis, HidAxis::Rz);
        assert_eq!(config.mapping.out_of_range, OutOfRangePolicy::Reject);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_empty_toml_matches_default() {
        let config = Config::from_toml("").unwrap();
        let default = Config::default();

        assert_eq!(config.sensor.baud_rate, default.sensor.baud_rate);
        assert_eq!(config.mapping.yaw, default.mapping.yaw);
        assert_eq!(config.gamepad.vendor_id, default.gamepad.vendor_id);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [sensor]
            port = "/dev/ttyAMA0"
            report = "game_rotation_vector"

            [mapping]
            out_of_range = "clamp"
            yaw = { axis = "slider1", min = -90.0, max = 90.0, reversed = true }
            "#,
        )
        .unwrap();

        assert_eq!(config.sensor.port, "/dev/ttyAMA0");
        assert_eq!(config.sensor.report, ReportKind::GameRotationVector);
        assert_eq!(config.sensor.read_timeout_ms, 2);
        assert_eq!(config.mapping.out_of_range, OutOfRangePolicy::Clamp);
        assert_eq!(
            config.mapping.yaw,
            AxisBinding::new(HidAxis::Slider1).with_range(-90.0, 90.0).reversed()
        );
        assert_eq!(config.mapping.pitch.axis, HidAxis::Rx);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[bridge]\nreport_interval_ms = 10\n\n[gamepad]\nname = \"Tilt Pad\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bridge.report_interval_ms, 10);
        assert_eq!(config.gamepad.name, "Tilt Pad");
    }

    #[test]
    fn test_shipped_default_file_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        let default = Config::default();

        assert_eq!(config.sensor.baud_rate, default.sensor.baud_rate);
        assert_eq!(config.sensor.report_interval_us, default.sensor.report_interval_us);
        assert_eq!(config.gamepad.vendor_id, 0xe502);
        assert_eq!(config.gamepad.product_id, 0xbbab);
        assert_eq!(config.mapping.pitch, default.mapping.pitch);
        assert_eq!(config.mapping.roll, default.mapping.roll);
        assert_eq!(config.mapping.yaw, default.mapping.yaw);
        assert_eq!(config.bridge.status_log_interval, default.bridge.status_log_interval);
        assert_eq!(config.telemetry.max_files_to_keep, default.telemetry.max_files_to_keep);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/imu-joy.toml");
        assert!(matches!(result, Err(ImuJoyError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[sensor]\nbaud_rate = \"fast\"");
        assert!(matches!(result, Err(ImuJoyError::Config(_))));
    }

    #[test]
    fn test_unknown_axis_name() {
        assert!(Config::from_toml("[mapping]\nyaw = { axis = \"w\" }").is_err());
    }

    #[test]
    fn test_to_mapper_uses_bindings() {
        let config = Config::from_toml(
            "[mapping]\npitch = { axis = \"x\" }\nroll = { axis = \"y\" }\nyaw = { axis = \"z\" }",
        )
        .unwrap();
        let mapped = config.mapping.to_mapper()
            .map(&crate::orientation::Quaternion::identity())
            .unwrap();

        assert_eq!(mapped.report.x, 16383);
        assert_eq!(mapped.report.rx, 0);
    }

    #[test]
    fn test_unsupported_baud_rate() {
        let mut config = Config::default();
        config.sensor.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_timeout_zero() {
        let mut config = Config::default();
        config.sensor.read_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_timeout_too_high() {
        let mut config = Config::default();
        config.sensor.read_timeout_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_init_timeout_zero() {
        let mut config = Config::default();
        config.sensor.init_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_orientation_report() {
        let mut config = Config::default();
        config.sensor.report = ReportKind::Accelerometer;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_interval_us_too_low() {
        let mut config = Config::default();
        config.sensor.report_interval_us = 999;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_gamepad_name() {
        let mut config = Config::default();
        config.gamepad.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_battery_level_too_high() {
        let mut config = Config::default();
        config.gamepad.battery_level = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_binding_range() {
        let mut config = Config::default();
        config.mapping.roll = AxisBinding::new(HidAxis::Ry).with_range(10.0, 10.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_binding_range() {
        let mut config = Config::default();
        config.mapping.pitch = AxisBinding::new(HidAxis::Rx).with_range(180.0, -180.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_axes() {
        let mut config = Config::default();
        config.mapping.yaw = AxisBinding::new(HidAxis::Rx);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_interval_ms_zero() {
        let mut config = Config::default();
        config.bridge.report_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_interval_ms_too_high() {
        let mut config = Config::default();
        config.bridge.report_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sweep_mode() {
        let config = Config::from_toml("[bridge]\nmode = \"sweep\"\nsweep_step = 25\n").unwrap();
        assert_eq!(config.bridge.mode, BridgeMode::Sweep);
        assert_eq!(config.bridge.sweep_step, 25);

        let default = Config::default();
        assert_eq!(default.bridge.mode, BridgeMode::Sensor);
        assert_eq!(default.bridge.sweep_step, 10);
    }

    #[test]
    fn test_sweep_step_zero() {
        let mut config = Config::default();
        config.bridge.sweep_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_bridge_mode() {
        assert!(Config::from_toml("[bridge]\nmode = \"demo\"\n").is_err());
    }

    #[test]
    fn test_status_log_interval_zero() {
        let mut config = Config::default();
        config.bridge.status_log_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
