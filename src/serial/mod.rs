//! # Serial Communication Module
//!
//! Handles the serial link to the BNO08x sensor (UART-SHTP mode).
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Auto-detecting the adapter when no port is configured
//! - Async read/write through [`SerialPortIO`]

pub mod port_trait;

use async_trait::async_trait;
use std::io;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{ImuJoyError, Result};
pub use port_trait::{SerialPortIO, TokioSerialPort};

/// BNO08x UART-SHTP baud rate
pub const SENSOR_BAUD_RATE: u32 = 3_000_000;

/// Baud rates the sensor can be strapped or configured for
pub const SUPPORTED_BAUD_RATES: &[u32] = &[115_200, 921_600, 1_000_000, 3_000_000];

/// Default sensor device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (most common for breakout boards)
    "/dev/ttyACM0", // USB CDC bridges
];

/// Sensor Serial Port Handler
///
/// Owns the connection to the sensor's UART.
pub struct SensorSerial {
    /// Serial port handle
    port: TokioSerialPort,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for SensorSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SensorSerial {
    /// Open the configured port, or auto-detect when `path` is empty
    ///
    /// # Arguments
    ///
    /// * `path` - Device path, empty for auto-detection
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imu_joy::serial::{SensorSerial, SENSOR_BAUD_RATE};
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = SensorSerial::open("", SENSOR_BAUD_RATE)?;
    ///     println!("Sensor at {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        if path.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
        } else {
            Self::open_with_paths(&[path], baud_rate)
        }
    }

    /// Open the first device that works among `paths`
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened sensor serial port at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(ImuJoyError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| ImuJoyError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for SensorSerial {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf).await
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }
}
