//! # Sensor Module
//!
//! Orientation sensor access.
//!
//! This module handles:
//! - The [`SensorDriver`] interface the bridge polls every tick
//! - BNO08x over UART-SHTP ([`Bno08xSerial`])

pub mod bno08x;

use async_trait::async_trait;

use crate::error::Result;
pub use crate::shtp::protocol::{OrientationSample, ReportKind, ReportPayload, SensorEvent};
pub use bno08x::Bno08xSerial;

/// Interface of an orientation sensor driver
///
/// Mirrors the call pattern of the usual BNO08x host libraries: bring the
/// hub up once, enable the wanted report, then poll for events and re-enable
/// the report whenever the hub reports it was reset.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorDriver: Send {
    /// Bring the sensor up
    ///
    /// # Errors
    ///
    /// Returns `SensorInit` if the sensor does not answer.
    async fn begin(&mut self) -> Result<()>;

    /// Whether the sensor reset since the last call (clears the flag)
    fn was_reset(&mut self) -> bool;

    /// Ask the sensor to produce `kind` every `interval_us` microseconds
    async fn enable_report(&mut self, kind: ReportKind, interval_us: u32) -> Result<()>;

    /// Next available sensor event, `None` if nothing arrived
    async fn get_sensor_event(&mut self) -> Result<Option<SensorEvent>>;
}
