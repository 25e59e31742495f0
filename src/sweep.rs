//! # Axis Sweep
//!
//! Sensorless test pattern: rx, ry and rz ramp up by a fixed step every
//! tick and wrap to 0 past 32767. Useful to check the gamepad on the host
//! (e.g. with `evtest` or a game controller panel) without any sensor
//! attached.

use std::future::Future;
use tracing::{debug, info};

use crate::bridge::{BridgeStats, TickOutcome};
use crate::config::{Config, GamepadConfig};
use crate::error::Result;
use crate::gamepad::{AxisReport, GamepadSink, HidAxis};
use crate::orientation::AXIS_VALUE_MAX;
use crate::ticker::Ticker;

/// Default increment per tick
pub const DEFAULT_SWEEP_STEP: u16 = 10;

/// Sawtooth over `[0, 32767]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSweep {
    value: i32,
    step: i32,
}

impl Default for AxisSweep {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_STEP)
    }
}

impl AxisSweep {
    /// Start at 0; the first value produced is `step`
    pub fn new(step: u16) -> Self {
        Self {
            value: 0,
            step: i32::from(step),
        }
    }

    /// Current value
    pub fn value(&self) -> i16 {
        self.value as i16
    }

    /// Step forward, wrapping to 0 once the value passes the axis maximum
    pub fn advance(&mut self) -> i16 {
        self.value += self.step;
        if self.value > i32::from(AXIS_VALUE_MAX) {
            self.value = 0;
        }
        self.value as i16
    }

    /// Advance and build the report: the value on rx, ry and rz, 0 elsewhere
    pub fn next_report(&mut self) -> AxisReport {
        let value = self.advance();
        let mut report = AxisReport::default();
        report.set(HidAxis::Rx, value);
        report.set(HidAxis::Ry, value);
        report.set(HidAxis::Rz, value);
        report
    }
}

/// Drives the gamepad with an [`AxisSweep`]
pub struct SweepBridge<G> {
    gamepad: G,
    sweep: AxisSweep,
    gamepad_config: GamepadConfig,
    status_log_interval: u64,
    stats: BridgeStats,
}

impl<G: GamepadSink> SweepBridge<G> {
    pub fn new(gamepad: G, config: &Config) -> Self {
        Self {
            gamepad,
            sweep: AxisSweep::new(config.bridge.sweep_step),
            gamepad_config: config.gamepad.clone(),
            status_log_interval: config.bridge.status_log_interval.max(1),
            stats: BridgeStats::default(),
        }
    }

    /// Create the gamepad
    pub fn begin(&mut self) -> Result<()> {
        self.gamepad.begin(&self.gamepad_config)?;
        info!("Sweep mode: no sensor, rx/ry/rz ramp 0-{}", AXIS_VALUE_MAX);
        Ok(())
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Send the next sweep value if a host is connected
    ///
    /// The sweep only advances on connected ticks.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = if !self.gamepad.is_connected() {
            TickOutcome::Disconnected
        } else {
            let report = self.sweep.next_report();
            match self.gamepad.set_axes(&report) {
                Ok(()) => TickOutcome::Sent(report),
                Err(e) => {
                    debug!("Failed to send report: {}", e);
                    TickOutcome::SendFailed
                }
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    /// Tick until `shutdown` resolves
    pub async fn run<T, F>(&mut self, ticker: &mut T, shutdown: F) -> BridgeStats
    where
        T: Ticker,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut last_log_count = self.stats.sent;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutting down...");
                    break;
                }

                _ = ticker.tick() => {
                    if let TickOutcome::Sent(_) = self.tick() {
                        if self.stats.sent - last_log_count >= self.status_log_interval {
                            info!("Sent {} sweep reports (rx {})", self.stats.sent, self.sweep.value());
                            last_log_count = self.stats.sent;
                        }
                    }
                }
            }
        }

        info!("Total reports sent: {}", self.stats.sent);
        self.stats
    }
}
