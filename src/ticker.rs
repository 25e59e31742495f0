//! # Tick Source
//!
//! Paces the bridge loop. [`IntervalTicker`] sleeps until the next deadline
//! of a fixed-period schedule on the monotonic clock, so the period does not
//! drift with the time spent inside a tick.

use async_trait::async_trait;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

/// Source of loop ticks
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick
    async fn tick(&mut self);
}

/// Fixed-period ticker backed by [`tokio::time::Interval`]
///
/// The first tick completes immediately. A late tick does not trigger a
/// burst of catch-up ticks; the schedule is shifted instead.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
    period: Duration,
}

impl IntervalTicker {
    /// Create a ticker with the given period (must be non-zero)
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero; config validation rejects that value.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    /// Create a ticker from a period in milliseconds
    pub fn from_millis(period_ms: u64) -> Self {
        Self::new(Duration::from_millis(period_ms))
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
