//! # Bridge
//!
//! Per-tick orchestration: sensor event in, gamepad report out.
//!
//! One tick does at most one read and at most one report:
//!
//! 1. Skip everything while the gamepad is not connected
//! 2. Re-enable the sensor report if the sensor was reset
//! 3. Read one event; nothing available means nothing to do this tick
//! 4. Map the quaternion to axis values and send them
//!
//! Axis values are returned from [`Bridge::tick`], nothing is kept between
//! ticks apart from counters.

use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::{Config, GamepadConfig};
use crate::error::{ImuJoyError, Result};
use crate::gamepad::{AxisReport, GamepadSink};
use crate::orientation::{MappingError, OrientationMapper};
use crate::sensor::{ReportKind, SensorDriver};
use crate::telemetry::TelemetryLogger;
use crate::ticker::Ticker;

/// What the loop sends to the gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeMode {
    /// Mapped sensor orientation
    #[default]
    Sensor,
    /// Sensorless sawtooth on rx/ry/rz (see [`crate::sweep`])
    Sweep,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Gamepad not connected; sensor untouched
    Disconnected,
    /// No event available (or the read failed)
    NoSample,
    /// Event of a kind other than the configured report
    IgnoredReport(ReportKind),
    /// Sample could not be mapped; nothing sent
    MappingFailed(MappingError),
    /// Report handed to the gamepad failed to go out
    SendFailed,
    /// Report sent
    Sent(AxisReport),
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub ticks: u64,
    pub sent: u64,
    pub disconnected: u64,
    pub no_sample: u64,
    pub ignored: u64,
    pub mapping_failures: u64,
    pub send_failures: u64,
    pub sensor_resets: u64,
}

impl BridgeStats {
    pub(crate) fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Disconnected => self.disconnected += 1,
            TickOutcome::NoSample => self.no_sample += 1,
            TickOutcome::IgnoredReport(_) => self.ignored += 1,
            TickOutcome::MappingFailed(_) => self.mapping_failures += 1,
            TickOutcome::SendFailed => self.send_failures += 1,
            TickOutcome::Sent(_) => self.sent += 1,
        }
    }
}

/// Sensor-to-gamepad bridge
pub struct Bridge<S, G> {
    sensor: S,
    gamepad: G,
    mapper: OrientationMapper,
    report_kind: ReportKind,
    report_interval_us: u32,
    gamepad_config: GamepadConfig,
    status_log_interval: u64,
    telemetry: Option<TelemetryLogger>,
    stats: BridgeStats,
    was_connected: bool,
    /// Consecutive mapping failures; only the first of a run is logged at warn
    mapping_failure_streak: u64,
}

impl<S: SensorDriver, G: GamepadSink> Bridge<S, G> {
    /// Create a bridge from the loaded configuration
    pub fn new(sensor: S, gamepad: G, config: &Config) -> Self {
        Self {
            sensor,
            gamepad,
            mapper: config.mapping.to_mapper(),
            report_kind: config.sensor.report,
            report_interval_us: config.sensor.report_interval_us,
            gamepad_config: config.gamepad.clone(),
            status_log_interval: config.bridge.status_log_interval.max(1),
            telemetry: None,
            stats: BridgeStats::default(),
            was_connected: false,
            mapping_failure_streak: 0,
        }
    }

    /// Record every sent report to `logger`
    pub fn with_telemetry(mut self, logger: TelemetryLogger) -> Self {
        self.telemetry = Some(logger);
        self
    }

    /// Counters so far
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Bring up sensor and gamepad, then enable the orientation report
    ///
    /// # Errors
    ///
    /// - `SensorInit` if the sensor does not come up
    /// - `Gamepad` if the virtual device cannot be created
    /// - any error from enabling the report
    pub async fn begin(&mut self) -> Result<()> {
        self.sensor.begin().await.map_err(|e| match e {
            init @ ImuJoyError::SensorInit(_) => init,
            other => ImuJoyError::SensorInit(other.to_string()),
        })?;
        info!("Sensor initialized");

        self.gamepad.begin(&self.gamepad_config)?;

        self.sensor
            .enable_report(self.report_kind, self.report_interval_us)
            .await
    }

    /// Run one tick
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = self.step().await;
        self.stats.record(&outcome);
        outcome
    }

    async fn step(&mut self) -> TickOutcome {
        let connected = self.gamepad.is_connected();
        if connected != self.was_connected {
            if connected {
                info!("Gamepad connected, forwarding orientation");
            } else {
                info!("Gamepad disconnected, pausing");
            }
            self.was_connected = connected;
        }
        if !connected {
            return TickOutcome::Disconnected;
        }

        if self.sensor.was_reset() {
            self.stats.sensor_resets += 1;
            info!("Sensor was reset, re-enabling {:?} report", self.report_kind);
            if let Err(e) = self
                .sensor
                .enable_report(self.report_kind, self.report_interval_us)
                .await
            {
                warn!("Failed to re-enable report: {}", e);
            }
        }

        let event = match self.sensor.get_sensor_event().await {
            Ok(Some(event)) => event,
            Ok(None) => return TickOutcome::NoSample,
            Err(e) => {
                debug!("Sensor read failed: {}", e);
                return TickOutcome::NoSample;
            }
        };

        if event.kind != self.report_kind {
            debug!("Ignoring {:?} report", event.kind);
            return TickOutcome::IgnoredReport(event.kind);
        }
        let Some(sample) = event.orientation() else {
            return TickOutcome::IgnoredReport(event.kind);
        };
        let quaternion = sample.quaternion;

        let mapped = match self.mapper.map(&quaternion) {
            Ok(mapped) => mapped,
            Err(e) => {
                self.mapping_failure_streak += 1;
                if self.mapping_failure_streak == 1 {
                    warn!("Dropping samples that cannot be mapped: {}", e);
                } else {
                    debug!("Dropping sample: {}", e);
                }
                return TickOutcome::MappingFailed(e);
            }
        };
        if self.mapping_failure_streak > 0 {
            info!(
                "Mapping recovered after {} dropped samples",
                self.mapping_failure_streak
            );
            self.mapping_failure_streak = 0;
        }

        if let Err(e) = self.gamepad.set_axes(&mapped.report) {
            debug!("Failed to send report: {}", e);
            return TickOutcome::SendFailed;
        }

        if let Some(logger) = self.telemetry.as_mut() {
            if let Err(e) = logger.record(&quaternion, &mapped) {
                warn!("Failed to record telemetry: {}", e);
            }
        }

        TickOutcome::Sent(mapped.report)
    }

    /// Tick until `shutdown` resolves
    ///
    /// Returns the final counters.
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
                    if let TickOutcome::Sent(report) = self.tick().await {
                        if self.stats.sent - last_log_count >= self.status_log_interval {
                            info!(
                                "Sent {} reports (last {:?}, {} without sample, {} mapping failures)",
                                self.stats.sent,
                                report.to_array(),
                                self.stats.no_sample,
                                self.stats.mapping_failures
                            );
                            last_log_count = self.stats.sent;
                        }
                    }
                }
            }
        }

        if let Some(logger) = self.telemetry.as_mut() {
            if let Err(e) = logger.flush() {
                warn!("Failed to flush telemetry: {}", e);
            }
        }

        info!("Total reports sent: {}", self.stats.sent);
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryConfig;
    use crate::gamepad::{HidAxis, MockGamepadSink};
    use crate::orientation::{AxisBinding, OutOfRangePolicy, Quaternion};
    use crate::sensor::{MockSensorDriver, OrientationSample, ReportPayload, SensorEvent};
    use crate::ticker::IntervalTicker;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use tokio::time::Duration;

    fn orientation_event(kind: ReportKind, quaternion: Quaternion) -> SensorEvent {
        SensorEvent {
            kind,
            sequence: 0,
            status: 3,
            payload: ReportPayload::Orientation(OrientationSample {
                quaternion,
                accuracy_rad: None,
            }),
        }
    }

    fn yaw_quarter_turn() -> Quaternion {
        Quaternion::new(0.7071, 0.0, 0.0, 0.7071)
    }

    fn connected_gamepad() -> MockGamepadSink {
        let mut gamepad = MockGamepadSink::new();
        gamepad.expect_is_connected().return_const(true);
        gamepad
    }

    fn sensor_with_event(event: SensorEvent) -> MockSensorDriver {
        let mut sensor = MockSensorDriver::new();
        sensor.expect_was_reset().return_const(false);
        sensor
            .expect_get_sensor_event()
            .returning(move || Ok(Some(event.clone())));
        sensor
    }

    #[tokio::test]
    async fn test_begin_brings_up_sensor_then_gamepad() {
        let mut seq = Sequence::new();
        let mut sensor = MockSensorDriver::new();
        let mut gamepad = MockGamepadSink::new();

        sensor
            .expect_begin()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        gamepad
            .expect_begin()
            .withf(|config| config.name == "MDS-IMUJoy")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        sensor
            .expect_enable_report()
            .with(eq(ReportKind::RotationVector), eq(5000))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert!(bridge.begin().await.is_ok());
    }

    #[tokio::test]
    async fn test_begin_sensor_failure_is_fatal() {
        let mut sensor = MockSensorDriver::new();
        let mut gamepad = MockGamepadSink::new();

        sensor
            .expect_begin()
            .returning(|| Err(ImuJoyError::SensorInit("no answer".to_string())));
        sensor.expect_enable_report().times(0);
        gamepad.expect_begin().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        let result = bridge.begin().await;
        assert!(matches!(result, Err(ImuJoyError::SensorInit(_))));
    }

    #[tokio::test]
    async fn test_begin_serial_error_becomes_sensor_init() {
        let mut sensor = MockSensorDriver::new();
        let mut gamepad = MockGamepadSink::new();

        sensor
            .expect_begin()
            .returning(|| Err(ImuJoyError::Serial("broken pipe".to_string())));
        gamepad.expect_begin().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        match bridge.begin().await {
            Err(ImuJoyError::SensorInit(msg)) => assert!(msg.contains("broken pipe")),
            other => panic!("expected SensorInit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_begin_gamepad_failure() {
        let mut sensor = MockSensorDriver::new();
        let mut gamepad = MockGamepadSink::new();

        sensor.expect_begin().returning(|| Ok(()));
        sensor.expect_enable_report().times(0);
        gamepad
            .expect_begin()
            .returning(|_| Err(ImuJoyError::Gamepad("no uinput".to_string())));

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert!(matches!(bridge.begin().await, Err(ImuJoyError::Gamepad(_))));
    }

    #[tokio::test]
    async fn test_disconnected_skips_sensor_and_report() {
        let mut sensor = MockSensorDriver::new();
        let mut gamepad = MockGamepadSink::new();

        gamepad.expect_is_connected().times(3).return_const(false);
        gamepad.expect_set_axes().times(0);
        sensor.expect_was_reset().times(0);
        sensor.expect_get_sensor_event().times(0);
        sensor.expect_enable_report().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        for _ in 0..3 {
            assert_eq!(bridge.tick().await, TickOutcome::Disconnected);
        }
        assert_eq!(bridge.stats().disconnected, 3);
        assert_eq!(bridge.stats().ticks, 3);
    }

    #[tokio::test]
    async fn test_quarter_yaw_turn_end_to_end() {
        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            yaw_quarter_turn(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad
            .expect_set_axes()
            .withf(|report| report.rx == 16383 && report.ry == 16383 && report.rz == 24575)
            .times(1)
            .returning(|_| Ok(()));

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        match bridge.tick().await {
            TickOutcome::Sent(report) => {
                assert_eq!(report.get(HidAxis::Rx), 16383);
                assert_eq!(report.get(HidAxis::Ry), 16383);
                assert_eq!(report.get(HidAxis::Rz), 24575);
                assert_eq!(report.x, 0);
            }
            other => panic!("expected Sent, got {:?}", other),
        }
        assert_eq!(bridge.stats().sent, 1);
    }

    #[tokio::test]
    async fn test_quarter_yaw_turn_with_narrow_yaw_domain() {
        let mut config = Config::default();
        config.mapping.yaw = AxisBinding::new(HidAxis::Rz).with_range(-90.0, 90.0);
        config.mapping.out_of_range = OutOfRangePolicy::Clamp;

        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            yaw_quarter_turn(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().returning(|_| Ok(()));

        let mut bridge = Bridge::new(sensor, gamepad, &config);
        match bridge.tick().await {
            TickOutcome::Sent(report) => assert!(report.rz >= 32766),
            other => panic!("expected Sent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_sample_is_skipped() {
        let mut sensor = MockSensorDriver::new();
        sensor.expect_was_reset().return_const(false);
        sensor.expect_get_sensor_event().returning(|| Ok(None));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert_eq!(bridge.tick().await, TickOutcome::NoSample);
        assert_eq!(bridge.tick().await, TickOutcome::NoSample);
        assert_eq!(bridge.stats().no_sample, 2);
    }

    #[tokio::test]
    async fn test_read_error_counts_as_no_sample() {
        let mut sensor = MockSensorDriver::new();
        sensor.expect_was_reset().return_const(false);
        sensor
            .expect_get_sensor_event()
            .returning(|| Err(ImuJoyError::ShtpProtocol("bad frame".to_string())));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert_eq!(bridge.tick().await, TickOutcome::NoSample);
    }

    #[tokio::test]
    async fn test_other_report_kind_is_ignored() {
        let sensor = sensor_with_event(orientation_event(
            ReportKind::GameRotationVector,
            yaw_quarter_turn(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert_eq!(
            bridge.tick().await,
            TickOutcome::IgnoredReport(ReportKind::GameRotationVector)
        );
    }

    #[tokio::test]
    async fn test_non_orientation_payload_is_ignored() {
        let sensor = sensor_with_event(SensorEvent {
            kind: ReportKind::RotationVector,
            sequence: 1,
            status: 0,
            payload: ReportPayload::Raw(vec![0x05, 0x01]),
        });
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert_eq!(
            bridge.tick().await,
            TickOutcome::IgnoredReport(ReportKind::RotationVector)
        );
    }

    #[tokio::test]
    async fn test_mapping_failure_sends_nothing() {
        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            Quaternion::new(0.0, 0.0, 0.0, 0.0),
        ));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert!(matches!(
            bridge.tick().await,
            TickOutcome::MappingFailed(MappingError::DegenerateQuaternion(_))
        ));
        assert_eq!(bridge.stats().mapping_failures, 1);
    }

    #[tokio::test]
    async fn test_mapping_failure_streak_resets_on_success() {
        let zero = orientation_event(ReportKind::RotationVector, Quaternion::new(0.0, 0.0, 0.0, 0.0));
        let good = orientation_event(ReportKind::RotationVector, Quaternion::identity());

        let mut sensor = MockSensorDriver::new();
        let mut seq = Sequence::new();
        sensor.expect_was_reset().return_const(false);
        for event in [zero.clone(), zero.clone(), zero, good] {
            sensor
                .expect_get_sensor_event()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move || Ok(Some(event.clone())));
        }
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(1).returning(|_| Ok(()));

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        for expected_streak in 1..=3 {
            assert!(matches!(bridge.tick().await, TickOutcome::MappingFailed(_)));
            assert_eq!(bridge.mapping_failure_streak, expected_streak);
        }
        assert!(matches!(bridge.tick().await, TickOutcome::Sent(_)));
        assert_eq!(bridge.mapping_failure_streak, 0);
        assert_eq!(bridge.stats().mapping_failures, 3);
    }

    #[tokio::test]
    async fn test_out_of_range_angle_rejected() {
        let mut config = Config::default();
        config.mapping.yaw = AxisBinding::new(HidAxis::Rz).with_range(-45.0, 45.0);

        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            yaw_quarter_turn(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &config);
        assert!(matches!(
            bridge.tick().await,
            TickOutcome::MappingFailed(MappingError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_failure_is_not_retried() {
        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            Quaternion::identity(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad
            .expect_set_axes()
            .times(1)
            .returning(|_| Err(ImuJoyError::Gamepad("write failed".to_string())));

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        assert_eq!(bridge.tick().await, TickOutcome::SendFailed);
        assert_eq!(bridge.stats().send_failures, 1);
    }

    #[tokio::test]
    async fn test_sensor_reset_reenables_report() {
        let mut sensor = MockSensorDriver::new();
        let mut seq = Sequence::new();

        sensor
            .expect_was_reset()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);
        sensor
            .expect_enable_report()
            .with(eq(ReportKind::RotationVector), eq(5000))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sensor
            .expect_get_sensor_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));

        let mut bridge = Bridge::new(sensor, connected_gamepad(), &Config::default());
        assert_eq!(bridge.tick().await, TickOutcome::NoSample);
        assert_eq!(bridge.stats().sensor_resets, 1);
    }

    #[tokio::test]
    async fn test_reenable_failure_still_reads() {
        let mut sensor = MockSensorDriver::new();
        sensor.expect_was_reset().return_const(true);
        sensor
            .expect_enable_report()
            .returning(|_, _| Err(ImuJoyError::Serial("timeout".to_string())));
        sensor.expect_get_sensor_event().times(1).returning(|| Ok(None));

        let mut bridge = Bridge::new(sensor, connected_gamepad(), &Config::default());
        assert_eq!(bridge.tick().await, TickOutcome::NoSample);
    }

    #[tokio::test]
    async fn test_sent_reports_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TelemetryLogger::new(&TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().to_string(),
            max_records_per_file: 100,
            max_files_to_keep: 2,
        })
        .unwrap();

        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            yaw_quarter_turn(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().returning(|_| Ok(()));

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default()).with_telemetry(logger);
        bridge.tick().await;
        bridge.tick().await;

        let logger = bridge.telemetry.as_mut().unwrap();
        logger.flush().unwrap();
        let contents = std::fs::read_to_string(logger.current_path().unwrap()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("\"rz\":24575"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let sensor = sensor_with_event(orientation_event(
            ReportKind::RotationVector,
            Quaternion::identity(),
        ));
        let mut gamepad = connected_gamepad();
        gamepad.expect_set_axes().returning(|_| Ok(()));

        let mut config = Config::default();
        config.bridge.status_log_interval = 2;

        let mut bridge = Bridge::new(sensor, gamepad, &config);
        let mut ticker = IntervalTicker::from_millis(5);

        // Ticks at 0, 5, 10, 15 and 20 ms
        let stats = bridge
            .run(&mut ticker, tokio::time::sleep(Duration::from_millis(22)))
            .await;

        assert_eq!(stats.ticks, 5);
        assert_eq!(stats.sent, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_immediately_on_shutdown() {
        let mut sensor = MockSensorDriver::new();
        sensor.expect_get_sensor_event().times(0);
        let mut gamepad = MockGamepadSink::new();
        gamepad.expect_is_connected().times(0);

        let mut bridge = Bridge::new(sensor, gamepad, &Config::default());
        let mut ticker = IntervalTicker::from_millis(5);

        let stats = bridge.run(&mut ticker, std::future::ready(())).await;
        assert_eq!(stats, BridgeStats::default());
    }
}
