//! # IMU Joy
//!
//! Turn a BNO08x orientation sensor into a gamepad.
//!
//! This application reads the sensor's rotation vector and reports yaw,
//! pitch and roll as joystick axes of a virtual Bluetooth gamepad.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use imu_joy::bridge::{Bridge, BridgeMode};
use imu_joy::config::{Config, LoggingConfig};
use imu_joy::gamepad::VirtualGamepad;
use imu_joy::sensor::Bno08xSerial;
use imu_joy::serial::SensorSerial;
use imu_joy::sweep::SweepBridge;
use imu_joy::telemetry::TelemetryLogger;
use imu_joy::ticker::IntervalTicker;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily log files
const LOG_FILE_PREFIX: &str = "imu-joy.log";

/// Main entry point for IMU Joy
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, else `config/default.toml`,
///      else built-in defaults)
///    - Set up logging with tracing subscriber
///    - Open the sensor serial port, bring up sensor and virtual gamepad
///      (sweep mode skips the sensor and sends a test sawtooth instead)
///
/// 2. **Main Loop**
///    - Every `bridge.report_interval_ms` (5 ms by default) read one sensor
///      event and send the mapped axes
///    - Log status every `bridge.status_log_interval` reports
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be read or is invalid
/// - No serial port can be opened
/// - The sensor does not answer during initialization
/// - The virtual gamepad cannot be created
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO imu_joy: IMU Joy v0.1.0 starting...
/// INFO imu_joy::serial: Opened sensor port at /dev/ttyUSB0 (3000000 baud)
/// INFO imu_joy::bridge: Sensor initialized
/// INFO imu_joy::gamepad::uinput: Virtual gamepad 'MDS-IMUJoy' by MSmithDev ready ...
/// INFO imu_joy::bridge: Sent 1000 reports (...)
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(std::env::args().nth(1).as_deref())?;

    // Keep the guard alive so buffered log lines are written on exit
    let _log_guard = init_logging(&config.logging)?;

    info!("IMU Joy v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut ticker = IntervalTicker::from_millis(config.bridge.report_interval_ms);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        } else {
            info!("Received Ctrl+C");
        }
    };

    match config.bridge.mode {
        BridgeMode::Sensor => {
            let port = SensorSerial::open(&config.sensor.port, config.sensor.baud_rate)
                .context("Failed to open sensor serial port")?;
            info!("Sensor serial port opened at: {}", port.device_path());

            let sensor = Bno08xSerial::from_config(port, &config.sensor);
            let mut bridge = Bridge::new(sensor, VirtualGamepad::new(), &config);

            if config.telemetry.enabled {
                let logger = TelemetryLogger::new(&config.telemetry)
                    .context("Failed to set up telemetry logging")?;
                bridge = bridge.with_telemetry(logger);
            }

            bridge.begin().await.context("Initialization failed")?;

            info!(
                "Starting report loop every {} ms",
                config.bridge.report_interval_ms
            );
            info!("Press Ctrl+C to exit");
            bridge.run(&mut ticker, shutdown).await;
        }
        BridgeMode::Sweep => {
            let mut bridge = SweepBridge::new(VirtualGamepad::new(), &config);
            bridge.begin().context("Initialization failed")?;

            info!(
                "Starting sweep loop every {} ms",
                config.bridge.report_interval_ms
            );
            info!("Press Ctrl+C to exit");
            bridge.run(&mut ticker, shutdown).await;
        }
    }

    Ok(())
}

/// Load the configuration from `path`, the default file, or defaults
fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Set up stdout logging and, if configured, daily log files
///
/// `RUST_LOG` overrides `logging.level`.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = if config.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.file_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
