//! # BNO08x UART Driver
//!
//! Drives a BNO080/BNO085/BNO086 in UART-SHTP mode over any
//! [`SerialPortIO`].
//!
//! ## Startup
//!
//! 1. Soft reset on the executable channel
//! 2. Wait for the reset-complete notification (or any SHTP traffic)
//! 3. Enable the wanted report via Set Feature on the control channel
//!
//! A reset notification received later (brown-out, watchdog) clears all
//! enabled features on the hub; [`SensorDriver::was_reset`] reports it so
//! the caller can enable them again.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, trace, warn};

use super::{ReportKind, SensorDriver, SensorEvent};
use crate::config::SensorConfig;
use crate::error::{ImuJoyError, Result};
use crate::serial::SerialPortIO;
use crate::shtp::decoder::{decode_input_report, UartFrameDecoder};
use crate::shtp::encoder::{
    build_set_feature_command, build_soft_reset, encode_packet, encode_uart_frame,
};
use crate::shtp::protocol::{
    Channel, ShtpPacket, EXECUTABLE_RESET_COMPLETE, SHTP_NUM_CHANNELS,
};

/// Bytes requested from the port per read
const READ_CHUNK_SIZE: usize = 256;

/// Upper bound on packets drained per `get_sensor_event` call
const MAX_PACKETS_PER_POLL: usize = 16;

/// Pause between polls while waiting for the hub to boot
const INIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// BNO08x sensor hub on a serial port
pub struct Bno08xSerial<P> {
    port: P,
    decoder: UartFrameDecoder,
    /// Next sequence number per channel (host → hub)
    sequence: [u8; SHTP_NUM_CHANNELS],
    read_timeout: Duration,
    init_timeout: Duration,
    reset_pending: bool,
    /// Report kind last enabled; preferred when draining a backlog
    enabled_report: Option<ReportKind>,
    read_buf: Vec<u8>,
}

impl<P: SerialPortIO> Bno08xSerial<P> {
    /// Create a driver with explicit timeouts
    ///
    /// # Arguments
    ///
    /// * `port` - Open serial port
    /// * `read_timeout` - How long one poll waits for bytes
    /// * `init_timeout` - How long `begin` waits for the hub to answer
    pub fn new(port: P, read_timeout: Duration, init_timeout: Duration) -> Self {
        Self {
            port,
            decoder: UartFrameDecoder::new(),
            sequence: [0; SHTP_NUM_CHANNELS],
            read_timeout,
            init_timeout,
            reset_pending: false,
            enabled_report: None,
            read_buf: vec![0; READ_CHUNK_SIZE],
        }
    }

    /// Create a driver using the timeouts from `config`
    pub fn from_config(port: P, config: &SensorConfig) -> Self {
        Self::new(
            port,
            Duration::from_millis(config.read_timeout_ms),
            Duration::from_millis(config.init_timeout_ms),
        )
    }

    /// Send `payload` on `channel`
    async fn send(&mut self, channel: Channel, payload: &[u8]) -> Result<()> {
        let index = channel as usize;
        let packet = ShtpPacket::new(channel, self.sequence[index], payload.to_vec());
        self.sequence[index] = self.sequence[index].wrapping_add(1);

        let frame = encode_uart_frame(&encode_packet(&packet)?);

        self.port.write_all(&frame).await
            .map_err(|e| ImuJoyError::Serial(format!("Failed to write packet: {}", e)))?;

        self.port.flush().await
            .map_err(|e| ImuJoyError::Serial(format!("Failed to flush serial port: {}", e)))?;

        trace!("Sent SHTP packet on channel {:?} ({} bytes)", channel, frame.len());
        Ok(())
    }

    /// Next complete packet, reading from the port at most once
    async fn poll_packet(&mut self) -> Result<Option<ShtpPacket>> {
        if let Some(result) = self.decoder.next_packet() {
            return result.map(Some);
        }

        if !self.read_chunk().await? {
            return Ok(None);
        }
        self.decoder.next_packet().transpose()
    }

    /// Read once from the port into the frame decoder
    ///
    /// Returns `false` if nothing arrived within the read timeout.
    async fn read_chunk(&mut self) -> Result<bool> {
        let n = match timeout(self.read_timeout, self.port.read(&mut self.read_buf)).await {
            Err(_) => return Ok(false),
            Ok(Err(e)) => {
                return Err(ImuJoyError::Serial(format!("Failed to read: {}", e)));
            }
            Ok(Ok(n)) => n,
        };

        if n == 0 {
            return Ok(false);
        }

        self.decoder.extend(&self.read_buf[..n]);
        Ok(true)
    }

    fn is_wanted(&self, event: &SensorEvent) -> bool {
        match self.enabled_report {
            Some(kind) => event.kind == kind,
            None => event.kind.is_orientation(),
        }
    }
}

fn is_reset_complete(packet: &ShtpPacket) -> bool {
    packet.is_on(Channel::Executable)
        && packet.payload.first() == Some(&EXECUTABLE_RESET_COMPLETE)
}

#[async_trait]
impl<P: SerialPortIO> SensorDriver for Bno08xSerial<P> {
    async fn begin(&mut self) -> Result<()> {
        self.decoder.clear();
        self.send(Channel::Executable, &build_soft_reset()).await?;

        let deadline = Instant::now() + self.init_timeout;
        while Instant::now() < deadline {
            match self.poll_packet().await {
                Ok(Some(packet)) if is_reset_complete(&packet) || packet.is_on(Channel::Command) => {
                    info!("Sensor hub is up (first packet on channel {})", packet.channel);
                    self.reset_pending = false;
                    return Ok(());
                }
                Ok(Some(packet)) => {
                    debug!("Ignoring packet on channel {} during startup", packet.channel);
                }
                Ok(None) => sleep(INIT_POLL_INTERVAL).await,
                Err(ImuJoyError::ShtpProtocol(msg)) => {
                    debug!("Malformed packet during startup: {}", msg);
                }
                Err(e) => return Err(ImuJoyError::SensorInit(e.to_string())),
            }
        }

        Err(ImuJoyError::SensorInit(format!(
            "no answer from sensor within {} ms",
            self.init_timeout.as_millis()
        )))
    }

    fn was_reset(&mut self) -> bool {
        std::mem::take(&mut self.reset_pending)
    }

    async fn enable_report(&mut self, kind: ReportKind, interval_us: u32) -> Result<()> {
        let command = build_set_feature_command(kind, interval_us);
        self.send(Channel::Control, &command).await?;
        self.enabled_report = Some(kind);
        info!("Enabled {:?} report every {} us", kind, interval_us);
        Ok(())
    }

    /// Drain the packets already buffered and return the newest report
    ///
    /// Reads from the port at most once. Reports of the enabled kind win
    /// over other reports; among those the last one received wins, so a
    /// backlog never delays the orientation handed to the caller.
    async fn get_sensor_event(&mut self) -> Result<Option<SensorEvent>> {
        let mut newest: Option<SensorEvent> = None;
        let mut first_error: Option<ImuJoyError> = None;
        let mut read_done = false;
        let mut drained = 0;

        while drained < MAX_PACKETS_PER_POLL {
            let packet = match self.decoder.next_packet() {
                Some(Ok(packet)) => packet,
                Some(Err(e)) => {
                    debug!("Dropping malformed packet: {}", e);
                    first_error.get_or_insert(e);
                    drained += 1;
                    continue;
                }
                None if !read_done => {
                    read_done = true;
                    if self.read_chunk().await? {
                        continue;
                    }
                    break;
                }
                None => break,
            };
            drained += 1;

            match Channel::from_u8(packet.channel) {
                Some(Channel::Executable) if is_reset_complete(&packet) => {
                    warn!("Sensor hub reported a reset");
                    self.reset_pending = true;
                }
                Some(Channel::InputReport) | Some(Channel::WakeReport) => {
                    match decode_input_report(&packet.payload) {
                        Ok(Some(event)) => {
                            let keep_previous = newest
                                .as_ref()
                                .map_or(false, |n| self.is_wanted(n) && !self.is_wanted(&event));
                            if !keep_previous {
                                if newest.is_some() {
                                    trace!("Superseding buffered report");
                                }
                                newest = Some(event);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            debug!("Dropping malformed report: {}", e);
                            first_error.get_or_insert(e);
                        }
                    }
                }
                _ => {
                    trace!("Ignoring packet on channel {}", packet.channel);
                }
            }
        }

        match (newest, first_error) {
            (Some(event), _) => Ok(Some(event)),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(None),
        }
    }
}
