//! # SHTP Packet Decoder
//!
//! Reassembles SHTP packets from the UART byte stream and decodes the
//! sensor reports they carry.

use bytes::{Buf, BytesMut};
use tracing::trace;

use super::protocol::*;
use crate::error::{ImuJoyError, Result};
use crate::orientation::Quaternion;

/// Largest raw frame kept while waiting for its closing flag
const MAX_FRAME_SIZE: usize = 2 * SHTP_MAX_PACKET_SIZE + 4;

/// Quaternion components above ~1.04 in Q14 are corrupt
const MAX_Q14_COMPONENT: i16 = 17000;

/// Decode one SHTP packet (header + payload)
///
/// # Arguments
///
/// * `bytes` - Unstuffed packet bytes, header first
///
/// # Returns
///
/// * `Result<ShtpPacket>` - Decoded packet, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Fewer than 4 header bytes
/// - Length field is smaller than the header
/// - Fewer bytes than the length field announces
pub fn decode_packet(bytes: &[u8]) -> Result<ShtpPacket> {
    if bytes.len() < SHTP_HEADER_SIZE {
        return Err(ImuJoyError::ShtpProtocol(format!(
            "Packet too short: {} bytes",
            bytes.len()
        )));
    }

    let raw_length = u16::from_le_bytes([bytes[0], bytes[1]]);
    let continuation = raw_length & SHTP_CONTINUATION_BIT != 0;
    let length = (raw_length & !SHTP_CONTINUATION_BIT) as usize;

    if length < SHTP_HEADER_SIZE {
        return Err(ImuJoyError::ShtpProtocol(format!(
            "Invalid packet length: {}",
            length
        )));
    }

    if bytes.len() < length {
        return Err(ImuJoyError::ShtpProtocol(format!(
            "Packet truncated: expected {} bytes, got {}",
            length,
            bytes.len()
        )));
    }

    Ok(ShtpPacket {
        channel: bytes[2],
        sequence: bytes[3],
        continuation,
        payload: bytes[SHTP_HEADER_SIZE..length].to_vec(),
    })
}

/// Remove UART byte stuffing
fn unstuff(body: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut bytes = body.iter();

    while let Some(&byte) = bytes.next() {
        if byte == UART_ESCAPE {
            match bytes.next() {
                Some(&escaped) => out.push(escaped ^ UART_ESCAPE_XOR),
                None => {
                    return Err(ImuJoyError::ShtpProtocol(
                        "Dangling escape at end of frame".to_string(),
                    ))
                }
            }
        } else {
            out.push(byte);
        }
    }

    Ok(out)
}

/// Splits the UART byte stream into SHTP packets
///
/// Bytes may arrive in arbitrary chunks; anything before the first flag is
/// discarded, empty frames (back-to-back flags) are skipped, and frames
/// carrying a protocol id other than SHTP are dropped.
///
/// # Examples
///
/// ```
/// use imu_joy::shtp::decoder::UartFrameDecoder;
///
/// let mut decoder = UartFrameDecoder::new();
/// decoder.extend(&[0x7E, 0x01, 0x05, 0x00, 0x01, 0x00]);
/// assert!(decoder.next_packet().is_none()); // waiting for the rest
///
/// decoder.extend(&[0x01, 0x7E]);
/// let packet = decoder.next_packet().unwrap().unwrap();
/// assert_eq!(packet.channel, 1);
/// assert_eq!(packet.payload, vec![0x01]);
/// ```
#[derive(Debug, Default)]
pub struct UartFrameDecoder {
    buffer: BytesMut,
}

impl UartFrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes waiting to be framed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Next complete packet, if one is buffered
    ///
    /// # Returns
    ///
    /// * `None` - No complete frame yet
    /// * `Some(Ok(packet))` - Decoded packet
    /// * `Some(Err(_))` - A complete frame was malformed (it is consumed)
    pub fn next_packet(&mut self) -> Option<Result<ShtpPacket>> {
        loop {
            let Some(start) = self.buffer.iter().position(|&b| b == UART_FLAG) else {
                self.buffer.clear();
                return None;
            };
            self.buffer.advance(start);

            let Some(end) = self.buffer[1..].iter().position(|&b| b == UART_FLAG) else {
                if self.buffer.len() > MAX_FRAME_SIZE {
                    trace!("Discarding {} unframed bytes", self.buffer.len());
                    self.buffer.clear();
                }
                return None;
            };

            // Leave the closing flag in place; it may open the next frame
            let frame = self.buffer.split_to(end + 1);
            if frame.len() == 1 {
                continue;
            }

            let body = match unstuff(&frame[1..]) {
                Ok(body) => body,
                Err(e) => return Some(Err(e)),
            };

            match body.first() {
                Some(&UART_PROTOCOL_SHTP) => return Some(decode_packet(&body[1..])),
                Some(&protocol) => {
                    trace!("Skipping UART frame with protocol id 0x{:02X}", protocol);
                }
                None => {}
            }
        }
    }
}

/// Decode an input-report payload into a sensor event
///
/// Handles the base timestamp record (0xFB) the hub prepends to batched
/// reports by skipping it.
///
/// # Returns
///
/// * `Ok(None)` - Payload holds no report
/// * `Ok(Some(event))` - Decoded report
///
/// # Errors
///
/// Returns error if the report is shorter than its type requires or a
/// quaternion component is out of range.
pub fn decode_input_report(payload: &[u8]) -> Result<Option<SensorEvent>> {
    let report = match payload.first() {
        None => return Ok(None),
        Some(&REPORT_BASE_TIMESTAMP) => {
            if payload.len() <= BASE_TIMESTAMP_SIZE {
                return Ok(None);
            }
            &payload[BASE_TIMESTAMP_SIZE..]
        }
        Some(_) => payload,
    };

    let kind = ReportKind::from_id(report[0]);
    if report.len() < kind.min_len() {
        return Err(ImuJoyError::ShtpProtocol(format!(
            "Report 0x{:02X} too short: {} bytes (need {})",
            report[0],
            report.len(),
            kind.min_len()
        )));
    }

    let payload = match kind {
        ReportKind::RotationVector | ReportKind::GameRotationVector => {
            ReportPayload::Orientation(decode_orientation(kind, report)?)
        }
        _ => ReportPayload::Raw(report.to_vec()),
    };

    Ok(Some(SensorEvent {
        kind,
        sequence: report[1],
        status: report[2],
        payload,
    }))
}

fn read_i16(report: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([report[offset], report[offset + 1]])
}

/// Layout: id, seq, status, delay, i, j, k, real (Q14), [accuracy (Q12)]
fn decode_orientation(kind: ReportKind, report: &[u8]) -> Result<OrientationSample> {
    let q_i = read_i16(report, 4);
    let q_j = read_i16(report, 6);
    let q_k = read_i16(report, 8);
    let q_real = read_i16(report, 10);

    for component in [q_i, q_j, q_k, q_real] {
        if component.saturating_abs() > MAX_Q14_COMPONENT {
            return Err(ImuJoyError::ShtpProtocol(format!(
                "Quaternion component out of range: {}",
                component
            )));
        }
    }

    let accuracy_rad = match kind {
        ReportKind::RotationVector => Some(read_i16(report, 12) as f32 * Q12_SCALE),
        _ => None,
    };

    Ok(OrientationSample {
        quaternion: Quaternion::new(
            q_real as f32 * Q14_SCALE,
            q_i as f32 * Q14_SCALE,
            q_j as f32 * Q14_SCALE,
            q_k as f32 * Q14_SCALE,
        ),
        accuracy_rad,
    })
}
