//! # SHTP Protocol Constants and Types
//!
//! Core definitions for the Sensor Hub Transport Protocol spoken by the
//! BNO080/BNO085/BNO086 family.

use serde::Deserialize;

use crate::orientation::Quaternion;

/// SHTP header size: length (2, LE) + channel (1) + sequence (1)
pub const SHTP_HEADER_SIZE: usize = 4;

/// Bit 15 of the length field flags a continuation packet
pub const SHTP_CONTINUATION_BIT: u16 = 0x8000;

/// Largest packet the host accepts (header included)
pub const SHTP_MAX_PACKET_SIZE: usize = 512;

/// Number of SHTP channels
pub const SHTP_NUM_CHANNELS: usize = 6;

/// UART frame delimiter
pub const UART_FLAG: u8 = 0x7E;

/// UART escape byte
pub const UART_ESCAPE: u8 = 0x7D;

/// Escaped bytes are XORed with this value
pub const UART_ESCAPE_XOR: u8 = 0x20;

/// UART protocol id for SHTP payloads
pub const UART_PROTOCOL_SHTP: u8 = 0x01;

/// Executable channel: host → sensor soft reset
pub const EXECUTABLE_RESET: u8 = 0x01;

/// Executable channel: sensor → host reset complete
pub const EXECUTABLE_RESET_COMPLETE: u8 = 0x01;

/// Control channel: Set Feature command
pub const CONTROL_SET_FEATURE: u8 = 0xFD;

/// Input channel: base timestamp reference prefixing batched reports
pub const REPORT_BASE_TIMESTAMP: u8 = 0xFB;

/// Base timestamp record size (id + 4 byte timestamp)
pub const BASE_TIMESTAMP_SIZE: usize = 5;

/// Set Feature command payload size
pub const SET_FEATURE_COMMAND_SIZE: usize = 17;

/// Q14 fixed-point scale (quaternion components)
pub const Q14_SCALE: f32 = 1.0 / 16384.0;

/// Q12 fixed-point scale (rotation vector accuracy, radians)
pub const Q12_SCALE: f32 = 1.0 / 4096.0;

/// SHTP channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    /// SHTP command channel (advertisement)
    Command = 0,
    /// Executable (reset, sleep, on)
    Executable = 1,
    /// Sensor hub control (feature requests)
    Control = 2,
    /// Normal input reports
    InputReport = 3,
    /// Wake input reports
    WakeReport = 4,
    /// Gyro-integrated rotation vector
    GyroRotationVector = 5,
}

impl Channel {
    /// Convert from raw byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Command),
            1 => Some(Self::Executable),
            2 => Some(Self::Control),
            3 => Some(Self::InputReport),
            4 => Some(Self::WakeReport),
            5 => Some(Self::GyroRotationVector),
            _ => None,
        }
    }
}

/// Sensor report kinds the host distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Accelerometer (0x01)
    Accelerometer,
    /// Calibrated gyroscope (0x02)
    GyroscopeCalibrated,
    /// Rotation vector, fused with magnetometer (0x05)
    RotationVector,
    /// Game rotation vector, no magnetometer (0x08)
    GameRotationVector,
    /// Anything else, by report id
    #[serde(skip)]
    Other(u8),
}

impl ReportKind {
    /// Report id on the wire
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Self::Accelerometer => 0x01,
            Self::GyroscopeCalibrated => 0x02,
            Self::RotationVector => 0x05,
            Self::GameRotationVector => 0x08,
            Self::Other(id) => id,
        }
    }

    /// Convert from raw report id
    #[must_use]
    pub fn from_id(id: u8) -> Self {
        match id {
            0x01 => Self::Accelerometer,
            0x02 => Self::GyroscopeCalibrated,
            0x05 => Self::RotationVector,
            0x08 => Self::GameRotationVector,
            other => Self::Other(other),
        }
    }

    /// Whether this report carries an orientation quaternion
    #[must_use]
    pub fn is_orientation(self) -> bool {
        matches!(self, Self::RotationVector | Self::GameRotationVector)
    }

    /// Minimum report length in bytes (id through last field)
    #[must_use]
    pub fn min_len(self) -> usize {
        match self {
            Self::RotationVector => 14,
            Self::GameRotationVector => 12,
            Self::Accelerometer | Self::GyroscopeCalibrated => 10,
            Self::Other(_) => 4,
        }
    }
}

/// SHTP packet (header fields + payload)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShtpPacket {
    /// Channel number
    pub channel: u8,

    /// Per-channel sequence number
    pub sequence: u8,

    /// Packet was flagged as a continuation of the previous one
    pub continuation: bool,

    /// Payload bytes (header excluded)
    pub payload: Vec<u8>,
}

impl ShtpPacket {
    /// Create a new packet
    pub fn new(channel: Channel, sequence: u8, payload: Vec<u8>) -> Self {
        Self {
            channel: channel as u8,
            sequence,
            continuation: false,
            payload,
        }
    }

    /// Whether the packet was sent on `channel`
    pub fn is_on(&self, channel: Channel) -> bool {
        self.channel == channel as u8
    }
}

/// Orientation carried by a rotation vector report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// Unit quaternion
    pub quaternion: Quaternion,

    /// Heading accuracy estimate in radians (rotation vector only)
    pub accuracy_rad: Option<f32>,
}

/// Decoded report body
#[derive(Debug, Clone, PartialEq)]
pub enum ReportPayload {
    /// Rotation vector / game rotation vector
    Orientation(OrientationSample),
    /// Any other report, unparsed (id included)
    Raw(Vec<u8>),
}

/// One sensor report as delivered to the host
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    /// Report type tag
    pub kind: ReportKind,

    /// Report sequence number
    pub sequence: u8,

    /// Status byte; the low two bits are the accuracy class (0-3)
    pub status: u8,

    /// Report body
    pub payload: ReportPayload,
}

impl SensorEvent {
    /// Accuracy class from the status byte
    pub fn accuracy_class(&self) -> u8 {
        self.status & 0x03
    }

    /// The orientation, if this is an orientation report
    pub fn orientation(&self) -> Option<&OrientationSample> {
        match &self.payload {
            ReportPayload::Orientation(sample) => Some(sample),
            _ => None,
        }
    }
}
