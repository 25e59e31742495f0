//! # SHTP Packet Encoder
//!
//! Builds SHTP packets and wraps them in UART frames.
//!
//! ## UART Frame Structure
//!
//! ```text
//! [0x7E] [0x01] [SHTP header (4)] [payload (N)] [0x7E]
//!         ^ protocol id    ^ byte-stuffed: 0x7E -> 0x7D 0x5E, 0x7D -> 0x7D 0x5D
//! ```

use super::protocol::*;
use crate::error::{ImuJoyError, Result};

/// Encode an SHTP packet (header + payload)
///
/// # Arguments
///
/// * `packet` - Packet to encode
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Encoded bytes, or error if the payload is too large
///
/// # Examples
///
/// ```
/// use imu_joy::shtp::encoder::encode_packet;
/// use imu_joy::shtp::protocol::{Channel, ShtpPacket};
///
/// let packet = ShtpPacket::new(Channel::Executable, 0, vec![0x01]);
/// let bytes = encode_packet(&packet).unwrap();
/// assert_eq!(bytes, vec![0x05, 0x00, 0x01, 0x00, 0x01]);
/// ```
pub fn encode_packet(packet: &ShtpPacket) -> Result<Vec<u8>> {
    let total_len = SHTP_HEADER_SIZE + packet.payload.len();
    if total_len > SHTP_MAX_PACKET_SIZE {
        return Err(ImuJoyError::ShtpProtocol(format!(
            "Packet too large: {} bytes (max {})",
            total_len, SHTP_MAX_PACKET_SIZE
        )));
    }

    let mut length = total_len as u16;
    if packet.continuation {
        length |= SHTP_CONTINUATION_BIT;
    }

    let mut bytes = Vec::with_capacity(total_len);
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.push(packet.channel);
    bytes.push(packet.sequence);
    bytes.extend_from_slice(&packet.payload);
    Ok(bytes)
}

/// Wrap encoded SHTP bytes in a UART frame
///
/// # Arguments
///
/// * `shtp_bytes` - Output of [`encode_packet`]
///
/// # Returns
///
/// * `Vec<u8>` - Flag-delimited, byte-stuffed frame
pub fn encode_uart_frame(shtp_bytes: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(shtp_bytes.len() + 4);
    frame.push(UART_FLAG);
    frame.push(UART_PROTOCOL_SHTP);

    for &byte in shtp_bytes {
        if byte == UART_FLAG || byte == UART_ESCAPE {
            frame.push(UART_ESCAPE);
            frame.push(byte ^ UART_ESCAPE_XOR);
        } else {
            frame.push(byte);
        }
    }

    frame.push(UART_FLAG);
    frame
}

/// Build a Set Feature command enabling `kind` at `report_interval_us`
///
/// # Layout
///
/// ```text
/// 0      Command (0xFD)
/// 1      Feature report id
/// 2      Feature flags
/// 3-4    Change sensitivity
/// 5-8    Report interval (µs, LE)
/// 9-12   Batch interval
/// 13-16  Sensor-specific config
/// ```
pub fn build_set_feature_command(
    kind: ReportKind,
    report_interval_us: u32,
) -> [u8; SET_FEATURE_COMMAND_SIZE] {
    let mut command = [0u8; SET_FEATURE_COMMAND_SIZE];
    command[0] = CONTROL_SET_FEATURE;
    command[1] = kind.id();
    command[5..9].copy_from_slice(&report_interval_us.to_le_bytes());
    command
}

/// Build the executable-channel soft reset payload
pub fn build_soft_reset() -> [u8; 1] {
    [EXECUTABLE_RESET]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_packet_header() {
        let packet = ShtpPacket::new(Channel::Control, 7, vec![0xAA; 17]);
        let bytes = encode_packet(&packet).unwrap();

        assert_eq!(bytes.len(), 21);
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 21);
        assert_eq!(bytes[2], Channel::Control as u8);
        assert_eq!(bytes[3], 7);
        assert_eq!(&bytes[4..], &[0xAA; 17]);
    }

    #[test]
    fn test_encode_packet_continuation_bit() {
        let mut packet = ShtpPacket::new(Channel::InputReport, 0, vec![0x01]);
        packet.continuation = true;
        let bytes = encode_packet(&packet).unwrap();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 0x8005);
    }

    #[test]
    fn test_encode_packet_too_large() {
        let packet = ShtpPacket::new(Channel::Control, 0, vec![0; SHTP_MAX_PACKET_SIZE]);
        let result = encode_packet(&packet);
        assert!(matches!(result, Err(ImuJoyError::ShtpProtocol(_))));
    }

    #[test]
    fn test_uart_frame_delimiters() {
        let frame = encode_uart_frame(&[0x05, 0x00, 0x01, 0x00, 0x01]);
        assert_eq!(frame, vec![0x7E, 0x01, 0x05, 0x00, 0x01, 0x00, 0x01, 0x7E]);
    }

    #[test]
    fn test_uart_frame_stuffing() {
        let frame = encode_uart_frame(&[0x7E, 0x10, 0x7D]);
        assert_eq!(frame, vec![0x7E, 0x01, 0x7D, 0x5E, 0x10, 0x7D, 0x5D, 0x7E]);
    }

    #[test]
    fn test_set_feature_command() {
        let command = build_set_feature_command(ReportKind::RotationVector, 5000);

        assert_eq!(command[0], 0xFD);
        assert_eq!(command[1], 0x05);
        assert_eq!(u32::from_le_bytes([command[5], command[6], command[7], command[8]]), 5000);
        assert!(command[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_feature_command_game_rotation_vector() {
        let command = build_set_feature_command(ReportKind::GameRotationVector, 10_000);
        assert_eq!(command[1], 0x08);
        assert_eq!(&command[5..9], &10_000u32.to_le_bytes());
    }

    #[test]
    fn test_soft_reset_payload() {
        assert_eq!(build_soft_reset(), [0x01]);
    }
}
