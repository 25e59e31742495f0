//! # SHTP Protocol Module
//!
//! Implementation of the Sensor Hub Transport Protocol used by BNO08x
//! orientation sensors, over the UART transport.
//!
//! This module handles:
//! - SHTP packet encoding/decoding (4-byte header, per-channel sequence numbers)
//! - UART framing with byte stuffing
//! - Set Feature and soft reset commands
//! - Input report decoding (rotation vectors; other reports kept raw)

pub mod decoder;
pub mod encoder;
pub mod protocol;
