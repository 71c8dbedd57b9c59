//! Corsair peripheral protocol report encoding.
//!
//! Every report is exactly 65 bytes:
//! - byte 0: report ID placeholder, always 0x00
//! - byte 1: command (WRITE, READ or STREAM)
//! - byte 2: property for WRITE/READ, packet ID for STREAM
//! - bytes 3..: command-specific selector bytes and payload, zero-padded
//!
//! Protocol reference: OpenRGB `CorsairPeripheralController` (GPLv2, protocol knowledge only).

use crate::error::{Error, Result};

/// Report length including the leading report ID byte.
pub const REPORT_LEN: usize = 65;

/// Offset of the first selector byte (property or packet ID).
pub const SELECTOR_OFFSET: usize = 2;

/// Offset where bulk data starts in WRITE and STREAM reports.
pub const DATA_OFFSET: usize = 5;

/// Largest payload that fits after the data offset.
pub const MAX_DATA_LEN: usize = REPORT_LEN - DATA_OFFSET;

/// Command codes (report byte 1).
pub mod command {
    /// Set a property.
    pub const WRITE: u8 = 0x07;
    /// Request a property's current value.
    pub const READ: u8 = 0x0E;
    /// Push a chunk of raw per-channel color data into the staging buffer.
    pub const STREAM: u8 = 0x7F;
}

/// Property codes (report byte 2 for WRITE and READ).
pub mod property {
    /// Firmware and device identification block.
    pub const FIRMWARE_INFO: u8 = 0x01;
    /// Special function control (G-keys, macro handling).
    pub const SPECIAL_FUNCTION: u8 = 0x04;
    /// Lighting control mode.
    pub const LIGHTING_CONTROL: u8 = 0x05;
    /// Commit one streamed 24-bit color channel.
    pub const SUBMIT_KEYBOARD_COLOR_24: u8 = 0x28;
    /// Lighting identifier table upload.
    pub const KEY_ID_TABLE: u8 = 0x40;
}

/// Lighting control mode markers.
pub mod lighting_control {
    pub const SOFTWARE: u8 = 0x02;
}

/// A single fixed-length HID output report.
#[derive(Clone, PartialEq, Eq)]
pub struct Report {
    bytes: [u8; REPORT_LEN],
}

impl Report {
    /// Build a report from a command, selector bytes and a payload.
    ///
    /// `selector` is written starting at byte 2. `payload` is written starting
    /// at `payload_offset`. Everything else stays zero.
    ///
    /// # Panics
    ///
    /// Panics if the selector overruns the payload offset, or if the payload
    /// does not fit in the report. Callers size their data from protocol
    /// constants, so either case is a bug.
    pub fn encode(command: u8, selector: &[u8], payload_offset: usize, payload: &[u8]) -> Self {
        let selector_end = SELECTOR_OFFSET + selector.len();
        assert!(
            selector_end <= REPORT_LEN,
            "selector of {} bytes overruns report",
            selector.len()
        );
        assert!(
            payload.is_empty() || (payload_offset >= selector_end),
            "payload offset {payload_offset} overlaps selector ending at {selector_end}"
        );
        assert!(
            payload_offset + payload.len() <= REPORT_LEN,
            "payload of {} bytes at offset {payload_offset} exceeds {REPORT_LEN}-byte report",
            payload.len()
        );

        let mut bytes = [0u8; REPORT_LEN];
        bytes[1] = command;
        bytes[SELECTOR_OFFSET..selector_end].copy_from_slice(selector);
        bytes[payload_offset..payload_offset + payload.len()].copy_from_slice(payload);
        Self { bytes }
    }

    /// WRITE report: `selector` starts with the property, `data` lands at byte 5.
    pub fn write(selector: &[u8], data: &[u8]) -> Self {
        Self::encode(command::WRITE, selector, DATA_OFFSET, data)
    }

    /// READ report for a single property.
    pub fn read(property: u8) -> Self {
        Self::encode(command::READ, &[property], DATA_OFFSET, &[])
    }

    /// STREAM report carrying one chunk of a color channel.
    ///
    /// Byte 2 is the 1-based packet ID, byte 3 the chunk length.
    pub fn stream(packet_id: u8, chunk: &[u8]) -> Self {
        assert!(
            chunk.len() <= MAX_DATA_LEN,
            "stream chunk of {} bytes exceeds {MAX_DATA_LEN}",
            chunk.len()
        );
        Self::encode(
            command::STREAM,
            &[packet_id, chunk.len() as u8],
            DATA_OFFSET,
            chunk,
        )
    }

    /// Parse raw bytes back into a report.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let bytes: [u8; REPORT_LEN] = data.try_into().map_err(|_| {
            Error::Hid(format!(
                "report must be {REPORT_LEN} bytes, got {}",
                data.len()
            ))
        })?;
        if bytes[0] != 0x00 {
            return Err(Error::Hid(format!(
                "unexpected report ID: 0x{:02X}",
                bytes[0]
            )));
        }
        Ok(Self { bytes })
    }

    /// Command byte.
    pub fn command(&self) -> u8 {
        self.bytes[1]
    }

    /// Byte at an absolute offset.
    pub fn byte(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    /// Data region starting at byte 5.
    pub fn data(&self) -> &[u8] {
        &self.bytes[DATA_OFFSET..]
    }

    /// Raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Trailing zero padding is noise in logs.
        let used = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(2, |i| i + 1)
            .max(2);
        write!(f, "Report({:02X?})", &self.bytes[..used])
    }
}
