//! Command and response framing.
//!
//! ```text
//! command:  [0x03][length][opcode][param1][param2 LE][payload..][crc LE]
//! response:       [length][payload..][crc LE]
//! ```
//!
//! `length` counts itself, everything after it and the CRC. The CRC covers
//! every byte from `length` up to the CRC. This layer is stateless: timing,
//! polling and retries belong to the dispatcher.

use crate::crc::crc16;
use crate::error::EccError;

/// Word-address marker preceding every command frame.
pub const COMMAND_MARKER: u8 = 0x03;

/// Marker, length, opcode, param1, param2 (2) and CRC (2).
pub const COMMAND_OVERHEAD: usize = 8;

/// Length byte and CRC (2).
pub const RESPONSE_OVERHEAD: usize = 3;

/// Largest payload whose frame length still fits the one-byte length field.
pub const MAX_COMMAND_PAYLOAD: usize = u8::MAX as usize - (COMMAND_OVERHEAD - 1);

/// Largest payload a response frame can describe.
pub const MAX_RESPONSE_PAYLOAD: usize = u8::MAX as usize - RESPONSE_OVERHEAD;

/// An outgoing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub opcode: u8,
    pub param1: u8,
    pub param2: u16,
    pub payload: Vec<u8>,
}

impl CommandFrame {
    pub fn new(opcode: u8, param1: u8, param2: u16, payload: &[u8]) -> Self {
        CommandFrame {
            opcode,
            param1,
            param2,
            payload: payload.to_vec(),
        }
    }

    /// Value of the length field: every byte after the marker, CRC included.
    pub fn length(&self) -> usize {
        COMMAND_OVERHEAD - 1 + self.payload.len()
    }

    /// Serialize to wire bytes, marker first.
    pub fn encode(&self) -> Result<Vec<u8>, EccError> {
        if self.payload.len() > MAX_COMMAND_PAYLOAD {
            return Err(EccError::InvalidArgument("command payload too long"));
        }

        let mut packet = Vec::with_capacity(COMMAND_OVERHEAD + self.payload.len());
        packet.push(COMMAND_MARKER);
        packet.push(self.length() as u8);
        packet.push(self.opcode);
        packet.push(self.param1);
        packet.extend_from_slice(&self.param2.to_le_bytes());
        packet.extend_from_slice(&self.payload);

        let crc = crc16(&packet[1..]);
        packet.extend_from_slice(&crc.to_le_bytes());

        Ok(packet)
    }

    /// Parse and validate wire bytes produced by [`CommandFrame::encode`].
    ///
    /// The host never receives commands; this exists for device simulators
    /// and for checking what a driver put on the bus.
    pub fn decode(raw: &[u8]) -> Result<Self, EccError> {
        if raw.len() < COMMAND_OVERHEAD {
            return Err(EccError::FramingMismatch(format!(
                "command frame of {} bytes is shorter than the {} byte minimum",
                raw.len(),
                COMMAND_OVERHEAD
            )));
        }
        if raw[0] != COMMAND_MARKER {
            return Err(EccError::FramingMismatch(format!(
                "unexpected command marker 0x{:02x}",
                raw[0]
            )));
        }

        let length = raw[1] as usize;
        if length + 1 != raw.len() {
            return Err(EccError::FramingMismatch(format!(
                "declared length {} does not match {} received bytes",
                length,
                raw.len() - 1
            )));
        }

        let (body, crc_bytes) = raw.split_at(raw.len() - 2);
        verify_crc(&body[1..], crc_bytes)?;

        Ok(CommandFrame {
            opcode: raw[2],
            param1: raw[3],
            param2: u16::from_le_bytes([raw[4], raw[5]]),
            payload: body[6..].to_vec(),
        })
    }
}

/// Build the wire bytes of a command.
pub fn encode_command(
    opcode: u8,
    param1: u8,
    param2: u16,
    payload: &[u8],
) -> Result<Vec<u8>, EccError> {
    CommandFrame::new(opcode, param1, param2, payload).encode()
}

/// An incoming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub payload: Vec<u8>,
}

impl ResponseFrame {
    pub fn new(payload: &[u8]) -> Self {
        ResponseFrame {
            payload: payload.to_vec(),
        }
    }

    /// Value of the length field: `payload + 3`.
    pub fn length(&self) -> usize {
        self.payload.len() + RESPONSE_OVERHEAD
    }

    /// Serialize the way the device would put it on the bus.
    pub fn encode(&self) -> Result<Vec<u8>, EccError> {
        if self.payload.len() > MAX_RESPONSE_PAYLOAD {
            return Err(EccError::InvalidArgument("response payload too long"));
        }

        let mut raw = Vec::with_capacity(self.length());
        raw.push(self.length() as u8);
        raw.extend_from_slice(&self.payload);
        let crc = crc16(&raw);
        raw.extend_from_slice(&crc.to_le_bytes());
        Ok(raw)
    }
}

/// Validate a response and return its payload.
///
/// The declared length must equal `expected_payload_len + 3` and the CRC must
/// match; otherwise the payload is withheld and `FramingMismatch` returned.
pub fn decode_response(raw: &[u8], expected_payload_len: usize) -> Result<Vec<u8>, EccError> {
    let expected_length = expected_payload_len.saturating_add(RESPONSE_OVERHEAD);

    let declared = match raw.first() {
        Some(&length) => length as usize,
        None => {
            return Err(EccError::FramingMismatch("empty response".to_string()));
        }
    };

    if declared != expected_length {
        return Err(EccError::FramingMismatch(format!(
            "declared length {} but expected {}",
            declared, expected_length
        )));
    }
    if raw.len() < expected_length {
        return Err(EccError::FramingMismatch(format!(
            "response truncated to {} of {} bytes",
            raw.len(),
            expected_length
        )));
    }

    let (body, crc_bytes) = raw[..expected_length].split_at(expected_length - 2);
    verify_crc(body, crc_bytes)?;

    Ok(body[1..].to_vec())
}

fn verify_crc(covered: &[u8], crc_bytes: &[u8]) -> Result<(), EccError> {
    let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    let computed = crc16(covered);
    if received != computed {
        log::warn!(
            "CRC mismatch: received 0x{:04x}, computed 0x{:04x}",
            received,
            computed
        );
        return Err(EccError::FramingMismatch(format!(
            "CRC 0x{:04x} does not match computed 0x{:04x}",
            received, computed
        )));
    }
    Ok(())
}
