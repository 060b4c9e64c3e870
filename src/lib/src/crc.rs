//! CRC-16 as computed by the ECCX08 family.
//!
//! The device uses polynomial `0x8005` with a zero seed, consuming each byte
//! least-significant bit first. Every command and response frame carries this
//! checksum little-endian in its last two bytes.

const POLYNOMIAL: u16 = 0x8005;

/// Compute the device CRC over `data`. Empty input yields 0.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for &byte in data {
        for bit in 0..8 {
            let data_bit = (byte >> bit) & 1 == 1;
            let crc_bit = crc & 0x8000 != 0;

            crc <<= 1;

            if data_bit != crc_bit {
                crc ^= POLYNOMIAL;
            }
        }
    }

    crc
}
