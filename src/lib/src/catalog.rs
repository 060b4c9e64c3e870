//! Crypto operation catalog
//!
//! Every device operation maps to a fixed opcode, parameter pair, response
//! length and datasheet execution time. [`Operation::params`] is the single
//! table the rest of the driver reads from.

use crate::error::EccError;
use std::time::Duration;

/// Instruction opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Read = 0x02,
    Write = 0x12,
    Nonce = 0x16,
    Lock = 0x17,
    Random = 0x1B,
    Counter = 0x24,
    Info = 0x30,
    GenKey = 0x40,
    Sign = 0x41,
    Ecdh = 0x43,
    Verify = 0x45,
    Sha = 0x47,
    Aes = 0x51,
}

/// Key slot identifier (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySlot(pub u8);

impl KeySlot {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 15;

    /// Validate slot number
    pub fn validate(&self) -> Result<(), EccError> {
        if self.0 > Self::MAX {
            return Err(EccError::InvalidArgument("key slot must be 0-15"));
        }
        Ok(())
    }

    /// Word address of `offset` bytes into this slot's data zone storage.
    ///
    /// Data zone addresses are `slot << 3 | block << 8 | word` with 32-byte
    /// blocks and 4-byte words.
    pub fn address(&self, offset: usize) -> u16 {
        let block = (offset / 32) as u16;
        let word = ((offset % 32) / 4) as u16;
        ((self.0 as u16) << 3) | (block << 8) | word
    }
}

/// Monotonic counters
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterId {
    Zero = 0,
    One = 1,
}

/// ECDH result destination
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdhMode {
    /// Shared secret goes to the working register; only a status is returned
    TempKey = 0x08,
    /// Shared secret is returned in clear
    Output = 0x0C,
}

/// Memory zones
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Config = 0,
    Otp = 1,
    Data = 2,
}

/// Zones that can be locked
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockZone {
    Config = 0,
    /// Data and OTP zones together
    Data = 1,
}

/// Read and write transfer sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSize {
    Word,
    Block,
}

impl TransferSize {
    pub fn from_len(len: usize) -> Result<Self, EccError> {
        match len {
            4 => Ok(TransferSize::Word),
            32 => Ok(TransferSize::Block),
            _ => Err(EccError::InvalidArgument("transfers are 4 or 32 bytes")),
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            TransferSize::Word => 4,
            TransferSize::Block => 32,
        }
    }

    /// Zone byte with the 32-byte flag applied
    fn zone_param(&self, zone: Zone) -> u8 {
        match self {
            TransferSize::Word => zone as u8,
            TransferSize::Block => zone as u8 | 0x80,
        }
    }
}

/// Fully resolved command parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandParams {
    pub opcode: Opcode,
    pub param1: u8,
    pub param2: u16,
    /// Payload bytes expected in the response frame
    pub response_len: usize,
    /// Datasheet maximum execution time
    pub exec_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Info,
    Random,
    GenPrivateKey { slot: KeySlot },
    GenPublicKey { slot: KeySlot },
    /// Load a 32-byte value into the working register (pass-through)
    Nonce,
    /// Sign the working register with a private key
    Sign { slot: KeySlot },
    /// Verify a signature over the working register against a supplied key
    Verify,
    Ecdh { slot: KeySlot, mode: EcdhMode },
    ShaBegin,
    HmacBegin { slot: KeySlot },
    ShaUpdate { len: u16 },
    ShaEnd { len: u16 },
    AesEncrypt,
    AesGfm,
    CounterRead { counter: CounterId },
    CounterIncrement { counter: CounterId },
    Read { zone: Zone, address: u16, size: TransferSize },
    Write { zone: Zone, address: u16, size: TransferSize },
    Lock { zone: LockZone },
}

impl Operation {
    pub fn params(&self) -> CommandParams {
        let (opcode, param1, param2, response_len, exec_ms) = match *self {
            Operation::Info => (Opcode::Info, 0x00, 0x0000, 4, 2),
            Operation::Random => (Opcode::Random, 0x00, 0x0000, 32, 23),
            Operation::GenPrivateKey { slot } => (Opcode::GenKey, 0x04, slot.0 as u16, 64, 115),
            Operation::GenPublicKey { slot } => (Opcode::GenKey, 0x00, slot.0 as u16, 64, 115),
            Operation::Nonce => (Opcode::Nonce, 0x03, 0x0000, 1, 29),
            Operation::Sign { slot } => (Opcode::Sign, 0x80, slot.0 as u16, 64, 70),
            // External public key, P-256
            Operation::Verify => (Opcode::Verify, 0x02, 0x0004, 1, 72),
            Operation::Ecdh { slot, mode } => {
                let response_len = match mode {
                    EcdhMode::Output => 32,
                    EcdhMode::TempKey => 1,
                };
                (Opcode::Ecdh, mode as u8, slot.0 as u16, response_len, 55)
            }
            Operation::ShaBegin => (Opcode::Sha, 0x00, 0x0000, 1, 9),
            Operation::HmacBegin { slot } => (Opcode::Sha, 0x04, slot.0 as u16, 1, 9),
            Operation::ShaUpdate { len } => (Opcode::Sha, 0x01, len, 1, 9),
            Operation::ShaEnd { len } => (Opcode::Sha, 0x02, len, 32, 9),
            // Key from the working register
            Operation::AesEncrypt => (Opcode::Aes, 0x00, 0xFFFF, 16, 9),
            Operation::AesGfm => (Opcode::Aes, 0x03, 0xFFFF, 16, 9),
            Operation::CounterRead { counter } => (Opcode::Counter, 0x00, counter as u16, 4, 9),
            Operation::CounterIncrement { counter } => {
                (Opcode::Counter, 0x01, counter as u16, 4, 9)
            }
            Operation::Read { zone, address, size } => {
                (Opcode::Read, size.zone_param(zone), address, size.byte_len(), 5)
            }
            Operation::Write { zone, address, size } => {
                (Opcode::Write, size.zone_param(zone), address, 1, 26)
            }
            Operation::Lock { zone } => (Opcode::Lock, 0x80 | zone as u8, 0x0000, 1, 32),
        };

        CommandParams {
            opcode,
            param1,
            param2,
            response_len,
            exec_time: Duration::from_millis(exec_ms),
        }
    }
}
