//! ECC508/ECC608 device driver
//!
//! [`Eccx08`] is the caller-owned handle for one secure element on one bus.
//! It wraps a [`Dispatcher`] and exposes the operation catalog as methods:
//!
//! - **Lifecycle**: [`begin`](Eccx08::begin), [`end`](Eccx08::end),
//!   [`version`](Eccx08::version)
//! - **Random**: hardware RNG, 32 bytes per command
//! - **ECC P-256**: key generation, sign, verify, ECDH
//! - **Hashing**: streaming SHA-256 and HMAC-SHA256 (608 only)
//! - **AES**: single-block encrypt, GF(2^128) multiply and AES-GCM on top
//! - **Memory**: slot and zone read/write, configuration, lock, counters
//!
//! Every method runs its commands inside one wake/idle bracket. Sequences
//! that depend on the working register (TempKey), such as
//! [`ec_sign`](Eccx08::ec_sign) and [`ecdsa_verify`](Eccx08::ecdsa_verify),
//! issue all of their steps inside that single bracket. The lower-level
//! [`challenge`](Eccx08::challenge), [`sign`](Eccx08::sign) and
//! [`verify`](Eccx08::verify) each take their own bracket.
//!
//! # Example
//!
//! ```ignore
//! use eccx08::{Eccx08, KeySlot};
//!
//! let mut ecc = Eccx08::new(bus);
//! let model = ecc.begin()?;
//!
//! let public_key = ecc.generate_private_key(KeySlot(0))?;
//! let signature = ecc.ec_sign(KeySlot(0), &digest)?;
//! ecc.ecdsa_verify(&digest, &signature, &public_key)?;
//! ```

mod aes;
mod ecc;
mod hash;
mod memory;

pub use hash::{Sha256Stream, SHA_BLOCK_SIZE};

use crate::bus::I2cBus;
use crate::catalog::Operation;
use crate::config::DeviceConfig;
use crate::delay::{Delay, StdDelay};
use crate::dispatch::{expect_status, Dispatcher};
use crate::error::EccError;
use zeroize::Zeroizing;

/// Revision bits that identify the device family.
const REVISION_FAMILY_MASK: u32 = 0x00F0_0000;

/// Random bytes produced by one Random command.
const RANDOM_CHUNK: usize = 32;

/// Supported device families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    Ecc508,
    Ecc608,
}

impl DeviceModel {
    /// Classify a revision word as returned by the Info command.
    pub fn from_revision(revision: u32) -> Result<Self, EccError> {
        match revision & REVISION_FAMILY_MASK {
            0x0050_0000 => Ok(DeviceModel::Ecc508),
            0x0060_0000 => Ok(DeviceModel::Ecc608),
            _ => Err(EccError::UnsupportedDevice(revision)),
        }
    }
}

pub struct Eccx08<B, D = StdDelay> {
    dispatcher: Dispatcher<B, D>,
}

impl<B: I2cBus> Eccx08<B, StdDelay> {
    /// Device at the default address with default timing
    pub fn new(bus: B) -> Self {
        Eccx08 {
            dispatcher: Dispatcher::new(bus),
        }
    }
}

impl<B: I2cBus, D: Delay> Eccx08<B, D> {
    pub fn with_config(bus: B, delay: D, config: DeviceConfig) -> Self {
        Eccx08 {
            dispatcher: Dispatcher::with_config(bus, delay, config),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<B, D> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<B, D> {
        &mut self.dispatcher
    }

    pub fn bus(&self) -> &B {
        self.dispatcher.bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.dispatcher.bus_mut()
    }

    pub fn into_parts(self) -> (B, D) {
        self.dispatcher.into_parts()
    }

    /// Check that a supported device answers and report its family.
    pub fn begin(&mut self) -> Result<DeviceModel, EccError> {
        self.dispatcher.wakeup()?;
        self.dispatcher.idle()?;

        let revision = self.version()?;
        let model = DeviceModel::from_revision(revision)?;
        log::info!(
            "Found {:?} (revision 0x{:08x}) at 0x{:02x}",
            model,
            revision,
            self.dispatcher.config().address
        );
        Ok(model)
    }

    /// Put the device to sleep. It has to be woken first or it ignores the
    /// sleep command.
    pub fn end(&mut self) -> Result<(), EccError> {
        self.dispatcher.wakeup()?;
        self.dispatcher.sleep()
    }

    /// Raw revision word (little-endian Info response)
    pub fn version(&mut self) -> Result<u32, EccError> {
        let response = self.execute(Operation::Info, &[])?;
        Ok(u32::from_le_bytes(into_array(response)?))
    }

    pub fn model(&mut self) -> Result<DeviceModel, EccError> {
        DeviceModel::from_revision(self.version()?)
    }

    /// Fill `data` from the hardware RNG.
    pub fn random(&mut self, data: &mut [u8]) -> Result<(), EccError> {
        if data.is_empty() {
            return Ok(());
        }

        let params = Operation::Random.params();
        self.dispatcher.bracket(|dispatcher| {
            for chunk in data.chunks_mut(RANDOM_CHUNK) {
                let response = Zeroizing::new(dispatcher.transact(&params, &[])?);
                chunk.copy_from_slice(&response[..chunk.len()]);
            }
            Ok(())
        })
    }

    /// Random value in `[min, max)`, or `min` when the range is empty.
    pub fn random_range(&mut self, min: i64, max: i64) -> Result<i64, EccError> {
        if min >= max {
            return Ok(min);
        }

        let mut raw = Zeroizing::new([0u8; 8]);
        self.random(&mut raw[..])?;

        let span = (max as i128 - min as i128) as u128;
        let offset = i64::from_le_bytes(*raw).unsigned_abs() as u128 % span;
        Ok((min as i128 + offset as i128) as i64)
    }

    /// Random value in `[0, max)`, or 0 when `max <= 0`.
    pub fn random_below(&mut self, max: i64) -> Result<i64, EccError> {
        self.random_range(0, max)
    }

    fn execute(&mut self, operation: Operation, payload: &[u8]) -> Result<Vec<u8>, EccError> {
        self.dispatcher.execute(&operation.params(), payload)
    }

    /// Execute an operation whose response is a single status byte.
    fn execute_status(&mut self, operation: Operation, payload: &[u8]) -> Result<(), EccError> {
        let response = self.execute(operation, payload)?;
        expect_status(&response)
    }
}

fn into_array<const N: usize>(response: Vec<u8>) -> Result<[u8; N], EccError> {
    let len = response.len();
    response.try_into().map_err(|_| {
        EccError::FramingMismatch(format!("expected {} byte payload, got {}", N, len))
    })
}
