//! Host-side driver for Microchip ECC508/ECC608 secure elements.

// Talks to the chip over a two-wire bus: framing with CRC, wake/idle/sleep handling,
// response polling and the fixed command catalog. AES-GCM is assembled on the host out of
// the chip's single-block AES and GF(2^128) multiply, so keys never leave the device.

#![forbid(unsafe_code)]

mod error;

/// CRC-16 used by every frame
pub mod crc;

/// Command and response frame encoding and validation
pub mod frame;

/// I2C bus abstraction
///
/// The only hardware seam of the driver. Implement it for a platform bus, or
/// enable the `embedded-hal` feature for a ready-made adapter.
pub mod bus;

/// Blocking waits
pub mod delay;

/// Address, bus clock and timing configuration
pub mod config;

/// Power state machine (asleep, idle, awake) and the wake sequence
pub mod power;

/// Command dispatcher
///
/// Runs every command through wake, transmit, execution wait, response polling
/// and idle. The single choke point for bus traffic.
pub mod dispatch;

/// Operation catalog: opcodes, parameters, response lengths and execution times
pub mod catalog;

/// Raw P-256 public keys and signatures with `p256` conversions
pub mod keys;

/// AES-GCM on top of device block primitives
pub mod gcm;

/// The device handle
pub mod device;

/// Shared device handle for multi-threaded use
pub mod shared;

pub use catalog::{CounterId, EcdhMode, KeySlot, LockZone, Zone};
pub use config::DeviceConfig;
pub use device::{DeviceModel, Eccx08, Sha256Stream};
#[allow(unused_imports)]
pub use error::*;
pub use gcm::Sealed;
pub use keys::{EccPublicKey, EccSignature};
pub use shared::SharedEcc;

#[cfg(feature = "embedded-hal")]
pub use bus::HalBus;

pub mod reexports {
    pub use {hex, log, p256, subtle, thiserror, zeroize};
}
