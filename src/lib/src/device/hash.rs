use super::{into_array, DeviceModel, Eccx08};
use crate::bus::I2cBus;
use crate::catalog::{KeySlot, Operation};
use crate::delay::Delay;
use crate::dispatch::expect_status;
use crate::error::EccError;
use std::io::{self, Write};

/// Bytes consumed by one SHA update command.
pub const SHA_BLOCK_SIZE: usize = 64;

impl<B: I2cBus, D: Delay> Eccx08<B, D> {
    /// Start a SHA-256 computation on the device.
    pub fn begin_sha256(&mut self) -> Result<(), EccError> {
        self.execute_status(Operation::ShaBegin, &[])
    }

    /// Absorb exactly one 64-byte block.
    pub fn update_sha256(&mut self, block: &[u8; SHA_BLOCK_SIZE]) -> Result<(), EccError> {
        self.execute_status(
            Operation::ShaUpdate {
                len: SHA_BLOCK_SIZE as u16,
            },
            block,
        )
    }

    /// Finish the computation and return the digest.
    pub fn end_sha256(&mut self) -> Result<[u8; 32], EccError> {
        self.end_sha256_with(&[])
    }

    /// Finish the computation with a trailing partial block of 0-63 bytes.
    pub fn end_sha256_with(&mut self, data: &[u8]) -> Result<[u8; 32], EccError> {
        self.sha_end(data)
    }

    /// SHA-256 of `data`, computed on the device.
    pub fn sha256(&mut self, data: &[u8]) -> Result<[u8; 32], EccError> {
        let mut stream = Sha256Stream::new(self)?;
        stream.update(data)?;
        stream.finalize()
    }

    /// Start an HMAC-SHA256 keyed by `slot`. ECC608 only.
    pub fn begin_hmac(&mut self, slot: KeySlot) -> Result<(), EccError> {
        slot.validate()?;

        let revision = self.version()?;
        if DeviceModel::from_revision(revision)? != DeviceModel::Ecc608 {
            log::warn!("HMAC requested on a device without HMAC support");
            return Err(EccError::UnsupportedDevice(revision));
        }

        self.execute_status(Operation::HmacBegin { slot }, &[])
    }

    /// Absorb any amount of message data in one bracket.
    ///
    /// Data is sent in chunks of up to 64 bytes; every chunk's status is
    /// checked. Empty input is accepted and sends nothing.
    pub fn update_hmac(&mut self, data: &[u8]) -> Result<(), EccError> {
        if data.is_empty() {
            return Ok(());
        }

        self.dispatcher.bracket(|dispatcher| {
            for chunk in data.chunks(SHA_BLOCK_SIZE) {
                let params = Operation::ShaUpdate {
                    len: chunk.len() as u16,
                }
                .params();
                let response = dispatcher.transact(&params, chunk)?;
                expect_status(&response)?;
            }
            Ok(())
        })
    }

    /// Finish the HMAC and return the MAC.
    pub fn end_hmac(&mut self) -> Result<[u8; 32], EccError> {
        self.end_hmac_with(&[])
    }

    /// Finish the HMAC with trailing message bytes (0-63).
    pub fn end_hmac_with(&mut self, data: &[u8]) -> Result<[u8; 32], EccError> {
        self.sha_end(data)
    }

    fn sha_end(&mut self, data: &[u8]) -> Result<[u8; 32], EccError> {
        if data.len() >= SHA_BLOCK_SIZE {
            return Err(EccError::InvalidArgument("final block must be under 64 bytes"));
        }
        let response = self.execute(
            Operation::ShaEnd {
                len: data.len() as u16,
            },
            data,
        )?;
        into_array(response)
    }
}

/// Streaming SHA-256 over the device
///
/// Buffers arbitrary writes into 64-byte update commands and sends the
/// remainder with the final command.
///
/// ```ignore
/// use std::io::Write;
///
/// let mut stream = Sha256Stream::new(&mut ecc)?;
/// std::io::copy(&mut file, &mut stream)?;
/// let digest = stream.finalize()?;
/// ```
pub struct Sha256Stream<'a, B: I2cBus, D: Delay> {
    device: &'a mut Eccx08<B, D>,
    buffer: Vec<u8>,
}

impl<'a, B: I2cBus, D: Delay> Sha256Stream<'a, B, D> {
    pub fn new(device: &'a mut Eccx08<B, D>) -> Result<Self, EccError> {
        device.begin_sha256()?;
        Ok(Sha256Stream {
            device,
            buffer: Vec::with_capacity(SHA_BLOCK_SIZE),
        })
    }

    pub fn update(&mut self, mut data: &[u8]) -> Result<(), EccError> {
        while !data.is_empty() {
            let take = (SHA_BLOCK_SIZE - self.buffer.len()).min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.buffer.len() == SHA_BLOCK_SIZE {
                let mut block = [0u8; SHA_BLOCK_SIZE];
                block.copy_from_slice(&self.buffer);
                self.device.update_sha256(&block)?;
                self.buffer.clear();
            }
        }
        Ok(())
    }

    pub fn finalize(self) -> Result<[u8; 32], EccError> {
        self.device.end_sha256_with(&self.buffer)
    }
}

impl<B: I2cBus, D: Delay> Write for Sha256Stream<'_, B, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
