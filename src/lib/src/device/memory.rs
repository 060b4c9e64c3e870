use super::{into_array, Eccx08};
use crate::bus::I2cBus;
use crate::catalog::{CounterId, KeySlot, LockZone, Operation, TransferSize, Zone};
use crate::delay::Delay;
use crate::error::EccError;

/// Size of the configuration zone.
pub const CONFIG_ZONE_SIZE: usize = 128;

/// Word address holding the lock bytes.
const LOCK_WORD: u16 = 0x15;

/// Byte offset of the first writable configuration word.
const CONFIG_WRITABLE_START: usize = 16;

/// Byte offset of the configuration word that can't be written directly.
const CONFIG_UNWRITABLE_WORD: usize = 84;

/// Split `len` bytes of slot data into 32-byte transfers while at least 32
/// bytes remain, then 4-byte transfers.
fn slot_transfers(len: usize) -> impl Iterator<Item = (usize, TransferSize)> {
    let mut offset = 0;
    std::iter::from_fn(move || {
        if offset >= len {
            return None;
        }
        let size = if len - offset >= 32 {
            TransferSize::Block
        } else {
            TransferSize::Word
        };
        let transfer = (offset, size);
        offset += size.byte_len();
        Some(transfer)
    })
}

fn check_slot_len(slot: KeySlot, len: usize) -> Result<(), EccError> {
    slot.validate()?;
    if len % 4 != 0 {
        return Err(EccError::InvalidArgument("slot data length must be a multiple of 4"));
    }
    Ok(())
}

impl<B: I2cBus, D: Delay> Eccx08<B, D> {
    /// Read exactly 4 or 32 bytes from `zone` at word `address`.
    pub fn read(&mut self, zone: Zone, address: u16, len: usize) -> Result<Vec<u8>, EccError> {
        let size = TransferSize::from_len(len)?;
        self.execute(Operation::Read { zone, address, size }, &[])
    }

    /// Write exactly 4 or 32 bytes to `zone` at word `address`.
    pub fn write(&mut self, zone: Zone, address: u16, data: &[u8]) -> Result<(), EccError> {
        let size = TransferSize::from_len(data.len())?;
        self.execute_status(Operation::Write { zone, address, size }, data)
    }

    /// Read `len` bytes (a multiple of 4) from the start of a data slot.
    pub fn read_slot(&mut self, slot: KeySlot, len: usize) -> Result<Vec<u8>, EccError> {
        check_slot_len(slot, len)?;

        let mut data = Vec::with_capacity(len);
        for (offset, size) in slot_transfers(len) {
            let chunk = self.read(Zone::Data, slot.address(offset), size.byte_len())?;
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    /// Write `data` (a multiple of 4 bytes) to the start of a data slot.
    pub fn write_slot(&mut self, slot: KeySlot, data: &[u8]) -> Result<(), EccError> {
        check_slot_len(slot, data.len())?;

        for (offset, size) in slot_transfers(data.len()) {
            let chunk = &data[offset..offset + size.byte_len()];
            self.write(Zone::Data, slot.address(offset), chunk)?;
        }
        Ok(())
    }

    /// The 12-byte device serial number.
    pub fn serial_number(&mut self) -> Result<[u8; 12], EccError> {
        let mut serial = [0u8; 12];
        for (index, address) in [0u16, 2, 3].into_iter().enumerate() {
            let word = self.read(Zone::Config, address, 4)?;
            serial[index * 4..index * 4 + 4].copy_from_slice(&word);
        }
        Ok(serial)
    }

    /// Upper-case hex of the nine significant serial number bytes.
    pub fn serial_number_hex(&mut self) -> Result<String, EccError> {
        let serial = self.serial_number()?;
        Ok(hex::encode_upper(&serial[..9]))
    }

    pub fn read_configuration(&mut self) -> Result<[u8; CONFIG_ZONE_SIZE], EccError> {
        let mut config = [0u8; CONFIG_ZONE_SIZE];
        for offset in (0..CONFIG_ZONE_SIZE).step_by(32) {
            let block = self.read(Zone::Config, (offset / 4) as u16, 32)?;
            config[offset..offset + 32].copy_from_slice(&block);
        }
        Ok(config)
    }

    /// Write the writable part of the configuration zone word by word.
    ///
    /// The first 16 bytes (serial number and revision) and the word at
    /// offset 84 are skipped.
    pub fn write_configuration(&mut self, config: &[u8; CONFIG_ZONE_SIZE]) -> Result<(), EccError> {
        for offset in (CONFIG_WRITABLE_START..CONFIG_ZONE_SIZE).step_by(4) {
            if offset == CONFIG_UNWRITABLE_WORD {
                continue;
            }
            self.write(Zone::Config, (offset / 4) as u16, &config[offset..offset + 4])?;
        }
        Ok(())
    }

    /// Whether both the configuration and data zones are locked.
    pub fn locked(&mut self) -> Result<bool, EccError> {
        let word = self.read(Zone::Config, LOCK_WORD, 4)?;
        Ok(word[2] == 0x00 && word[3] == 0x00)
    }

    /// Lock the configuration zone, then the data and OTP zones.
    ///
    /// This cannot be undone.
    pub fn lock(&mut self) -> Result<(), EccError> {
        self.lock_zone(LockZone::Config)?;
        self.lock_zone(LockZone::Data)
    }

    pub fn lock_zone(&mut self, zone: LockZone) -> Result<(), EccError> {
        log::info!("Locking {:?} zone", zone);
        self.execute_status(Operation::Lock { zone }, &[])
    }

    /// Current value of a monotonic counter (little-endian).
    pub fn read_counter(&mut self, counter: CounterId) -> Result<[u8; 4], EccError> {
        let response = self.execute(Operation::CounterRead { counter }, &[])?;
        into_array(response)
    }

    /// Increment a monotonic counter and return the new value (little-endian).
    pub fn increment_counter(&mut self, counter: CounterId) -> Result<[u8; 4], EccError> {
        let response = self.execute(Operation::CounterIncrement { counter }, &[])?;
        into_array(response)
    }
}
