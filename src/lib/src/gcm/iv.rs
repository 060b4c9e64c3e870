use super::{GcmBackend, Iv};
use crate::catalog::{CounterId, KeySlot};
use crate::error::EccError;

/// Slot whose public key identifies the device inside every IV.
pub const IV_KEY_SLOT: KeySlot = KeySlot(0);

/// Build a 96-bit IV that never repeats for the lifetime of the device.
///
/// ```text
/// [device id (4)][invocation counter, BE (4)][epoch counter, BE (4)]
/// ```
///
/// The device id folds the slot 0 public key, the invocation field is
/// monotonic counter 0 after incrementing it and the epoch field is counter
/// 1 as read.
pub fn generate_iv<G: GcmBackend + ?Sized>(backend: &mut G) -> Result<Iv, EccError> {
    let device_id = backend.public_key(IV_KEY_SLOT)?.fold_id();

    let mut invocation = backend.increment_counter(CounterId::Zero)?;
    invocation.reverse();

    let mut epoch = backend.read_counter(CounterId::One)?;
    epoch.reverse();

    let mut iv = [0u8; 12];
    iv[..4].copy_from_slice(&device_id);
    iv[4..8].copy_from_slice(&invocation);
    iv[8..].copy_from_slice(&epoch);

    log::trace!("Generated IV {}", hex::encode(iv));
    Ok(iv)
}
