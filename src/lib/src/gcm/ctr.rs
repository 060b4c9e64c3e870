use super::{Block, GcmBackend, BLOCK_SIZE};
use crate::error::EccError;
use zeroize::Zeroizing;

/// Increment the low 32 bits of a counter block (big-endian).
///
/// Fails once the 32-bit counter would wrap to zero.
pub fn increment_block(block: &mut Block) -> Result<(), EccError> {
    for byte in block[BLOCK_SIZE - 4..].iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            return Ok(());
        }
    }
    Err(EccError::InvalidArgument("counter block exhausted"))
}

/// XOR `data` in place with the keystream starting at `counter_block`.
///
/// The counter is advanced between blocks only, so on return it holds the
/// counter of the last block processed. A partial final block uses the
/// leading bytes of its keystream. Applying the same counter twice restores
/// the input.
pub fn gctr<G: GcmBackend + ?Sized>(
    backend: &mut G,
    counter_block: &mut Block,
    data: &mut [u8],
) -> Result<(), EccError> {
    let mut keystream = Zeroizing::new([0u8; BLOCK_SIZE]);
    let mut chunks = data.chunks_mut(BLOCK_SIZE).peekable();

    while let Some(chunk) = chunks.next() {
        keystream.copy_from_slice(&counter_block[..]);
        backend.encrypt_block(&mut keystream)?;

        for (byte, key) in chunk.iter_mut().zip(keystream.iter()) {
            *byte ^= key;
        }

        if chunks.peek().is_some() {
            increment_block(counter_block)?;
        }
    }

    Ok(())
}
