use super::{Block, GcmBackend, BLOCK_SIZE};
use crate::error::EccError;

/// GHASH over whole blocks with every multiplication done by the backend.
///
/// Empty input hashes to the zero block.
pub fn ghash<G: GcmBackend + ?Sized>(
    backend: &mut G,
    h: &Block,
    input: &[u8],
) -> Result<Block, EccError> {
    if input.len() % BLOCK_SIZE != 0 {
        return Err(EccError::InvalidArgument(
            "GHASH input must be a multiple of 16 bytes",
        ));
    }

    let mut y = [0u8; BLOCK_SIZE];
    for block in input.chunks_exact(BLOCK_SIZE) {
        for (acc, byte) in y.iter_mut().zip(block) {
            *acc ^= byte;
        }
        backend.gf_multiply(h, &mut y)?;
    }
    Ok(y)
}

/// `A || 0^u || C || 0^v || [len(A)]64 || [len(C)]64`, lengths in bits.
pub fn ghash_input(ad: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let padded = |len: usize| len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

    let mut input = Vec::with_capacity(padded(ad.len()) + padded(ciphertext.len()) + BLOCK_SIZE);
    input.extend_from_slice(ad);
    input.resize(padded(ad.len()), 0);
    input.extend_from_slice(ciphertext);
    input.resize(padded(ad.len()) + padded(ciphertext.len()), 0);
    input.extend_from_slice(&(ad.len() as u64 * 8).to_be_bytes());
    input.extend_from_slice(&(ciphertext.len() as u64 * 8).to_be_bytes());
    input
}
