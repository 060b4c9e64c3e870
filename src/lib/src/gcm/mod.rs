//! AES-128-GCM on top of a device block primitive
//!
//! The secure element only offers single-block AES encryption and a
//! GF(2^128) multiply, both keyed by whatever sits in its working register.
//! This module builds the NIST SP 800-38D construction out of those two
//! calls:
//!
//! ```text
//! H       = E(0^128)
//! J0      = IV || 0x00000001
//! C       = GCTR(inc32(J0), P)
//! S       = GHASH_H(A || pad || C || pad || [len(A)]64 || [len(C)]64)
//! T       = GCTR(J0, S)
//! ```
//!
//! IVs are never supplied by the caller; see [`generate_iv`].

mod ctr;
mod ghash;
mod iv;


pub use ctr::{gctr, increment_block};
pub use ghash::{ghash, ghash_input};
pub use iv::{generate_iv, IV_KEY_SLOT};

use crate::catalog::{CounterId, KeySlot};
use crate::error::EccError;
use crate::keys::EccPublicKey;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const BLOCK_SIZE: usize = 16;
pub const IV_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Upper bound (exclusive) on associated data and text lengths, in bytes.
pub const MAX_INPUT_LEN: u64 = 1 << 36;

pub type Block = [u8; BLOCK_SIZE];
pub type Iv = [u8; IV_SIZE];
pub type Tag = [u8; TAG_SIZE];

/// Primitives a device has to provide for AES-GCM.
///
/// Block operations are keyed by the device's working register, which the
/// caller loads beforehand (for example with a nonce pass-through).
pub trait GcmBackend {
    /// Encrypt one block in place with AES-128
    fn encrypt_block(&mut self, block: &mut Block) -> Result<(), EccError>;

    /// Replace `block` with `h • block` in GF(2^128)
    fn gf_multiply(&mut self, h: &Block, block: &mut Block) -> Result<(), EccError>;

    /// Public key of a device-held private key
    fn public_key(&mut self, slot: KeySlot) -> Result<EccPublicKey, EccError>;

    /// Increment a monotonic counter, returning the new value (little-endian)
    fn increment_counter(&mut self, counter: CounterId) -> Result<[u8; 4], EccError>;

    /// Read a monotonic counter (little-endian)
    fn read_counter(&mut self, counter: CounterId) -> Result<[u8; 4], EccError>;
}

/// Output of [`encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: Iv,
    pub ciphertext: Vec<u8>,
    pub tag: Tag,
}

/// Per-message state, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct GcmContext {
    h: Block,
    j0: Block,
    counter_block: Block,
}

impl GcmContext {
    fn new(h: &Block, iv: &Iv) -> Result<Self, EccError> {
        let mut j0 = [0u8; BLOCK_SIZE];
        j0[..IV_SIZE].copy_from_slice(iv);
        j0[BLOCK_SIZE - 1] = 1;

        let mut counter_block = j0;
        increment_block(&mut counter_block)?;

        Ok(GcmContext {
            h: *h,
            j0,
            counter_block,
        })
    }

    fn tag<G: GcmBackend + ?Sized>(
        &self,
        backend: &mut G,
        ad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Tag, EccError> {
        let mut s = Zeroizing::new(ghash(backend, &self.h, &ghash_input(ad, ciphertext))?);
        let mut j0 = self.j0;
        gctr(backend, &mut j0, &mut s[..])?;
        Ok(*s)
    }
}

/// Reject associated data or text of [`MAX_INPUT_LEN`] bytes or more.
fn check_lengths(ad_len: usize, text_len: usize) -> Result<(), EccError> {
    if ad_len as u64 >= MAX_INPUT_LEN {
        return Err(EccError::InvalidArgument("associated data too long"));
    }
    if text_len as u64 >= MAX_INPUT_LEN {
        return Err(EccError::InvalidArgument("text too long"));
    }
    Ok(())
}

/// H = E(0^128) under the key in the working register
fn hash_subkey<G: GcmBackend + ?Sized>(backend: &mut G) -> Result<Zeroizing<Block>, EccError> {
    let mut h = Zeroizing::new([0u8; BLOCK_SIZE]);
    backend.encrypt_block(&mut h)?;
    Ok(h)
}

/// Encrypt and authenticate `plaintext` under a freshly generated IV.
pub fn encrypt<G: GcmBackend + ?Sized>(
    backend: &mut G,
    ad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, EccError> {
    check_lengths(ad.len(), plaintext.len())?;

    let h = hash_subkey(backend)?;
    let iv = generate_iv(backend)?;
    let mut context = GcmContext::new(&h, &iv)?;

    let mut ciphertext = Zeroizing::new(plaintext.to_vec());
    gctr(backend, &mut context.counter_block, &mut ciphertext)?;
    let tag = context.tag(backend, ad, &ciphertext)?;

    log::debug!(
        "Sealed {} bytes with {} bytes of associated data",
        plaintext.len(),
        ad.len()
    );

    Ok(Sealed {
        iv,
        ciphertext: std::mem::take(&mut *ciphertext),
        tag,
    })
}

/// Verify `tag` and decrypt `ciphertext`.
///
/// The tag is checked in constant time before any plaintext is produced;
/// on mismatch nothing is decrypted.
pub fn decrypt<G: GcmBackend + ?Sized>(
    backend: &mut G,
    iv: &Iv,
    ad: &[u8],
    ciphertext: &[u8],
    tag: &Tag,
) -> Result<Vec<u8>, EccError> {
    check_lengths(ad.len(), ciphertext.len())?;

    let h = hash_subkey(backend)?;
    let mut context = GcmContext::new(&h, iv)?;
    let expected = Zeroizing::new(context.tag(backend, ad, ciphertext)?);

    if !bool::from(expected[..].ct_eq(&tag[..])) {
        log::warn!("Rejected ciphertext of {} bytes: tag mismatch", ciphertext.len());
        return Err(EccError::AuthenticationFailure);
    }

    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    gctr(backend, &mut context.counter_block, &mut plaintext)?;
    Ok(std::mem::take(&mut *plaintext))
}
