use super::Eccx08;
use crate::bus::I2cBus;
use crate::catalog::{CounterId, KeySlot, Operation};
use crate::delay::Delay;
use crate::error::EccError;
use crate::gcm::{self, Block, GcmBackend, Iv, Sealed, Tag};
use crate::keys::EccPublicKey;
use zeroize::Zeroizing;

impl<B: I2cBus, D: Delay> Eccx08<B, D> {
    /// Encrypt one block in place with the AES key held in the working
    /// register.
    pub fn aes_encrypt_block(&mut self, block: &mut Block) -> Result<(), EccError> {
        let response = Zeroizing::new(self.execute(Operation::AesEncrypt, block)?);
        copy_block(&response, block)
    }

    /// Replace `block` with `h • block` in GF(2^128).
    pub fn aes_gf_multiply(&mut self, h: &Block, block: &mut Block) -> Result<(), EccError> {
        let mut payload = Zeroizing::new([0u8; 32]);
        payload[..16].copy_from_slice(h);
        payload[16..].copy_from_slice(block);

        let response = Zeroizing::new(self.execute(Operation::AesGfm, &payload[..])?);
        copy_block(&response, block)
    }

    /// AES-GCM encrypt under the key in the working register.
    ///
    /// Load the key first with [`nonce`](Eccx08::nonce). The IV is derived
    /// from the device identity and its monotonic counters.
    pub fn aes_gcm_encrypt(&mut self, ad: &[u8], plaintext: &[u8]) -> Result<Sealed, EccError> {
        gcm::encrypt(self, ad, plaintext)
    }

    /// AES-GCM decrypt under the key in the working register.
    pub fn aes_gcm_decrypt(
        &mut self,
        iv: &Iv,
        ad: &[u8],
        ciphertext: &[u8],
        tag: &Tag,
    ) -> Result<Vec<u8>, EccError> {
        gcm::decrypt(self, iv, ad, ciphertext, tag)
    }

    /// A fresh 96-bit IV; advances counter 0.
    pub fn generate_iv(&mut self) -> Result<Iv, EccError> {
        gcm::generate_iv(self)
    }
}

fn copy_block(response: &[u8], block: &mut Block) -> Result<(), EccError> {
    if response.len() != block.len() {
        return Err(EccError::FramingMismatch(format!(
            "expected 16 byte block, got {}",
            response.len()
        )));
    }
    block.copy_from_slice(response);
    Ok(())
}

impl<B: I2cBus, D: Delay> GcmBackend for Eccx08<B, D> {
    fn encrypt_block(&mut self, block: &mut Block) -> Result<(), EccError> {
        self.aes_encrypt_block(block)
    }

    fn gf_multiply(&mut self, h: &Block, block: &mut Block) -> Result<(), EccError> {
        self.aes_gf_multiply(h, block)
    }

    fn public_key(&mut self, slot: KeySlot) -> Result<EccPublicKey, EccError> {
        self.generate_public_key(slot)
    }

    fn increment_counter(&mut self, counter: CounterId) -> Result<[u8; 4], EccError> {
        Eccx08::increment_counter(self, counter)
    }

    fn read_counter(&mut self, counter: CounterId) -> Result<[u8; 4], EccError> {
        Eccx08::read_counter(self, counter)
    }
}
