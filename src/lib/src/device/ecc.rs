use super::{into_array, Eccx08};
use crate::bus::I2cBus;
use crate::catalog::{EcdhMode, KeySlot, Operation};
use crate::delay::Delay;
use crate::dispatch::expect_status;
use crate::error::EccError;
use crate::keys::{EccPublicKey, EccSignature};
use zeroize::Zeroizing;

impl<B: I2cBus, D: Delay> Eccx08<B, D> {
    /// Generate a new private key in `slot` and return its public key.
    pub fn generate_private_key(&mut self, slot: KeySlot) -> Result<EccPublicKey, EccError> {
        slot.validate()?;
        let response = self.execute(Operation::GenPrivateKey { slot }, &[])?;
        Ok(EccPublicKey(into_array(response)?))
    }

    /// Public key of the private key already stored in `slot`.
    pub fn generate_public_key(&mut self, slot: KeySlot) -> Result<EccPublicKey, EccError> {
        slot.validate()?;
        let response = self.execute(Operation::GenPublicKey { slot }, &[])?;
        Ok(EccPublicKey(into_array(response)?))
    }

    /// Load 32 bytes of external data into the working register.
    pub fn challenge(&mut self, message: &[u8; 32]) -> Result<(), EccError> {
        self.execute_status(Operation::Nonce, message)
    }

    /// Pass-through nonce; loads an AES key (first 16 bytes) before block
    /// operations.
    pub fn nonce(&mut self, data: &[u8; 32]) -> Result<(), EccError> {
        self.challenge(data)
    }

    /// Sign the working register with the key in `slot`.
    pub fn sign(&mut self, slot: KeySlot) -> Result<EccSignature, EccError> {
        slot.validate()?;
        let response = self.execute(Operation::Sign { slot }, &[])?;
        Ok(EccSignature(into_array(response)?))
    }

    /// Verify `signature` over the working register against an external key.
    pub fn verify(
        &mut self,
        signature: &EccSignature,
        public_key: &EccPublicKey,
    ) -> Result<(), EccError> {
        self.execute_status(Operation::Verify, &verify_payload(signature, public_key))
    }

    /// Sign a 32-byte digest with the key in `slot`.
    ///
    /// Random, challenge and sign run back-to-back in one wake/idle bracket
    /// so nothing can overwrite the working register in between.
    pub fn ec_sign(&mut self, slot: KeySlot, message: &[u8; 32]) -> Result<EccSignature, EccError> {
        slot.validate()?;

        let random = Operation::Random.params();
        let challenge = Operation::Nonce.params();
        let sign = Operation::Sign { slot }.params();

        self.dispatcher.bracket(|dispatcher| {
            // The datasheet requires the RNG to run before a pass-through sign.
            let _discard = Zeroizing::new(dispatcher.transact(&random, &[])?);

            expect_status(&dispatcher.transact(&challenge, message)?)?;
            let response = dispatcher.transact(&sign, &[])?;
            Ok(EccSignature(into_array(response)?))
        })
    }

    /// Verify `signature` over a 32-byte digest.
    ///
    /// Challenge and verify share one wake/idle bracket.
    pub fn ecdsa_verify(
        &mut self,
        message: &[u8; 32],
        signature: &EccSignature,
        public_key: &EccPublicKey,
    ) -> Result<(), EccError> {
        let challenge = Operation::Nonce.params();
        let verify = Operation::Verify.params();
        let payload = verify_payload(signature, public_key);

        self.dispatcher.bracket(|dispatcher| {
            expect_status(&dispatcher.transact(&challenge, message)?)?;
            expect_status(&dispatcher.transact(&verify, &payload)?)
        })
    }

    /// ECDH between the key in `slot` and `peer`, returning the shared secret.
    pub fn ecdh_output(
        &mut self,
        slot: KeySlot,
        peer: &EccPublicKey,
    ) -> Result<Zeroizing<[u8; 32]>, EccError> {
        let response = Zeroizing::new(self.ecdh(slot, EcdhMode::Output, peer)?);
        let mut secret = Zeroizing::new([0u8; 32]);
        if response.len() != secret.len() {
            return Err(EccError::FramingMismatch(format!(
                "expected 32 byte shared secret, got {}",
                response.len()
            )));
        }
        secret.copy_from_slice(&response);
        Ok(secret)
    }

    /// ECDH between the key in `slot` and `peer`, leaving the shared secret
    /// in the working register.
    pub fn ecdh_tempkey(&mut self, slot: KeySlot, peer: &EccPublicKey) -> Result<(), EccError> {
        let response = self.ecdh(slot, EcdhMode::TempKey, peer)?;
        expect_status(&response)
    }

    fn ecdh(
        &mut self,
        slot: KeySlot,
        mode: EcdhMode,
        peer: &EccPublicKey,
    ) -> Result<Vec<u8>, EccError> {
        slot.validate()?;
        self.execute(Operation::Ecdh { slot, mode }, peer.as_bytes())
    }
}

/// Signature followed by the external public key.
fn verify_payload(signature: &EccSignature, public_key: &EccPublicKey) -> [u8; 128] {
    let mut payload = [0u8; 128];
    payload[..64].copy_from_slice(signature.as_bytes());
    payload[64..].copy_from_slice(public_key.as_bytes());
    payload
}
