//! Raw P-256 key and signature encodings used on the wire
//!
//! The device exchanges public keys as `X || Y` (64 bytes, no SEC1 prefix)
//! and signatures as `R || S` (64 bytes). These wrappers convert to and from
//! the `p256` crate types for host-side verification.

use crate::error::EccError;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use std::fmt;

/// Uncompressed P-256 public key as `X || Y`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EccPublicKey(pub [u8; 64]);

impl EccPublicKey {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn x(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn y(&self) -> &[u8] {
        &self.0[32..]
    }

    /// SEC1 uncompressed encoding (`0x04 || X || Y`)
    pub fn to_sec1_bytes(&self) -> [u8; 65] {
        let mut sec1 = [0u8; 65];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(&self.0);
        sec1
    }

    pub fn to_p256(&self) -> Result<p256::PublicKey, EccError> {
        p256::PublicKey::from_sec1_bytes(&self.to_sec1_bytes())
            .map_err(|_| EccError::InvalidArgument("public key is not a P-256 point"))
    }

    pub fn to_verifying_key(&self) -> Result<p256::ecdsa::VerifyingKey, EccError> {
        p256::ecdsa::VerifyingKey::from_sec1_bytes(&self.to_sec1_bytes())
            .map_err(|_| EccError::InvalidArgument("public key is not a P-256 point"))
    }

    pub fn from_p256(key: &p256::PublicKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut raw = [0u8; 64];
        // Skip the 0x04 tag
        raw.copy_from_slice(&point.as_bytes()[1..]);
        EccPublicKey(raw)
    }

    /// Four-byte identifier folded out of the key: byte `i` is XORed into
    /// position `i % 4`.
    pub fn fold_id(&self) -> [u8; 4] {
        let mut id = [0u8; 4];
        for (i, byte) in self.0.iter().enumerate() {
            id[i % 4] ^= byte;
        }
        id
    }
}

impl From<[u8; 64]> for EccPublicKey {
    fn from(raw: [u8; 64]) -> Self {
        EccPublicKey(raw)
    }
}

impl TryFrom<&[u8]> for EccPublicKey {
    type Error = EccError;

    fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; 64] = raw
            .try_into()
            .map_err(|_| EccError::InvalidArgument("public key must be 64 bytes"))?;
        Ok(EccPublicKey(raw))
    }
}

impl fmt::Debug for EccPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EccPublicKey({})", hex::encode(self.0))
    }
}

/// ECDSA signature as `R || S`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EccSignature(pub [u8; 64]);

impl EccSignature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }

    pub fn to_p256(&self) -> Result<p256::ecdsa::Signature, EccError> {
        p256::ecdsa::Signature::from_slice(&self.0)
            .map_err(|_| EccError::InvalidArgument("signature scalars out of range"))
    }

    pub fn from_p256(signature: &p256::ecdsa::Signature) -> Self {
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&signature.to_bytes());
        EccSignature(raw)
    }
}

impl From<[u8; 64]> for EccSignature {
    fn from(raw: [u8; 64]) -> Self {
        EccSignature(raw)
    }
}

impl TryFrom<&[u8]> for EccSignature {
    type Error = EccError;

    fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; 64] = raw
            .try_into()
            .map_err(|_| EccError::InvalidArgument("signature must be 64 bytes"))?;
        Ok(EccSignature(raw))
    }
}

impl fmt::Debug for EccSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EccSignature({})", hex::encode(self.0))
    }
}
