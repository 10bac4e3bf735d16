//! ECDSA over P-256 with SHA-256 message hashing.
//!
//! Nonces are derived deterministically (RFC 6979), so signing needs no
//! entropy and the same key and message always produce the same signature.

use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as P256Signature, SigningKey,
};

use crate::ecc256::{PrivateKey, PublicKey, KEY_SIZE};
use crate::error::{PrimitiveError, PrimitiveResult};

/// Size of a signature as `r || s`
pub const SIGNATURE_SIZE: usize = KEY_SIZE * 2;

/// Big-endian `(r, s)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    r: [u8; KEY_SIZE],
    s: [u8; KEY_SIZE],
}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> PrimitiveResult<Self> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(PrimitiveError::InvalidSignature);
        }
        let mut r = [0u8; KEY_SIZE];
        let mut s = [0u8; KEY_SIZE];
        r.copy_from_slice(&bytes[..KEY_SIZE]);
        s.copy_from_slice(&bytes[KEY_SIZE..]);
        Ok(Self { r, s })
    }

    #[inline]
    pub fn r(&self) -> &[u8; KEY_SIZE] {
        &self.r
    }

    #[inline]
    pub fn s(&self) -> &[u8; KEY_SIZE] {
        &self.s
    }

    #[inline]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut buf = [0u8; SIGNATURE_SIZE];
        buf[..KEY_SIZE].copy_from_slice(&self.r);
        buf[KEY_SIZE..].copy_from_slice(&self.s);
        buf
    }
}

pub trait Secp256r1Sign {
    fn secp256r1_sign<T: AsRef<[u8]>>(&self, message: T) -> PrimitiveResult<Signature>;
}

pub trait Secp256r1Verify {
    fn secp256r1_verify<T: AsRef<[u8]>>(
        &self,
        message: T,
        signature: &Signature,
    ) -> PrimitiveResult<()>;
}

impl Secp256r1Sign for PrivateKey {
    fn secp256r1_sign<T: AsRef<[u8]>>(&self, message: T) -> PrimitiveResult<Signature> {
        let signing_key = SigningKey::from(self.secret_key()?);
        let signature: P256Signature = signing_key
            .try_sign(message.as_ref())
            .map_err(|_| PrimitiveError::InvalidPrivateKey)?;

        Signature::from_bytes(&signature.to_bytes())
    }
}

impl Secp256r1Verify for PublicKey {
    fn secp256r1_verify<T: AsRef<[u8]>>(
        &self,
        message: T,
        signature: &Signature,
    ) -> PrimitiveResult<()> {
        let signature = P256Signature::from_slice(&signature.to_bytes())
            .map_err(|_| PrimitiveError::InvalidSignature)?;

        self.verifying_key()?
            .verify(message.as_ref(), &signature)
            .map_err(|_| PrimitiveError::InvalidSignature)
    }
}

/// Signs `message` with `private_key`.
pub fn sign(message: &[u8], private_key: &PrivateKey) -> PrimitiveResult<Signature> {
    private_key.secp256r1_sign(message)
}

/// Verifies `signature` over `message` against `public_key`.
pub fn verify(message: &[u8], signature: &Signature, public_key: &PublicKey) -> PrimitiveResult<()> {
    public_key.secp256r1_verify(message, signature)
}
