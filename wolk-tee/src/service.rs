//! Trusted boundary service
//!
//! One entry point per primitive. Entry points work on trusted buffers that
//! the marshaler has already copied in; output buffers are trusted scratch
//! sized to the caller's declared capacity. Every entry point checks that
//! capacity before it writes anything.

use wolk_crypto::{
    digest, sealed_size, sign, unsealed_size, verify, KeyPair, KeyPolicy, PrivateKey, PublicKey,
    Sealer, SealingIdentity, Signature, DIGEST_SIZE, KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};

use crate::error::{TeeError, TeeResult};

/// Stateless view over the enclave identity, created per call.
#[derive(Debug, Clone, Copy)]
pub struct EnclaveService<'a> {
    identity: &'a SealingIdentity,
    policy: KeyPolicy,
}

impl<'a> EnclaveService<'a> {
    pub fn new(identity: &'a SealingIdentity, policy: KeyPolicy) -> Self {
        Self { identity, policy }
    }

    #[inline]
    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    /// Seal `plaintext` into the start of `out`. Returns the blob length.
    pub fn seal(&self, plaintext: &[u8], out: &mut [u8]) -> TeeResult<usize> {
        let required = sealed_size(plaintext.len()).ok_or(TeeError::SizeMismatch {
            required: usize::MAX,
            declared: out.len(),
        })?;
        let out = ensure_capacity(out, required)?;
        let written = Sealer::new(self.identity, self.policy).seal_into(plaintext, out)?;
        Ok(written)
    }

    /// Unseal `blob` into the start of `out`. Returns the plaintext length.
    ///
    /// A blob whose header is malformed fails as an integrity error before
    /// the capacity check, since its recorded length cannot be trusted.
    pub fn unseal(&self, blob: &[u8], out: &mut [u8]) -> TeeResult<usize> {
        let required = unsealed_size(blob)?;
        let out = ensure_capacity(out, required)?;
        let written = Sealer::new(self.identity, self.policy).unseal_into(blob, out)?;
        Ok(written)
    }

    pub fn digest(&self, input: &[u8], out: &mut [u8]) -> TeeResult<usize> {
        let out = ensure_capacity(out, DIGEST_SIZE)?;
        out.copy_from_slice(&digest(input));
        Ok(DIGEST_SIZE)
    }

    /// Generate a P-256 key pair. The private scalar is exported to the
    /// caller because the caller asked for it.
    pub fn generate_keypair(
        &self,
        private_out: &mut [u8],
        public_out: &mut [u8],
    ) -> TeeResult<(usize, usize)> {
        let private_out = ensure_capacity(private_out, KEY_SIZE)?;
        let public_out = ensure_capacity(public_out, PUBLIC_KEY_SIZE)?;

        let pair = KeyPair::generate()?;
        private_out.copy_from_slice(pair.private_key.as_be_bytes());
        public_out.copy_from_slice(&pair.public_key.to_xy_bytes());
        Ok((KEY_SIZE, PUBLIC_KEY_SIZE))
    }

    pub fn sign(&self, message: &[u8], private_key: &[u8], out: &mut [u8]) -> TeeResult<usize> {
        if private_key.len() != KEY_SIZE {
            return Err(TeeError::SizeMismatch {
                required: KEY_SIZE,
                declared: private_key.len(),
            });
        }
        let out = ensure_capacity(out, SIGNATURE_SIZE)?;

        let private_key = PrivateKey::from_slice(private_key)?;
        let signature = sign(message, &private_key)?;
        out.copy_from_slice(&signature.to_bytes());
        Ok(SIGNATURE_SIZE)
    }

    /// Verify `signature` over `message`. Any verification failure,
    /// including an undecodable public key, is an integrity failure.
    pub fn verify(&self, message: &[u8], public_key: &[u8], signature: &[u8]) -> TeeResult<()> {
        if public_key.len() != PUBLIC_KEY_SIZE {
            return Err(TeeError::SizeMismatch {
                required: PUBLIC_KEY_SIZE,
                declared: public_key.len(),
            });
        }
        if signature.len() != SIGNATURE_SIZE {
            return Err(TeeError::SizeMismatch {
                required: SIGNATURE_SIZE,
                declared: signature.len(),
            });
        }

        let public_key = PublicKey::from_xy(public_key).map_err(|_| TeeError::Integrity)?;
        let signature = Signature::from_bytes(signature).map_err(|_| TeeError::Integrity)?;
        verify(message, &signature, &public_key).map_err(|_| TeeError::Integrity)
    }
}

/// Narrows `out` to exactly `required` bytes, or fails without touching it.
fn ensure_capacity(out: &mut [u8], required: usize) -> TeeResult<&mut [u8]> {
    let declared = out.len();
    out.get_mut(..required)
        .ok_or(TeeError::SizeMismatch { required, declared })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReturnCode;
    use hex_literal::hex;
    use wolk_crypto::SEALED_HEADER_SIZE;

    fn identity() -> SealingIdentity {
        SealingIdentity::new([0x11; 32], [0x22; 32], 1, [0x33; 32])
    }

    #[test]
    fn test_digest_reference_vector() {
        let identity = identity();
        let service = EnclaveService::new(&identity, KeyPolicy::MrEnclave);

        let mut out = [0u8; 40];
        let written = service.digest(b"SGXRAENCLAVE", &mut out).unwrap();
        assert_eq!(written, DIGEST_SIZE);
        assert_eq!(
            out[..32],
            hex!("8e50e33484683bcf17591e95d7d391807d80024c7e7b7e4960d9a377bcb72ea9")
        );
        assert_eq!(out[32..], [0u8; 8]);
    }

    #[test]
    fn test_undersized_outputs_are_untouched() {
        let identity = identity();
        let service = EnclaveService::new(&identity, KeyPolicy::MrEnclave);

        let mut small = [0xAAu8; 31];
        let err = service.digest(b"x", &mut small).unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::SizeMismatch);
        assert_eq!(small, [0xAA; 31]);

        let mut sealed = vec![0xAAu8; SEALED_HEADER_SIZE + 4];
        let err = service.seal(b"hello", &mut sealed).unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::SizeMismatch);
        assert!(sealed.iter().all(|b| *b == 0xAA));

        let mut private_out = [0xAAu8; 32];
        let mut public_out = [0xAAu8; 63];
        let err = service
            .generate_keypair(&mut private_out, &mut public_out)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::SizeMismatch);
        assert_eq!(private_out, [0xAA; 32]);
    }

    #[test]
    fn test_seal_unseal_roundtrip() {
        let identity = identity();
        let service = EnclaveService::new(&identity, KeyPolicy::MrSigner);

        let mut blob = vec![0u8; SEALED_HEADER_SIZE + 5];
        assert_eq!(service.seal(b"hello", &mut blob).unwrap(), blob.len());

        let mut plaintext = [0u8; 16];
        assert_eq!(service.unseal(&blob, &mut plaintext).unwrap(), 5);
        assert_eq!(&plaintext[..5], b"hello");

        let mut small = [0u8; 4];
        let err = service.unseal(&blob, &mut small).unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::SizeMismatch);
    }

    #[test]
    fn test_sign_and_verify() {
        let identity = identity();
        let service = EnclaveService::new(&identity, KeyPolicy::MrEnclave);

        let mut private_key = [0u8; 32];
        let mut public_key = [0u8; 64];
        service
            .generate_keypair(&mut private_key, &mut public_key)
            .unwrap();

        let mut signature = [0u8; 64];
        service
            .sign(b"message", &private_key, &mut signature)
            .unwrap();
        service.verify(b"message", &public_key, &signature).unwrap();

        let err = service
            .verify(b"massage", &public_key, &signature)
            .unwrap_err();
        assert_eq!(err, TeeError::Integrity);

        let err = service
            .verify(b"message", &[0u8; 64], &signature)
            .unwrap_err();
        assert_eq!(err, TeeError::Integrity);
    }

    #[test]
    fn test_sign_rejects_bad_key_material() {
        let identity = identity();
        let service = EnclaveService::new(&identity, KeyPolicy::MrEnclave);
        let mut signature = [0u8; 64];

        let err = service
            .sign(b"message", &[1u8; 31], &mut signature)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::SizeMismatch);

        let err = service
            .sign(b"message", &[0u8; 32], &mut signature)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::InternalFault);
        assert_eq!(signature, [0u8; 64]);
    }
}
