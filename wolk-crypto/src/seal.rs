//! Data sealing bound to the enclave identity
//!
//! A sealed blob is a fixed header followed by the AES-256-GCM ciphertext.
//! GCM preserves length, so `blob.len() == SEALED_HEADER_SIZE + plaintext.len()`.
//!
//! ```text
//! offset  size  field
//!      0     2  format version
//!      2     2  key policy (1 = enclave measurement, 2 = signer)
//!      4     2  security version the key was derived for
//!      6     2  reserved (zero)
//!      8    32  key id (HKDF salt, random per seal)
//!     40     4  payload length
//!     44    12  nonce
//!     56    16  tag
//! ```
//!
//! Bytes `0..56` are authenticated as associated data. The sealing key is
//! derived from the platform secret, the key id, and the identity selected by
//! the policy, so it is never supplied by (or visible to) the caller.

use std::fmt::{self, Debug, Formatter};

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{PrimitiveError, PrimitiveResult};

/// Size of the sealed blob header
pub const SEALED_HEADER_SIZE: usize = 72;

/// Current sealing format version
pub const SEAL_FORMAT_VERSION: u16 = 1;

const IDENTITY_SIZE: usize = 32;
const KEY_ID_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

const POLICY_OFFSET: usize = 2;
const SVN_OFFSET: usize = 4;
const RESERVED_OFFSET: usize = 6;
const KEY_ID_OFFSET: usize = 8;
const PAYLOAD_LEN_OFFSET: usize = 40;
const NONCE_OFFSET: usize = 44;
const TAG_OFFSET: usize = 56;

const SEAL_KEY_LABEL: &[u8] = b"wolk-tee/seal/v1";

/// Which part of the enclave identity a sealing key is bound to
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Only the exact same enclave image can unseal
    #[default]
    MrEnclave = 1,
    /// Any enclave from the same signer (at the same or newer SVN) can unseal
    MrSigner = 2,
}

impl KeyPolicy {
    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(KeyPolicy::MrEnclave),
            2 => Some(KeyPolicy::MrSigner),
            _ => None,
        }
    }
}

/// Identity the enclave was loaded with.
///
/// Fixed for the lifetime of an enclave instance and never mutated.
pub struct SealingIdentity {
    mrenclave: [u8; IDENTITY_SIZE],
    mrsigner: [u8; IDENTITY_SIZE],
    isv_svn: u16,
    platform_secret: Zeroizing<[u8; 32]>,
}

impl SealingIdentity {
    pub fn new(
        mrenclave: [u8; IDENTITY_SIZE],
        mrsigner: [u8; IDENTITY_SIZE],
        isv_svn: u16,
        platform_secret: [u8; 32],
    ) -> Self {
        Self {
            mrenclave,
            mrsigner,
            isv_svn,
            platform_secret: Zeroizing::new(platform_secret),
        }
    }

    #[inline]
    pub fn mrenclave(&self) -> &[u8; IDENTITY_SIZE] {
        &self.mrenclave
    }

    #[inline]
    pub fn mrsigner(&self) -> &[u8; IDENTITY_SIZE] {
        &self.mrsigner
    }

    #[inline]
    pub fn isv_svn(&self) -> u16 {
        self.isv_svn
    }

    fn derive_key(
        &self,
        policy: KeyPolicy,
        isv_svn: u16,
        key_id: &[u8; KEY_ID_SIZE],
    ) -> PrimitiveResult<Zeroizing<[u8; 32]>> {
        let bound_identity = match policy {
            KeyPolicy::MrEnclave => &self.mrenclave,
            KeyPolicy::MrSigner => &self.mrsigner,
        };

        let mut info = Vec::with_capacity(SEAL_KEY_LABEL.len() + 4 + IDENTITY_SIZE);
        info.extend_from_slice(SEAL_KEY_LABEL);
        info.extend_from_slice(&policy.as_u16().to_le_bytes());
        info.extend_from_slice(&isv_svn.to_le_bytes());
        info.extend_from_slice(bound_identity);

        let hkdf = Hkdf::<Sha256>::new(Some(key_id), self.platform_secret.as_slice());
        let mut key = Zeroizing::new([0u8; 32]);
        hkdf.expand(&info, key.as_mut_slice())
            .map_err(|_| PrimitiveError::Cipher("sealing key derivation failed"))?;
        Ok(key)
    }
}

impl Debug for SealingIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealingIdentity")
            .field("mrenclave", &self.mrenclave)
            .field("mrsigner", &self.mrsigner)
            .field("isv_svn", &self.isv_svn)
            .field("platform_secret", &"***")
            .finish()
    }
}

/// Parsed header fields. Nothing here is trusted until the tag verifies.
struct SealedHeader {
    policy: KeyPolicy,
    isv_svn: u16,
    key_id: [u8; KEY_ID_SIZE],
    payload_len: usize,
    nonce: [u8; NONCE_SIZE],
    tag: [u8; TAG_SIZE],
}

impl SealedHeader {
    fn parse(blob: &[u8]) -> PrimitiveResult<Self> {
        if blob.len() < SEALED_HEADER_SIZE {
            return Err(PrimitiveError::Integrity);
        }

        let version = read_u16(blob, 0);
        if version != SEAL_FORMAT_VERSION {
            return Err(PrimitiveError::Integrity);
        }

        let policy = KeyPolicy::from_u16(read_u16(blob, POLICY_OFFSET))
            .ok_or(PrimitiveError::Integrity)?;

        if read_u16(blob, RESERVED_OFFSET) != 0 {
            return Err(PrimitiveError::Integrity);
        }

        let payload_len = read_u32(blob, PAYLOAD_LEN_OFFSET) as usize;
        if blob.len() - SEALED_HEADER_SIZE != payload_len {
            return Err(PrimitiveError::Integrity);
        }

        let mut key_id = [0u8; KEY_ID_SIZE];
        key_id.copy_from_slice(&blob[KEY_ID_OFFSET..KEY_ID_OFFSET + KEY_ID_SIZE]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&blob[NONCE_OFFSET..NONCE_OFFSET + NONCE_SIZE]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&blob[TAG_OFFSET..TAG_OFFSET + TAG_SIZE]);

        Ok(Self {
            policy,
            isv_svn: read_u16(blob, SVN_OFFSET),
            key_id,
            payload_len,
            nonce,
            tag,
        })
    }
}

/// Seals and unseals data under keys derived from a [`SealingIdentity`].
pub struct Sealer<'a> {
    identity: &'a SealingIdentity,
    policy: KeyPolicy,
}

impl<'a> Sealer<'a> {
    pub fn new(identity: &'a SealingIdentity, policy: KeyPolicy) -> Self {
        Self { identity, policy }
    }

    #[inline]
    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    /// Seal `plaintext` into a newly allocated blob
    pub fn seal(&self, plaintext: &[u8]) -> PrimitiveResult<Vec<u8>> {
        let size = sealed_size(plaintext.len()).ok_or(PrimitiveError::SizeMismatch {
            expected: u32::MAX as usize,
            actual: plaintext.len(),
        })?;
        let mut blob = vec![0u8; size];
        self.seal_into(plaintext, &mut blob)?;
        Ok(blob)
    }

    /// Seal `plaintext` into `out`, which must be exactly
    /// [`sealed_size`] bytes long.
    pub fn seal_into(&self, plaintext: &[u8], out: &mut [u8]) -> PrimitiveResult<usize> {
        self.seal_into_with(&mut OsRng, plaintext, out)
    }

    pub fn seal_into_with<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        out: &mut [u8],
    ) -> PrimitiveResult<usize> {
        let payload_len =
            u32::try_from(plaintext.len()).map_err(|_| PrimitiveError::SizeMismatch {
                expected: u32::MAX as usize,
                actual: plaintext.len(),
            })?;
        let expected = SEALED_HEADER_SIZE + plaintext.len();
        if out.len() != expected {
            return Err(PrimitiveError::SizeMismatch {
                expected,
                actual: out.len(),
            });
        }

        let mut key_id = [0u8; KEY_ID_SIZE];
        rng.try_fill_bytes(&mut key_id)
            .map_err(|_| PrimitiveError::Entropy)?;
        let mut nonce = [0u8; NONCE_SIZE];
        rng.try_fill_bytes(&mut nonce)
            .map_err(|_| PrimitiveError::Entropy)?;

        let isv_svn = self.identity.isv_svn;
        let key = self.identity.derive_key(self.policy, isv_svn, &key_id)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|_| PrimitiveError::Cipher("invalid sealing key"))?;

        let (header, body) = out.split_at_mut(SEALED_HEADER_SIZE);
        header.fill(0);
        header[..POLICY_OFFSET].copy_from_slice(&SEAL_FORMAT_VERSION.to_le_bytes());
        header[POLICY_OFFSET..SVN_OFFSET].copy_from_slice(&self.policy.as_u16().to_le_bytes());
        header[SVN_OFFSET..RESERVED_OFFSET].copy_from_slice(&isv_svn.to_le_bytes());
        header[KEY_ID_OFFSET..PAYLOAD_LEN_OFFSET].copy_from_slice(&key_id);
        header[PAYLOAD_LEN_OFFSET..NONCE_OFFSET].copy_from_slice(&payload_len.to_le_bytes());
        header[NONCE_OFFSET..TAG_OFFSET].copy_from_slice(&nonce);
        body.copy_from_slice(plaintext);

        match cipher.encrypt_in_place_detached(Nonce::from_slice(&nonce), &header[..TAG_OFFSET], body)
        {
            Ok(tag) => {
                header[TAG_OFFSET..].copy_from_slice(tag.as_slice());
                Ok(expected)
            }
            Err(_) => {
                out.zeroize();
                Err(PrimitiveError::Cipher("encryption failed"))
            }
        }
    }

    /// Unseal `blob`, returning the plaintext in zero-on-drop memory.
    ///
    /// The key policy and security version come from the blob itself, so a
    /// blob sealed under [`KeyPolicy::MrSigner`] opens regardless of the
    /// policy this sealer seals with.
    pub fn unseal(&self, blob: &[u8]) -> PrimitiveResult<Zeroizing<Vec<u8>>> {
        let header = SealedHeader::parse(blob)?;
        if header.isv_svn > self.identity.isv_svn {
            return Err(PrimitiveError::Integrity);
        }

        let key = self
            .identity
            .derive_key(header.policy, header.isv_svn, &header.key_id)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|_| PrimitiveError::Cipher("invalid sealing key"))?;

        let mut plaintext = Zeroizing::new(blob[SEALED_HEADER_SIZE..].to_vec());
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&header.nonce),
                &blob[..TAG_OFFSET],
                plaintext.as_mut_slice(),
                GenericArray::from_slice(&header.tag),
            )
            .map_err(|_| PrimitiveError::Integrity)?;

        Ok(plaintext)
    }

    /// Unseal `blob` into `out`. `out` must hold at least the payload
    /// length; nothing is written unless authentication succeeds.
    pub fn unseal_into(&self, blob: &[u8], out: &mut [u8]) -> PrimitiveResult<usize> {
        let payload_len = unsealed_size(blob)?;
        if out.len() < payload_len {
            return Err(PrimitiveError::SizeMismatch {
                expected: payload_len,
                actual: out.len(),
            });
        }

        let plaintext = self.unseal(blob)?;
        out[..payload_len].copy_from_slice(&plaintext);
        Ok(payload_len)
    }
}

/// Size of the blob that sealing `plaintext_len` bytes produces, or `None`
/// if the payload does not fit the header's length field.
pub fn sealed_size(plaintext_len: usize) -> Option<usize> {
    if plaintext_len > u32::MAX as usize {
        return None;
    }
    SEALED_HEADER_SIZE.checked_add(plaintext_len)
}

/// Payload length recorded in a blob header. Fails with
/// [`PrimitiveError::Integrity`] when the header is malformed or disagrees
/// with the blob length.
pub fn unsealed_size(blob: &[u8]) -> PrimitiveResult<usize> {
    SealedHeader::parse(blob).map(|header| header.payload_len)
}

#[inline]
fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
