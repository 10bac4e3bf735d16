//! SHA-256 digest.

use sha2::{Digest as _, Sha256};

/// Size of a digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// SHA-256 output
pub type Digest = [u8; DIGEST_SIZE];

/// Computes the SHA-256 digest of `input`.
///
/// # Example
/// ```
/// use wolk_crypto::digest;
/// let hash = digest(b"SGXRAENCLAVE");
/// assert_eq!(hash[0], 0x8e);
/// ```
pub fn digest(input: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}
