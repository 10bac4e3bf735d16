//! # wolk-crypto
//!
//! Cryptographic primitives executed inside the wolk enclave.
//!
//! - SHA-256 digests
//! - NIST P-256 key generation
//! - ECDSA signing and verification (SHA-256, RFC 6979 nonces)
//! - Authenticated sealing bound to the enclave identity
//!
//! Every function here is stateless: the only long-lived input is the
//! [`SealingIdentity`] the enclave is loaded with. Errors never carry key or
//! plaintext bytes.

pub mod ecc256;
pub mod ecdsa;
pub mod error;
pub mod hash;
pub mod seal;

pub use ecc256::{generate_keypair, KeyPair, PrivateKey, PublicKey, KEY_SIZE, PUBLIC_KEY_SIZE};
pub use ecdsa::{sign, verify, Secp256r1Sign, Secp256r1Verify, Signature, SIGNATURE_SIZE};
pub use error::{PrimitiveError, PrimitiveResult};
pub use hash::{digest, Digest, DIGEST_SIZE};
pub use seal::{
    sealed_size, unsealed_size, KeyPolicy, Sealer, SealingIdentity, SEALED_HEADER_SIZE,
    SEAL_FORMAT_VERSION,
};
