//! Primitive layer error types

use thiserror::Error;

/// Result type for primitive operations
pub type PrimitiveResult<T> = std::result::Result<T, PrimitiveError>;

/// Primitive error types.
///
/// Messages describe what failed, never the bytes involved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// The entropy source could not be read
    #[error("entropy source unavailable")]
    Entropy,

    /// Private key is not a valid P-256 scalar
    #[error("invalid private key material")]
    InvalidPrivateKey,

    /// Public key is not a point on P-256
    #[error("invalid public key encoding")]
    InvalidPublicKey,

    /// Signature is malformed or does not verify
    #[error("invalid signature")]
    InvalidSignature,

    /// Sealed data failed authentication or belongs to another identity
    #[error("sealed data failed integrity check")]
    Integrity,

    /// Buffer length does not match the operation's contract
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Cipher or key-derivation engine failure
    #[error("cipher failure: {0}")]
    Cipher(&'static str),
}
