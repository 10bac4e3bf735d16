//! TEE error types and boundary return codes

use std::fmt;

use thiserror::Error;
use wolk_crypto::PrimitiveError;

/// Result type for TEE operations
pub type TeeResult<T> = std::result::Result<T, TeeError>;

/// Status reported across the boundary.
///
/// This is the closed set of values the enclave writes into a call record.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Success = 0,
    /// Caller contract violation: bad length, bad span, malformed record
    SizeMismatch = 1,
    /// Authentication failure (unseal tag, signature verification)
    IntegrityFailure = 2,
    /// Opcode not present in the call table
    UnknownOperation = 3,
    /// Entropy, cipher or other internal failure
    InternalFault = 4,
}

impl ReturnCode {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decodes a status read back from untrusted memory. Anything outside the
    /// closed set is reported as [`ReturnCode::InternalFault`].
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ReturnCode::Success,
            1 => ReturnCode::SizeMismatch,
            2 => ReturnCode::IntegrityFailure,
            3 => ReturnCode::UnknownOperation,
            _ => ReturnCode::InternalFault,
        }
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == ReturnCode::Success
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCode::Success => "success",
            ReturnCode::SizeMismatch => "size mismatch",
            ReturnCode::IntegrityFailure => "integrity failure",
            ReturnCode::UnknownOperation => "unknown operation",
            ReturnCode::InternalFault => "internal fault",
        };
        f.write_str(name)
    }
}

/// TEE error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeeError {
    /// A span or record supplied by the host breaks the calling contract
    #[error("contract violation: {0}")]
    ContractViolation(&'static str),

    /// Declared buffer length does not fit the operation
    #[error("size mismatch: {required} bytes required, {declared} declared")]
    SizeMismatch { required: usize, declared: usize },

    /// Authentication failed
    #[error("integrity check failed")]
    Integrity,

    /// Opcode outside the call table
    #[error("unknown operation {0}")]
    UnknownOperation(u32),

    /// Host-side allocation in the untrusted region failed
    #[error("untrusted region exhausted: {requested} bytes requested, {available} available")]
    RegionExhausted { requested: usize, available: usize },

    /// Failure reported by the primitive layer
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

impl TeeError {
    /// Maps the error onto the boundary's closed status set
    pub fn return_code(&self) -> ReturnCode {
        match self {
            TeeError::ContractViolation(_)
            | TeeError::SizeMismatch { .. }
            | TeeError::RegionExhausted { .. } => ReturnCode::SizeMismatch,
            TeeError::Integrity => ReturnCode::IntegrityFailure,
            TeeError::UnknownOperation(_) => ReturnCode::UnknownOperation,
            TeeError::Primitive(err) => match err {
                PrimitiveError::Integrity | PrimitiveError::InvalidSignature => {
                    ReturnCode::IntegrityFailure
                }
                PrimitiveError::SizeMismatch { .. } => ReturnCode::SizeMismatch,
                PrimitiveError::Entropy
                | PrimitiveError::InvalidPrivateKey
                | PrimitiveError::InvalidPublicKey
                | PrimitiveError::Cipher(_) => ReturnCode::InternalFault,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_reads_as_fault() {
        for code in 0..5u32 {
            assert_eq!(ReturnCode::from_u32(code).as_u32(), code);
        }
        assert_eq!(ReturnCode::from_u32(5), ReturnCode::InternalFault);
        assert_eq!(ReturnCode::from_u32(u32::MAX), ReturnCode::InternalFault);
    }

    #[test]
    fn test_primitive_error_mapping() {
        let cases = [
            (PrimitiveError::Integrity, ReturnCode::IntegrityFailure),
            (PrimitiveError::InvalidSignature, ReturnCode::IntegrityFailure),
            (
                PrimitiveError::SizeMismatch {
                    expected: 1,
                    actual: 0,
                },
                ReturnCode::SizeMismatch,
            ),
            (PrimitiveError::Entropy, ReturnCode::InternalFault),
            (PrimitiveError::InvalidPrivateKey, ReturnCode::InternalFault),
        ];
        for (err, code) in cases {
            assert_eq!(TeeError::from(err).return_code(), code);
        }
    }
}
