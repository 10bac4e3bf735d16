//! Host adapter errors

use thiserror::Error;
use wolk_tee::{ReturnCode, TeeError};

/// Result type for host adapter operations
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Host adapter errors
#[derive(Error, Debug)]
pub enum HostError {
    #[error("failed to load enclave: {0}")]
    LoadFailed(String),

    #[error("boundary rejected a buffer size")]
    SizeMismatch,

    #[error("integrity check failed")]
    IntegrityFailure,

    #[error("operation not supported by the enclave")]
    UnknownOperation,

    #[error("enclave internal fault")]
    InternalFault,

    #[error("untrusted region too small: {required} bytes required, limit {limit}")]
    RegionLimit { required: usize, limit: usize },

    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl HostError {
    /// Boundary status for errors that came from a crossing
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            HostError::SizeMismatch | HostError::RegionLimit { .. } => {
                Some(ReturnCode::SizeMismatch)
            }
            HostError::IntegrityFailure => Some(ReturnCode::IntegrityFailure),
            HostError::UnknownOperation => Some(ReturnCode::UnknownOperation),
            HostError::InternalFault => Some(ReturnCode::InternalFault),
            _ => None,
        }
    }
}

/// A `Success` status is never an error; converting one means the caller
/// skipped the status check, which is reported as a fault.
impl From<ReturnCode> for HostError {
    fn from(code: ReturnCode) -> Self {
        match code {
            ReturnCode::SizeMismatch => HostError::SizeMismatch,
            ReturnCode::IntegrityFailure => HostError::IntegrityFailure,
            ReturnCode::UnknownOperation => HostError::UnknownOperation,
            ReturnCode::Success | ReturnCode::InternalFault => HostError::InternalFault,
        }
    }
}

/// Host-side layout failures, before anything crosses the boundary
impl From<TeeError> for HostError {
    fn from(err: TeeError) -> Self {
        match err {
            TeeError::RegionExhausted {
                requested,
                available,
            } => HostError::RegionLimit {
                required: requested,
                limit: available,
            },
            other => HostError::InvalidInput(other.to_string()),
        }
    }
}

/// Turns a status read back from the record into a result
pub fn check_status(code: ReturnCode) -> HostResult<()> {
    if code.is_success() {
        Ok(())
    } else {
        Err(HostError::from(code))
    }
}
