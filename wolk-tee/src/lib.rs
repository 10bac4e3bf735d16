//! WOLK TEE (Trusted Execution Environment) bridge
//!
//! This crate is the trusted half of the wolk crypto bridge:
//! - Boundary service entry points for sealing, digests, key generation and
//!   ECDSA signing
//! - The call marshaler that moves requests across the boundary
//! - The enclave instance and its sealing identity
//!
//! The enclave runs in simulation mode: it lives in the host process, and the
//! host can only reach it through [`Enclave::ecall`]. All arguments are passed
//! as spans into an [`UntrustedRegion`] owned by the host, and every span is
//! re-validated on the trusted side before it is read or written.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Untrusted Host                         │
//! │  ┌──────────────┐        ┌───────────────────────────────┐  │
//! │  │   wolk-cli   │ ─────▶ │  wolk-host (BoundaryHandle)   │  │
//! │  └──────────────┘        └───────────────┬───────────────┘  │
//! │                                          │ CallRecord       │
//! │                          ┌───────────────┴───────────────┐  │
//! │                          │        UntrustedRegion        │  │
//! │                          └───────────────┬───────────────┘  │
//! ├──────────────────────────────────────────┼──────────────────┤
//! │                                          │  Enclave         │
//! │  ┌───────────────────────────────────────┴───────────────┐  │
//! │  │  Crossing (bounds checks) ─▶ ECALL_TABLE[opcode]       │  │
//! │  └───────────────────────────────────────┬───────────────┘  │
//! │  ┌───────────────────────────────────────┴───────────────┐  │
//! │  │  EnclaveService ─▶ wolk-crypto                        │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod edge;
pub mod enclave;
pub mod error;
pub mod opcode;
pub mod service;

pub use edge::{
    CallRecord, Request, Span, UntrustedRegion, OUTPUT_COUNT, RECORD_SIZE, REGION_ALIGN, REGION_GUARD,
    SLOT_COUNT,
};
pub use enclave::{Enclave, EnclaveConfig};
pub use error::{ReturnCode, TeeError, TeeResult};
pub use opcode::Opcode;
pub use service::EnclaveService;
pub use wolk_crypto::KeyPolicy;
