//! WOLK enclave host adapter
//!
//! Untrusted-side surface of the bridge. It loads the enclave, lays out
//! arguments in the untrusted region, crosses, and maps boundary statuses
//! onto [`HostError`]. It also owns the ambient pieces of a host process:
//! configuration, logging and the sealed blob store.
//!
//! ```no_run
//! use wolk_host::{load_enclave_with_config, BridgeConfig};
//!
//! let config = BridgeConfig::default();
//! let mut handle = load_enclave_with_config(&config)?;
//! let blob = handle.call_seal(b"secret")?;
//! let plaintext = handle.call_unseal(&blob, 6)?;
//! assert_eq!(plaintext.as_slice(), b"secret");
//! # Ok::<(), wolk_host::HostError>(())
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod handle;
pub mod logging;
pub mod shared;
pub mod store;

pub use config::{BridgeConfig, EnclaveSettings, LoggingSettings, MemorySettings, PolicySetting};
pub use error::{HostError, HostResult};
pub use handle::{
    load_enclave, load_enclave_from_image, load_enclave_with_config, load_platform_secret,
    BoundaryHandle,
};
pub use shared::SharedBoundary;
pub use store::{SealedMetadata, SealedStore};
