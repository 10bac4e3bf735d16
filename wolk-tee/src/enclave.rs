//! Enclave instance
//!
//! An [`Enclave`] holds only its identity. It keeps no state between calls,
//! so [`Enclave::ecall`] takes `&self`; callers serialize crossings on the
//! region they own.

use wolk_crypto::{digest, KeyPolicy, SealingIdentity};

use crate::edge::table;
use crate::edge::{CallRecord, Crossing, Span, UntrustedRegion, OUTPUT_COUNT};
use crate::error::{ReturnCode, TeeError, TeeResult};
use crate::service::EnclaveService;

/// Enclave load parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclaveConfig {
    /// Policy new blobs are sealed under
    pub policy: KeyPolicy,
    /// Security version; blobs sealed at a higher version do not open
    pub isv_svn: u16,
    /// Signer measurement
    pub mrsigner: [u8; 32],
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            policy: KeyPolicy::MrEnclave,
            isv_svn: 1,
            mrsigner: [0u8; 32],
        }
    }
}

#[derive(Debug)]
pub struct Enclave {
    identity: SealingIdentity,
    policy: KeyPolicy,
}

impl Enclave {
    /// Load an enclave from its image bytes. The measurement is the SHA-256
    /// of the image.
    pub fn load(image: &[u8], config: &EnclaveConfig, platform_secret: [u8; 32]) -> TeeResult<Self> {
        if image.is_empty() {
            return Err(TeeError::ContractViolation("enclave image is empty"));
        }

        let identity =
            SealingIdentity::new(digest(image), config.mrsigner, config.isv_svn, platform_secret);
        Ok(Self::from_identity(identity, config.policy))
    }

    pub fn from_identity(identity: SealingIdentity, policy: KeyPolicy) -> Self {
        Self { identity, policy }
    }

    #[inline]
    pub fn mrenclave(&self) -> &[u8; 32] {
        self.identity.mrenclave()
    }

    #[inline]
    pub fn mrsigner(&self) -> &[u8; 32] {
        self.identity.mrsigner()
    }

    #[inline]
    pub fn isv_svn(&self) -> u16 {
        self.identity.isv_svn()
    }

    #[inline]
    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    pub fn service(&self) -> EnclaveService<'_> {
        EnclaveService::new(&self.identity, self.policy)
    }

    /// One synchronous crossing.
    ///
    /// `record` must be a [`RECORD_SIZE`](crate::RECORD_SIZE) span inside
    /// `region`. The status is written into the record when the record span
    /// itself is valid, and always returned. Outputs are written only on
    /// success.
    pub fn ecall(&self, region: &mut UntrustedRegion, record: Span) -> ReturnCode {
        let mut crossing = match Crossing::open(region, record) {
            Ok(crossing) => crossing,
            Err(err) => return err.return_code(),
        };

        let (status, out_lens) = match self.dispatch(&mut crossing) {
            Ok(out_lens) => (ReturnCode::Success, out_lens),
            Err(err) => (err.return_code(), [0; OUTPUT_COUNT]),
        };

        match crossing.write_response(status, out_lens) {
            Ok(()) => status,
            Err(err) => err.return_code(),
        }
    }

    fn dispatch(&self, crossing: &mut Crossing<'_>) -> TeeResult<[u64; OUTPUT_COUNT]> {
        let record: CallRecord = crossing.read_record()?;
        let entry = table::lookup(record.opcode)?;

        if record.slots[entry.arity..].iter().any(|slot| !slot.is_unset()) {
            return Err(TeeError::ContractViolation("unused argument slot is set"));
        }

        (entry.handler)(&self.service(), crossing, &record.slots)
    }
}
