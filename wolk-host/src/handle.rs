//! Boundary handle
//!
//! A [`BoundaryHandle`] owns one enclave instance and the untrusted region
//! used to talk to it. Every `call_*` method takes `&mut self`, so at most one
//! crossing is in flight per handle.
//!
//! The region grows on demand before a call whose layout does not fit, up to
//! the handle's region limit.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info, warn};
use wolk_crypto::{
    sealed_size, Digest, DIGEST_SIZE, KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
use wolk_tee::{
    CallRecord, Enclave, EnclaveConfig, Request, ReturnCode, Span, UntrustedRegion, RECORD_SIZE,
    REGION_ALIGN, REGION_GUARD,
};
use zeroize::Zeroizing;

use crate::config::{BridgeConfig, MAX_REGION_SIZE};
use crate::error::{check_status, HostError, HostResult};

/// Size of the simulated platform secret
pub const PLATFORM_SECRET_SIZE: usize = 32;

/// Default untrusted region size
pub const DEFAULT_REGION_SIZE: usize = 1024 * 1024;

/// Load the enclave image at `path` and provision its platform secret from
/// `platform_key_path`.
pub fn load_enclave(
    path: &Path,
    platform_key_path: &Path,
    config: &EnclaveConfig,
    region_size: usize,
) -> HostResult<BoundaryHandle> {
    let image = fs::read(path).map_err(|err| {
        HostError::LoadFailed(format!("cannot read image {}: {err}", path.display()))
    })?;
    let platform_secret = load_platform_secret(platform_key_path)?;
    let handle = load_enclave_from_image(&image, config, *platform_secret, region_size)?;

    info!(
        image = %path.display(),
        policy = ?config.policy,
        isv_svn = config.isv_svn,
        "enclave loaded"
    );
    Ok(handle)
}

/// [`load_enclave`] with every path and parameter taken from `config`
pub fn load_enclave_with_config(config: &BridgeConfig) -> HostResult<BoundaryHandle> {
    load_enclave(
        &config.enclave.image_path,
        &config.enclave.platform_key_path,
        &config.enclave_config()?,
        config.memory.region_size,
    )
}

/// Load an enclave from image bytes already in memory
pub fn load_enclave_from_image(
    image: &[u8],
    config: &EnclaveConfig,
    platform_secret: [u8; PLATFORM_SECRET_SIZE],
    region_size: usize,
) -> HostResult<BoundaryHandle> {
    let enclave = Enclave::load(image, config, platform_secret)
        .map_err(|err| HostError::LoadFailed(err.to_string()))?;
    Ok(BoundaryHandle::new(enclave, region_size))
}

/// Read the platform secret, creating it from OS entropy on first use.
pub fn load_platform_secret(path: &Path) -> HostResult<Zeroizing<[u8; PLATFORM_SECRET_SIZE]>> {
    let mut secret = Zeroizing::new([0u8; PLATFORM_SECRET_SIZE]);

    if path.exists() {
        let bytes = Zeroizing::new(fs::read(path)?);
        if bytes.len() != PLATFORM_SECRET_SIZE {
            return Err(HostError::LoadFailed(format!(
                "platform key {} has {} bytes, expected {PLATFORM_SECRET_SIZE}",
                path.display(),
                bytes.len()
            )));
        }
        secret.copy_from_slice(&bytes);
        return Ok(secret);
    }

    OsRng
        .try_fill_bytes(secret.as_mut_slice())
        .map_err(|err| HostError::LoadFailed(format!("entropy source unavailable: {err}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(secret.as_slice())?;
    file.sync_all()?;

    info!(path = %path.display(), "provisioned platform secret");
    Ok(secret)
}

/// Explicit handle to one enclave instance
#[derive(Debug)]
pub struct BoundaryHandle {
    enclave: Enclave,
    region: UntrustedRegion,
    region_limit: usize,
}

impl BoundaryHandle {
    pub fn new(enclave: Enclave, region_size: usize) -> Self {
        Self {
            enclave,
            region: UntrustedRegion::new(region_size),
            region_limit: region_size.max(MAX_REGION_SIZE),
        }
    }

    /// Cap on how far the untrusted region may grow for a single call
    pub fn with_region_limit(mut self, limit: usize) -> Self {
        self.region_limit = limit.max(self.region.capacity());
        self
    }

    pub fn region_capacity(&self) -> usize {
        self.region.capacity()
    }

    pub fn enclave(&self) -> &Enclave {
        &self.enclave
    }

    pub fn mrenclave(&self) -> &[u8; 32] {
        self.enclave.mrenclave()
    }

    pub fn call_digest(&mut self, input: &[u8]) -> HostResult<Digest> {
        self.with_region(&[input.len(), DIGEST_SIZE], |enclave, region| {
            let input = region.alloc_copy(input)?;
            let digest = region.alloc(DIGEST_SIZE)?;

            let response = cross(enclave, region, Request::Digest { input, digest })?;
            let mut out = [0u8; DIGEST_SIZE];
            out.copy_from_slice(output(region, digest, response.out_lens[0])?);
            Ok(out)
        })
    }

    /// Generate a key pair inside the enclave and export both halves.
    pub fn call_generate_keypair(
        &mut self,
    ) -> HostResult<(Zeroizing<[u8; KEY_SIZE]>, [u8; PUBLIC_KEY_SIZE])> {
        self.with_region(&[KEY_SIZE, PUBLIC_KEY_SIZE], |enclave, region| {
            let private_key = region.alloc(KEY_SIZE)?;
            let public_key = region.alloc(PUBLIC_KEY_SIZE)?;

            let response = cross(
                enclave,
                region,
                Request::GenerateKeyPair {
                    private_key,
                    public_key,
                },
            )?;

            let mut private_out = Zeroizing::new([0u8; KEY_SIZE]);
            private_out.copy_from_slice(output(region, private_key, response.out_lens[0])?);
            let mut public_out = [0u8; PUBLIC_KEY_SIZE];
            public_out.copy_from_slice(output(region, public_key, response.out_lens[1])?);
            Ok((private_out, public_out))
        })
    }

    pub fn call_seal(&mut self, plaintext: &[u8]) -> HostResult<Vec<u8>> {
        let size = sealed_size(plaintext.len()).ok_or_else(|| {
            HostError::InvalidInput(format!("{} bytes is too large to seal", plaintext.len()))
        })?;

        self.with_region(&[plaintext.len(), size], |enclave, region| {
            let input = region.alloc_copy(plaintext)?;
            let sealed = region.alloc(size)?;

            let response = cross(
                enclave,
                region,
                Request::Seal {
                    plaintext: input,
                    sealed,
                },
            )?;
            Ok(output(region, sealed, response.out_lens[0])?.to_vec())
        })
    }

    /// Unseal `blob`, which must hold exactly `expected_len` plaintext bytes.
    pub fn call_unseal(
        &mut self,
        blob: &[u8],
        expected_len: usize,
    ) -> HostResult<Zeroizing<Vec<u8>>> {
        let plaintext = self.with_region(&[blob.len(), expected_len], |enclave, region| {
            let sealed = region.alloc_copy(blob)?;
            let plaintext = region.alloc(expected_len)?;

            let response = cross(enclave, region, Request::Unseal { sealed, plaintext })?;
            Ok(Zeroizing::new(
                output(region, plaintext, response.out_lens[0])?.to_vec(),
            ))
        })?;

        if plaintext.len() != expected_len {
            return Err(HostError::LengthMismatch {
                expected: expected_len,
                actual: plaintext.len(),
            });
        }
        Ok(plaintext)
    }

    pub fn call_sign(
        &mut self,
        message: &[u8],
        private_key: &[u8],
    ) -> HostResult<[u8; SIGNATURE_SIZE]> {
        let lens = [message.len(), private_key.len(), SIGNATURE_SIZE];
        self.with_region(&lens, |enclave, region| {
            let message = region.alloc_copy(message)?;
            let private_key = region.alloc_copy(private_key)?;
            let signature = region.alloc(SIGNATURE_SIZE)?;

            let response = cross(
                enclave,
                region,
                Request::Sign {
                    message,
                    private_key,
                    signature,
                },
            )?;
            let mut out = [0u8; SIGNATURE_SIZE];
            out.copy_from_slice(output(region, signature, response.out_lens[0])?);
            Ok(out)
        })
    }

    /// Returns `Ok(false)` when the signature does not verify.
    pub fn call_verify(
        &mut self,
        message: &[u8],
        public_key: &[u8],
        signature: &[u8],
    ) -> HostResult<bool> {
        let lens = [message.len(), public_key.len(), signature.len()];
        let result = self.with_region(&lens, |enclave, region| {
            let message = region.alloc_copy(message)?;
            let public_key = region.alloc_copy(public_key)?;
            let signature = region.alloc_copy(signature)?;

            cross(
                enclave,
                region,
                Request::Verify {
                    message,
                    public_key,
                    signature,
                },
            )
        });

        match result {
            Ok(_) => Ok(true),
            Err(HostError::IntegrityFailure) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Runs `f` on a clean region big enough for buffers of `lens` plus the
    /// call record, and wipes the region afterwards on every path.
    fn with_region<T>(
        &mut self,
        lens: &[usize],
        f: impl FnOnce(&Enclave, &mut UntrustedRegion) -> HostResult<T>,
    ) -> HostResult<T> {
        self.reserve(lens)?;
        self.region.reset();
        let result = f(&self.enclave, &mut self.region);
        self.region.reset();
        result
    }

    /// Grow the region so the layout for `lens` fits. The old region is
    /// zeroed when it is dropped.
    fn reserve(&mut self, lens: &[usize]) -> HostResult<()> {
        let required = layout_size(lens).unwrap_or(usize::MAX);
        if required <= self.region.capacity() {
            return Ok(());
        }
        if required > self.region_limit {
            return Err(HostError::RegionLimit {
                required,
                limit: self.region_limit,
            });
        }

        debug!(
            from = self.region.capacity(),
            to = required,
            "growing untrusted region"
        );
        self.region = UntrustedRegion::new(required);
        Ok(())
    }
}

/// Region bytes needed for buffers of `lens` followed by one call record
fn layout_size(lens: &[usize]) -> Option<usize> {
    lens.iter()
        .chain(std::iter::once(&RECORD_SIZE))
        .try_fold(REGION_GUARD, |total, len| {
            let aligned = len.checked_add(REGION_ALIGN - 1)? & !(REGION_ALIGN - 1);
            total.checked_add(aligned)
        })
}

/// The status `ecall` returned must be the one it wrote into the record.
fn reconcile_status(returned: ReturnCode, recorded: ReturnCode) -> ReturnCode {
    if returned == recorded {
        returned
    } else {
        warn!(%returned, %recorded, "enclave status disagrees with call record");
        ReturnCode::InternalFault
    }
}

/// Encode `request`, cross, and read the response record back.
fn cross(
    enclave: &Enclave,
    region: &mut UntrustedRegion,
    request: Request,
) -> HostResult<CallRecord> {
    let opcode = request.opcode();
    let record = region.alloc_copy(&request.to_record().to_bytes())?;
    let returned = enclave.ecall(region, record);

    let mut bytes = [0u8; RECORD_SIZE];
    bytes.copy_from_slice(region.slice(record)?);
    let response = CallRecord::from_bytes(&bytes);
    let status = reconcile_status(returned, response.return_code());

    let input_lens: Vec<u64> = request.slots()[..request.arity()]
        .iter()
        .map(|span| span.len)
        .collect();
    match status {
        ReturnCode::Success => {
            debug!(op = %opcode, ?input_lens, out_lens = ?response.out_lens, "crossing complete")
        }
        ReturnCode::IntegrityFailure => {
            warn!(op = %opcode, ?input_lens, "integrity failure")
        }
        _ => debug!(op = %opcode, ?input_lens, %status, "crossing failed"),
    }

    check_status(status)?;
    Ok(response)
}

/// The first `len` bytes of an output span, after checking the length the
/// enclave reported against the span it was given.
fn output(region: &UntrustedRegion, span: Span, len: u64) -> HostResult<&[u8]> {
    if len > span.len {
        return Err(HostError::InternalFault);
    }
    Ok(region.slice(Span::new(span.ptr, len))?)
}
