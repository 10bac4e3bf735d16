//! Handle shared between threads

use std::sync::Arc;

use parking_lot::Mutex;
use wolk_crypto::{Digest, KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use zeroize::Zeroizing;

use crate::error::HostResult;
use crate::handle::BoundaryHandle;

/// A [`BoundaryHandle`] behind a mutex. Each call holds the lock for the
/// whole crossing.
#[derive(Debug, Clone)]
pub struct SharedBoundary {
    inner: Arc<Mutex<BoundaryHandle>>,
}

impl SharedBoundary {
    pub fn new(handle: BoundaryHandle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(handle)),
        }
    }

    /// Run `f` with exclusive access to the handle
    pub fn with<T>(&self, f: impl FnOnce(&mut BoundaryHandle) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn call_digest(&self, input: &[u8]) -> HostResult<Digest> {
        self.inner.lock().call_digest(input)
    }

    pub fn call_generate_keypair(
        &self,
    ) -> HostResult<(Zeroizing<[u8; KEY_SIZE]>, [u8; PUBLIC_KEY_SIZE])> {
        self.inner.lock().call_generate_keypair()
    }

    pub fn call_seal(&self, plaintext: &[u8]) -> HostResult<Vec<u8>> {
        self.inner.lock().call_seal(plaintext)
    }

    pub fn call_unseal(&self, blob: &[u8], expected_len: usize) -> HostResult<Zeroizing<Vec<u8>>> {
        self.inner.lock().call_unseal(blob, expected_len)
    }

    pub fn call_sign(&self, message: &[u8], private_key: &[u8]) -> HostResult<[u8; SIGNATURE_SIZE]> {
        self.inner.lock().call_sign(message, private_key)
    }

    pub fn call_verify(&self, message: &[u8], public_key: &[u8], signature: &[u8]) -> HostResult<bool> {
        self.inner.lock().call_verify(message, public_key, signature)
    }
}

impl From<BoundaryHandle> for SharedBoundary {
    fn from(handle: BoundaryHandle) -> Self {
        Self::new(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::load_enclave_from_image;
    use std::thread;
    use wolk_tee::EnclaveConfig;

    #[test]
    fn test_concurrent_callers() {
        let handle =
            load_enclave_from_image(b"shared", &EnclaveConfig::default(), [1u8; 32], 64 * 1024)
                .unwrap();
        let shared = SharedBoundary::new(handle);

        let workers: Vec<_> = (0..4u8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let payload = vec![i; 100 + i as usize];
                    for _ in 0..8 {
                        let blob = shared.call_seal(&payload).unwrap();
                        let plaintext = shared.call_unseal(&blob, payload.len()).unwrap();
                        assert_eq!(plaintext.as_slice(), payload.as_slice());
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        let digest = shared.with(|handle| handle.call_digest(b"abc")).unwrap();
        assert_eq!(digest, wolk_crypto::digest(b"abc"));
    }
}
