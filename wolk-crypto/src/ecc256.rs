//! NIST P-256 key material.

use std::fmt::{self, Debug, Formatter};

use p256::{
    ecdsa::VerifyingKey, elliptic_curve::sec1::ToEncodedPoint, PublicKey as P256PublicKey,
    SecretKey as P256SecretKey,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{PrimitiveError, PrimitiveResult};

/// Size of a private scalar and of each public coordinate
pub const KEY_SIZE: usize = 32;

/// Size of a public key as `x || y`
pub const PUBLIC_KEY_SIZE: usize = KEY_SIZE * 2;

// An out-of-range candidate has probability ~2^-32, so hitting this bound
// means the entropy source is broken.
const MAX_SCALAR_ATTEMPTS: usize = 64;

/// Big-endian private scalar, zeroed on drop.
#[derive(Clone)]
pub struct PrivateKey {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl PrivateKey {
    #[inline]
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(bytes),
        }
    }

    /// Only the length is checked here; scalar validity is checked on use.
    #[inline]
    pub fn from_slice(slice: &[u8]) -> PrimitiveResult<Self> {
        if slice.len() != KEY_SIZE {
            return Err(PrimitiveError::InvalidPrivateKey);
        }
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(slice);
        Ok(Self { key })
    }

    #[inline]
    pub fn as_be_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub(crate) fn secret_key(&self) -> PrimitiveResult<P256SecretKey> {
        P256SecretKey::from_slice(self.key.as_slice()).map_err(|_| PrimitiveError::InvalidPrivateKey)
    }

    /// Derives `self * G`.
    pub fn public_key(&self) -> PrimitiveResult<PublicKey> {
        PublicKey::from_p256(&self.secret_key()?.public_key())
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&"***").finish()
    }
}

impl Eq for PrivateKey {}

impl PartialEq for PrivateKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key.as_slice().ct_eq(other.key.as_slice()).into()
    }
}

/// Affine public point, stored as raw big-endian coordinates.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PublicKey {
    gx: [u8; KEY_SIZE],
    gy: [u8; KEY_SIZE],
}

impl PublicKey {
    fn from_p256(public: &P256PublicKey) -> PrimitiveResult<Self> {
        let encoded = public.to_encoded_point(false);
        let (Some(x), Some(y)) = (encoded.x(), encoded.y()) else {
            return Err(PrimitiveError::InvalidPublicKey);
        };

        let mut gx = [0u8; KEY_SIZE];
        let mut gy = [0u8; KEY_SIZE];
        gx.copy_from_slice(x.as_slice());
        gy.copy_from_slice(y.as_slice());
        Ok(Self { gx, gy })
    }

    /// Parses a SEC1 encoded point (compressed or uncompressed), checking it
    /// lies on the curve.
    pub fn from_sec1_bytes(bytes: &[u8]) -> PrimitiveResult<Self> {
        let public =
            P256PublicKey::from_sec1_bytes(bytes).map_err(|_| PrimitiveError::InvalidPublicKey)?;
        Self::from_p256(&public)
    }

    /// Parses the 64-byte `x || y` form used on the boundary.
    pub fn from_xy(bytes: &[u8]) -> PrimitiveResult<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(PrimitiveError::InvalidPublicKey);
        }
        let mut sec1 = [0u8; PUBLIC_KEY_SIZE + 1];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(bytes);
        Self::from_sec1_bytes(&sec1)
    }

    #[inline]
    pub fn gx(&self) -> &[u8; KEY_SIZE] {
        &self.gx
    }

    #[inline]
    pub fn gy(&self) -> &[u8; KEY_SIZE] {
        &self.gy
    }

    #[inline]
    pub fn to_xy_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut buf = [0u8; PUBLIC_KEY_SIZE];
        buf[..KEY_SIZE].copy_from_slice(&self.gx);
        buf[KEY_SIZE..].copy_from_slice(&self.gy);
        buf
    }

    #[inline]
    pub fn to_uncompressed(&self) -> [u8; PUBLIC_KEY_SIZE + 1] {
        let mut buf = [0u8; PUBLIC_KEY_SIZE + 1];
        buf[0] = 0x04;
        buf[1..].copy_from_slice(&self.to_xy_bytes());
        buf
    }

    pub(crate) fn verifying_key(&self) -> PrimitiveResult<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.to_uncompressed())
            .map_err(|_| PrimitiveError::InvalidPublicKey)
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    #[inline]
    pub fn from_private(private_key: PrivateKey) -> PrimitiveResult<Self> {
        let public_key = private_key.public_key()?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Generates a key pair from the operating system entropy source.
    pub fn generate() -> PrimitiveResult<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generates a key pair by rejection sampling scalars from `rng`.
    pub fn generate_with<R: CryptoRng + RngCore>(rng: &mut R) -> PrimitiveResult<Self> {
        let mut candidate = Zeroizing::new([0u8; KEY_SIZE]);
        for _ in 0..MAX_SCALAR_ATTEMPTS {
            rng.try_fill_bytes(candidate.as_mut_slice())
                .map_err(|_| PrimitiveError::Entropy)?;

            if let Ok(secret) = P256SecretKey::from_slice(candidate.as_slice()) {
                let public_key = PublicKey::from_p256(&secret.public_key())?;
                return Ok(Self {
                    private_key: PrivateKey::new(*candidate),
                    public_key,
                });
            }
        }
        Err(PrimitiveError::Entropy)
    }
}

/// Generates a fresh P-256 key pair.
pub fn generate_keypair() -> PrimitiveResult<KeyPair> {
    KeyPair::generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::{AffinePoint, NonZeroScalar, ProjectivePoint};

    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy unavailable"))
        }
    }

    impl CryptoRng for FailingRng {}

    #[test]
    fn test_public_is_scalar_times_generator() {
        let keypair = generate_keypair().unwrap();

        let scalar = NonZeroScalar::try_from(keypair.private_key.as_be_bytes().as_slice()).unwrap();
        let point = AffinePoint::from(ProjectivePoint::GENERATOR * *scalar).to_encoded_point(false);

        assert_eq!(&point.as_bytes()[1..33], keypair.public_key.gx());
        assert_eq!(&point.as_bytes()[33..65], keypair.public_key.gy());
    }

    #[test]
    fn test_consecutive_keys_differ() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        assert_ne!(a.private_key, b.private_key);
        assert_ne!(a.public_key, b.public_key);
    }

    #[test]
    fn test_entropy_failure_is_reported() {
        let result = KeyPair::generate_with(&mut FailingRng);
        assert_eq!(result.unwrap_err(), PrimitiveError::Entropy);
    }

    #[test]
    fn test_xy_roundtrip_and_curve_check() {
        let keypair = generate_keypair().unwrap();
        let xy = keypair.public_key.to_xy_bytes();
        assert_eq!(PublicKey::from_xy(&xy).unwrap(), keypair.public_key);

        let mut off_curve = xy;
        off_curve[63] ^= 0x01;
        assert_eq!(
            PublicKey::from_xy(&off_curve).unwrap_err(),
            PrimitiveError::InvalidPublicKey
        );
        assert!(PublicKey::from_xy(&xy[..63]).is_err());
    }

    #[test]
    fn test_invalid_scalars_rejected() {
        assert!(PrivateKey::new([0u8; KEY_SIZE]).public_key().is_err());
        assert!(PrivateKey::new([0xFFu8; KEY_SIZE]).public_key().is_err());
        assert!(PrivateKey::from_slice(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = PrivateKey::new([0x42u8; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "PrivateKey(\"***\")");
    }
}
