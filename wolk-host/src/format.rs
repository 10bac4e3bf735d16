//! Hex rendering for digests, keys and signatures

use crate::error::{HostError, HostResult};

/// Upper-case hex, no separators
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Parses hex in either case, with an optional `0x` prefix.
pub fn from_hex(text: &str) -> HostResult<Vec<u8>> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(text).map_err(|err| HostError::InvalidInput(format!("invalid hex: {err}")))
}

/// Parses hex of an exact decoded length
pub fn from_hex_array<const N: usize>(text: &str) -> HostResult<[u8; N]> {
    let bytes = from_hex(text)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| HostError::LengthMismatch {
        expected: N,
        actual,
    })
}
