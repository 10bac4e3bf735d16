//! Fixed-layout call record
//!
//! ```text
//! offset  size  field
//!      0     4  opcode       (u32 LE)
//!      4     4  status       (u32 LE, written by the enclave)
//!      8    64  slots[4]     (ptr u64 LE, len u64 LE)
//!     72    16  out_lens[2]  (u64 LE, written by the enclave)
//!     88     8  reserved     (must be zero)
//! ```

use super::region::Span;
use crate::error::{ReturnCode, TeeError, TeeResult};
use crate::opcode::Opcode;

/// Number of argument slots in a record
pub const SLOT_COUNT: usize = 4;

/// Number of output lengths reported back
pub const OUTPUT_COUNT: usize = 2;

/// Encoded record size in bytes
pub const RECORD_SIZE: usize = 96;

const OPCODE_OFFSET: usize = 0;
const STATUS_OFFSET: usize = 4;
const SLOTS_OFFSET: usize = 8;
const SLOT_STRIDE: usize = 16;
const OUT_LENS_OFFSET: usize = 72;
const RESERVED_OFFSET: usize = 88;

/// Request and response for one boundary call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallRecord {
    pub opcode: u32,
    pub status: u32,
    pub slots: [Span; SLOT_COUNT],
    pub out_lens: [u64; OUTPUT_COUNT],
    pub reserved: u64,
}

impl CallRecord {
    /// New request record. Status starts as a fault so a record the enclave
    /// never answered does not read as success.
    pub fn new(opcode: u32, slots: [Span; SLOT_COUNT]) -> Self {
        Self {
            opcode,
            status: ReturnCode::InternalFault.as_u32(),
            slots,
            out_lens: [0; OUTPUT_COUNT],
            reserved: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[OPCODE_OFFSET..OPCODE_OFFSET + 4].copy_from_slice(&self.opcode.to_le_bytes());
        bytes[STATUS_OFFSET..STATUS_OFFSET + 4].copy_from_slice(&self.status.to_le_bytes());
        for (index, slot) in self.slots.iter().enumerate() {
            let offset = SLOTS_OFFSET + index * SLOT_STRIDE;
            bytes[offset..offset + 8].copy_from_slice(&slot.ptr.to_le_bytes());
            bytes[offset + 8..offset + 16].copy_from_slice(&slot.len.to_le_bytes());
        }
        write_out_lens(&mut bytes, &self.out_lens);
        bytes[RESERVED_OFFSET..RESERVED_OFFSET + 8].copy_from_slice(&self.reserved.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut slots = [Span::EMPTY; SLOT_COUNT];
        for (index, slot) in slots.iter_mut().enumerate() {
            let offset = SLOTS_OFFSET + index * SLOT_STRIDE;
            *slot = Span::new(read_u64(bytes, offset), read_u64(bytes, offset + 8));
        }

        let mut out_lens = [0u64; OUTPUT_COUNT];
        for (index, len) in out_lens.iter_mut().enumerate() {
            *len = read_u64(bytes, OUT_LENS_OFFSET + index * 8);
        }

        Self {
            opcode: read_u32(bytes, OPCODE_OFFSET),
            status: read_u32(bytes, STATUS_OFFSET),
            slots,
            out_lens,
            reserved: read_u64(bytes, RESERVED_OFFSET),
        }
    }

    #[inline]
    pub fn return_code(&self) -> ReturnCode {
        ReturnCode::from_u32(self.status)
    }
}

/// Writes only the response fields of an encoded record.
pub(crate) fn write_response(
    bytes: &mut [u8],
    status: ReturnCode,
    out_lens: &[u64; OUTPUT_COUNT],
) -> TeeResult<()> {
    let bytes: &mut [u8; RECORD_SIZE] = bytes
        .try_into()
        .map_err(|_| TeeError::ContractViolation("call record has wrong length"))?;
    bytes[STATUS_OFFSET..STATUS_OFFSET + 4].copy_from_slice(&status.as_u32().to_le_bytes());
    write_out_lens(bytes, out_lens);
    Ok(())
}

fn write_out_lens(bytes: &mut [u8; RECORD_SIZE], out_lens: &[u64; OUTPUT_COUNT]) {
    for (index, len) in out_lens.iter().enumerate() {
        let offset = OUT_LENS_OFFSET + index * 8;
        bytes[offset..offset + 8].copy_from_slice(&len.to_le_bytes());
    }
}

fn read_u32(bytes: &[u8; RECORD_SIZE], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8; RECORD_SIZE], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Typed view of a request, used by the host to fill argument slots in the
/// order the call table expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Seal { plaintext: Span, sealed: Span },
    Unseal { sealed: Span, plaintext: Span },
    Digest { input: Span, digest: Span },
    GenerateKeyPair { private_key: Span, public_key: Span },
    Sign { message: Span, private_key: Span, signature: Span },
    Verify { message: Span, public_key: Span, signature: Span },
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Seal { .. } => Opcode::Seal,
            Request::Unseal { .. } => Opcode::Unseal,
            Request::Digest { .. } => Opcode::Digest,
            Request::GenerateKeyPair { .. } => Opcode::GenerateKeyPair,
            Request::Sign { .. } => Opcode::Sign,
            Request::Verify { .. } => Opcode::Verify,
        }
    }

    /// Number of slots the request occupies
    pub fn arity(&self) -> usize {
        match self {
            Request::Seal { .. }
            | Request::Unseal { .. }
            | Request::Digest { .. }
            | Request::GenerateKeyPair { .. } => 2,
            Request::Sign { .. } | Request::Verify { .. } => 3,
        }
    }

    pub fn slots(&self) -> [Span; SLOT_COUNT] {
        let empty = Span::EMPTY;
        match *self {
            Request::Seal { plaintext, sealed } => [plaintext, sealed, empty, empty],
            Request::Unseal { sealed, plaintext } => [sealed, plaintext, empty, empty],
            Request::Digest { input, digest } => [input, digest, empty, empty],
            Request::GenerateKeyPair {
                private_key,
                public_key,
            } => [private_key, public_key, empty, empty],
            Request::Sign {
                message,
                private_key,
                signature,
            } => [message, private_key, signature, empty],
            Request::Verify {
                message,
                public_key,
                signature,
            } => [message, public_key, signature, empty],
        }
    }

    pub fn to_record(&self) -> CallRecord {
        CallRecord::new(self.opcode().as_u32(), self.slots())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let record = CallRecord {
            opcode: 4,
            status: 2,
            slots: [
                Span::new(0x10, 0x20),
                Span::new(0x30, 0x40),
                Span::EMPTY,
                Span::new(u64::MAX, 1),
            ],
            out_lens: [64, 7],
            reserved: 0,
        };
        let bytes = record.to_bytes();

        assert_eq!(&bytes[0..4], &[4, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &0x10u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &0x20u64.to_le_bytes());
        assert_eq!(&bytes[56..64], &u64::MAX.to_le_bytes());
        assert_eq!(&bytes[72..80], &64u64.to_le_bytes());
        assert_eq!(&bytes[80..88], &7u64.to_le_bytes());
        assert_eq!(&bytes[88..96], &[0; 8]);
        assert_eq!(CallRecord::from_bytes(&bytes), record);
    }

    #[test]
    fn test_write_response_leaves_request_fields() {
        let request = Request::Digest {
            input: Span::new(16, 3),
            digest: Span::new(24, 32),
        };
        let mut bytes = request.to_record().to_bytes();
        write_response(&mut bytes, ReturnCode::Success, &[32, 0]).unwrap();

        let record = CallRecord::from_bytes(&bytes);
        assert_eq!(record.return_code(), ReturnCode::Success);
        assert_eq!(record.out_lens, [32, 0]);
        assert_eq!(record.slots, request.slots());
        assert_eq!(record.opcode, Opcode::Digest.as_u32());
    }

    #[test]
    fn test_new_record_is_not_success() {
        let record = CallRecord::new(0, [Span::EMPTY; SLOT_COUNT]);
        assert_eq!(record.return_code(), ReturnCode::InternalFault);
    }

    #[test]
    fn test_request_arity_matches_slots() {
        let a = Span::new(16, 1);
        let requests = [
            Request::Seal { plaintext: a, sealed: a },
            Request::Unseal { sealed: a, plaintext: a },
            Request::Digest { input: a, digest: a },
            Request::GenerateKeyPair {
                private_key: a,
                public_key: a,
            },
            Request::Sign {
                message: a,
                private_key: a,
                signature: a,
            },
            Request::Verify {
                message: a,
                public_key: a,
                signature: a,
            },
        ];
        for request in requests {
            let slots = request.slots();
            assert!(slots[..request.arity()].iter().all(|s| *s == a));
            assert!(slots[request.arity()..].iter().all(Span::is_unset));
        }
    }
}
