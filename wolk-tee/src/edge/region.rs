//! Host-owned memory shared with the enclave.
//!
//! The host allocates argument buffers here and passes them to the enclave as
//! [`Span`]s. Every span is re-validated against the region bounds on use; a
//! span is only an offset and a length chosen by untrusted code.

use std::fmt::{self, Debug, Formatter};
use std::ops::Range;

use zeroize::Zeroize;

use crate::error::{TeeError, TeeResult};

/// Offsets below this are never allocated, so a zero pointer means "no buffer"
pub const REGION_GUARD: usize = 16;

/// Allocation alignment
pub const REGION_ALIGN: usize = 8;

/// Pointer and explicit length into an [`UntrustedRegion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub ptr: u64,
    pub len: u64,
}

impl Span {
    /// Marks an argument slot the operation does not use
    pub const EMPTY: Span = Span { ptr: 0, len: 0 };

    #[inline]
    pub const fn new(ptr: u64, len: u64) -> Self {
        Self { ptr, len }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        *self == Span::EMPTY
    }

    /// One past the last byte, or `None` if `ptr + len` overflows
    #[inline]
    pub fn end(&self) -> Option<u64> {
        self.ptr.checked_add(self.len)
    }

    /// Whether the two spans share at least one byte. Overflowing spans are
    /// treated as overlapping everything.
    pub fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        match (self.end(), other.end()) {
            (Some(self_end), Some(other_end)) => self.ptr < other_end && other.ptr < self_end,
            _ => true,
        }
    }
}

/// Untrusted memory owned by the host.
///
/// Allocation is a bump pointer; [`UntrustedRegion::reset`] zeroes everything
/// handed out and starts over. The backing memory is zeroed on drop.
pub struct UntrustedRegion {
    bytes: Vec<u8>,
    next: usize,
}

impl UntrustedRegion {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity.max(REGION_GUARD)],
            next: REGION_GUARD,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.next - REGION_GUARD
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.bytes.len() - self.next
    }

    /// Reserve `len` zeroed bytes
    pub fn alloc(&mut self, len: usize) -> TeeResult<Span> {
        let start = self.next;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(TeeError::RegionExhausted {
                requested: len,
                available: self.available(),
            })?;

        self.next = end
            .checked_add(REGION_ALIGN - 1)
            .map(|end| end & !(REGION_ALIGN - 1))
            .unwrap_or(end)
            .min(self.bytes.len());

        Ok(Span::new(start as u64, len as u64))
    }

    /// Reserve a buffer and fill it with `data`
    pub fn alloc_copy(&mut self, data: &[u8]) -> TeeResult<Span> {
        let span = self.alloc(data.len())?;
        self.slice_mut(span)?.copy_from_slice(data);
        Ok(span)
    }

    pub fn slice(&self, span: Span) -> TeeResult<&[u8]> {
        let range = self.range(span)?;
        Ok(&self.bytes[range])
    }

    pub fn slice_mut(&mut self, span: Span) -> TeeResult<&mut [u8]> {
        let range = self.range(span)?;
        Ok(&mut self.bytes[range])
    }

    /// Zero every byte handed out since the last reset and rewind.
    pub fn reset(&mut self) {
        self.bytes[..self.next].zeroize();
        self.next = REGION_GUARD;
    }

    /// Bounds check used on both sides of the boundary
    pub(crate) fn range(&self, span: Span) -> TeeResult<Range<usize>> {
        let end = span
            .end()
            .ok_or(TeeError::ContractViolation("span length overflows"))?;

        if !span.is_empty() && span.ptr < REGION_GUARD as u64 {
            return Err(TeeError::ContractViolation("span points into the guard area"));
        }

        if end > self.bytes.len() as u64 {
            return Err(TeeError::ContractViolation("span outside the untrusted region"));
        }

        Ok(span.ptr as usize..end as usize)
    }
}

impl Debug for UntrustedRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UntrustedRegion")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .finish()
    }
}

impl Drop for UntrustedRegion {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
