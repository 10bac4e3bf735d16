//! Trusted-side view of one boundary call

use zeroize::Zeroizing;

use super::record::{self, CallRecord, OUTPUT_COUNT, RECORD_SIZE};
use super::region::{Span, UntrustedRegion};
use crate::error::{ReturnCode, TeeError, TeeResult};

/// Holds the region for the duration of a call. Every access goes through
/// [`UntrustedRegion::range`], so a span is validated each time it is used.
pub(crate) struct Crossing<'r> {
    region: &'r mut UntrustedRegion,
    record: Span,
}

impl<'r> Crossing<'r> {
    pub(crate) fn open(region: &'r mut UntrustedRegion, record: Span) -> TeeResult<Self> {
        if record.len != RECORD_SIZE as u64 {
            return Err(TeeError::ContractViolation("call record has wrong length"));
        }
        region.range(record)?;
        Ok(Self { region, record })
    }

    /// Copies the record into trusted memory exactly once.
    pub(crate) fn read_record(&self) -> TeeResult<CallRecord> {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes.copy_from_slice(self.region.slice(self.record)?);

        let record = CallRecord::from_bytes(&bytes);
        if record.reserved != 0 {
            return Err(TeeError::ContractViolation("reserved record field is set"));
        }
        Ok(record)
    }

    /// Copies an input buffer into trusted memory
    pub(crate) fn copy_in(&self, span: Span) -> TeeResult<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(self.region.slice(span)?.to_vec()))
    }

    /// Validates an output span and returns its capacity
    pub(crate) fn check_out(&self, span: Span) -> TeeResult<usize> {
        let range = self.region.range(span)?;
        if span.overlaps(&self.record) {
            return Err(TeeError::ContractViolation("output span overlaps the call record"));
        }
        Ok(range.len())
    }

    pub(crate) fn copy_out(&mut self, span: Span, data: &[u8]) -> TeeResult<()> {
        let capacity = self.check_out(span)?;
        if data.len() > capacity {
            return Err(TeeError::SizeMismatch {
                required: data.len(),
                declared: capacity,
            });
        }
        self.region.slice_mut(span)?[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub(crate) fn write_response(
        &mut self,
        status: ReturnCode,
        out_lens: [u64; OUTPUT_COUNT],
    ) -> TeeResult<()> {
        let bytes = self.region.slice_mut(self.record)?;
        record::write_response(bytes, status, &out_lens)
    }
}
