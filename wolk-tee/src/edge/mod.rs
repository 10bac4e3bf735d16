//! Boundary crossing
//!
//! The host lays out a [`CallRecord`] and its argument buffers in an
//! [`UntrustedRegion`]; the enclave copies the record in, re-validates every
//! span, dispatches through the fixed call table and copies results back.

mod crossing;
mod record;
mod region;
pub(crate) mod table;

pub(crate) use crossing::Crossing;
pub use record::{CallRecord, Request, OUTPUT_COUNT, RECORD_SIZE, SLOT_COUNT};
pub use region::{Span, UntrustedRegion, REGION_ALIGN, REGION_GUARD};
