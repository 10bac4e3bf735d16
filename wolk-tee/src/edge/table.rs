//! Fixed call table
//!
//! Entry `n` handles opcode `n`. Each handler copies its inputs in, checks
//! every output span before running the service, and copies results out only
//! after the service succeeded.

use zeroize::Zeroizing;

use super::crossing::Crossing;
use super::record::{OUTPUT_COUNT, SLOT_COUNT};
use super::region::Span;
use crate::error::{TeeError, TeeResult};
use crate::opcode::Opcode;
use crate::service::EnclaveService;

pub(crate) type EcallFn =
    fn(&EnclaveService<'_>, &mut Crossing<'_>, &[Span; SLOT_COUNT]) -> TeeResult<[u64; OUTPUT_COUNT]>;

pub(crate) struct EcallEntry {
    pub(crate) opcode: Opcode,
    /// Slots the handler reads; the rest must be empty
    pub(crate) arity: usize,
    pub(crate) handler: EcallFn,
}

pub(crate) static ECALL_TABLE: [EcallEntry; Opcode::COUNT] = [
    EcallEntry {
        opcode: Opcode::Seal,
        arity: 2,
        handler: ecall_seal,
    },
    EcallEntry {
        opcode: Opcode::Unseal,
        arity: 2,
        handler: ecall_unseal,
    },
    EcallEntry {
        opcode: Opcode::Digest,
        arity: 2,
        handler: ecall_digest,
    },
    EcallEntry {
        opcode: Opcode::GenerateKeyPair,
        arity: 2,
        handler: ecall_generate_keypair,
    },
    EcallEntry {
        opcode: Opcode::Sign,
        arity: 3,
        handler: ecall_sign,
    },
    EcallEntry {
        opcode: Opcode::Verify,
        arity: 3,
        handler: ecall_verify,
    },
];

/// Looks up an opcode. Anything past the end of the table fails closed.
pub(crate) fn lookup(opcode: u32) -> TeeResult<&'static EcallEntry> {
    usize::try_from(opcode)
        .ok()
        .and_then(|index| ECALL_TABLE.get(index))
        .ok_or(TeeError::UnknownOperation(opcode))
}

/// Trusted output buffer sized to the caller's declared capacity
fn scratch(capacity: usize) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(vec![0u8; capacity])
}

fn ecall_seal(
    service: &EnclaveService<'_>,
    crossing: &mut Crossing<'_>,
    slots: &[Span; SLOT_COUNT],
) -> TeeResult<[u64; OUTPUT_COUNT]> {
    let [plaintext, sealed, ..] = *slots;
    let plaintext = crossing.copy_in(plaintext)?;
    let mut out = scratch(crossing.check_out(sealed)?);

    let written = service.seal(&plaintext, &mut out)?;
    crossing.copy_out(sealed, &out[..written])?;
    Ok([written as u64, 0])
}

fn ecall_unseal(
    service: &EnclaveService<'_>,
    crossing: &mut Crossing<'_>,
    slots: &[Span; SLOT_COUNT],
) -> TeeResult<[u64; OUTPUT_COUNT]> {
    let [sealed, plaintext, ..] = *slots;
    let blob = crossing.copy_in(sealed)?;
    let mut out = scratch(crossing.check_out(plaintext)?);

    let written = service.unseal(&blob, &mut out)?;
    crossing.copy_out(plaintext, &out[..written])?;
    Ok([written as u64, 0])
}

fn ecall_digest(
    service: &EnclaveService<'_>,
    crossing: &mut Crossing<'_>,
    slots: &[Span; SLOT_COUNT],
) -> TeeResult<[u64; OUTPUT_COUNT]> {
    let [input, digest, ..] = *slots;
    let input = crossing.copy_in(input)?;
    let mut out = scratch(crossing.check_out(digest)?);

    let written = service.digest(&input, &mut out)?;
    crossing.copy_out(digest, &out[..written])?;
    Ok([written as u64, 0])
}

fn ecall_generate_keypair(
    service: &EnclaveService<'_>,
    crossing: &mut Crossing<'_>,
    slots: &[Span; SLOT_COUNT],
) -> TeeResult<[u64; OUTPUT_COUNT]> {
    let [private_key, public_key, ..] = *slots;
    if private_key.overlaps(&public_key) {
        return Err(TeeError::ContractViolation("output spans overlap"));
    }
    let mut private_out = scratch(crossing.check_out(private_key)?);
    let mut public_out = scratch(crossing.check_out(public_key)?);

    let (private_len, public_len) = service.generate_keypair(&mut private_out, &mut public_out)?;
    crossing.copy_out(private_key, &private_out[..private_len])?;
    crossing.copy_out(public_key, &public_out[..public_len])?;
    Ok([private_len as u64, public_len as u64])
}

fn ecall_sign(
    service: &EnclaveService<'_>,
    crossing: &mut Crossing<'_>,
    slots: &[Span; SLOT_COUNT],
) -> TeeResult<[u64; OUTPUT_COUNT]> {
    let [message, private_key, signature, ..] = *slots;
    let message = crossing.copy_in(message)?;
    let private_key = crossing.copy_in(private_key)?;
    let mut out = scratch(crossing.check_out(signature)?);

    let written = service.sign(&message, &private_key, &mut out)?;
    crossing.copy_out(signature, &out[..written])?;
    Ok([written as u64, 0])
}

fn ecall_verify(
    service: &EnclaveService<'_>,
    crossing: &mut Crossing<'_>,
    slots: &[Span; SLOT_COUNT],
) -> TeeResult<[u64; OUTPUT_COUNT]> {
    let [message, public_key, signature, ..] = *slots;
    let message = crossing.copy_in(message)?;
    let public_key = crossing.copy_in(public_key)?;
    let signature = crossing.copy_in(signature)?;

    service.verify(&message, &public_key, &signature)?;
    Ok([0, 0])
}
