//! Stable operation identifiers
//!
//! Opcodes index the call table directly. New operations are appended;
//! renumbering an existing one breaks every host built against the old table.

use std::fmt;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Seal = 0,
    Unseal = 1,
    Digest = 2,
    GenerateKeyPair = 3,
    Sign = 4,
    Verify = 5,
}

impl Opcode {
    /// Number of registered operations
    pub const COUNT: usize = 6;

    /// All operations in table order
    pub const ALL: [Opcode; Opcode::COUNT] = [
        Opcode::Seal,
        Opcode::Unseal,
        Opcode::Digest,
        Opcode::GenerateKeyPair,
        Opcode::Sign,
        Opcode::Verify,
    ];

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Seal => "seal",
            Opcode::Unseal => "unseal",
            Opcode::Digest => "digest",
            Opcode::GenerateKeyPair => "generate_keypair",
            Opcode::Sign => "sign",
            Opcode::Verify => "verify",
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(value as usize)
            .copied()
            .ok_or(value)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes_are_dense_and_stable() {
        for (index, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(opcode.as_u32() as usize, index);
            assert_eq!(Opcode::try_from(index as u32), Ok(*opcode));
        }

        assert_eq!(Opcode::Seal.as_u32(), 0);
        assert_eq!(Opcode::Unseal.as_u32(), 1);
        assert_eq!(Opcode::Digest.as_u32(), 2);
        assert_eq!(Opcode::GenerateKeyPair.as_u32(), 3);
        assert_eq!(Opcode::Sign.as_u32(), 4);
        assert_eq!(Opcode::Verify.as_u32(), 5);
    }

    #[test]
    fn test_out_of_range_opcode() {
        assert_eq!(Opcode::try_from(6), Err(6));
        assert_eq!(Opcode::try_from(u32::MAX), Err(u32::MAX));
    }
}
