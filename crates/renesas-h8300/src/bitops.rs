//! Bit manipulation instructions.
//!
//! The operand is one byte: a byte register, `@ERd` or `@aa:8`. The outer
//! form is picked by the first opcode byte:
//!
//! ```text
//! 6x/7x [sel rd]              register form, inner pair at bytes 0-1
//! 7C/7D [erd 0] op [sel 0]    @ERd form, inner pair at bytes 2-3
//! 7E/7F aa      op [sel 0]    @aa:8 form, inner pair at bytes 2-3
//! ```
//!
//! `decode_bit_op` maps the inner `(op, sel)` pair to an operation for
//! all three forms. 7C/7E only carry the read-only operations, 7D/7F only
//! the read-modify-write ones.

use crate::flags::Ccr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Set,
    Clear,
    Not,
    Test,
    And,
    Iand,
    Or,
    Ior,
    Xor,
    Ixor,
    Ld,
    Ild,
    St,
    Ist,
}

impl BitOp {
    /// True if the operation writes the operand back.
    #[must_use]
    pub const fn writes(self) -> bool {
        matches!(self, Self::Set | Self::Clear | Self::Not | Self::St | Self::Ist)
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Set => "bset",
            Self::Clear => "bclr",
            Self::Not => "bnot",
            Self::Test => "btst",
            Self::And => "band",
            Self::Iand => "biand",
            Self::Or => "bor",
            Self::Ior => "bior",
            Self::Xor => "bxor",
            Self::Ixor => "bixor",
            Self::Ld => "bld",
            Self::Ild => "bild",
            Self::St => "bst",
            Self::Ist => "bist",
        }
    }
}

/// Bit number source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitIndex {
    /// Immediate bit number 0-7.
    Imm(u8),
    /// Low 3 bits of a byte register.
    Reg(u8),
}

/// Second-stage decode shared by every outer form.
///
/// `sel` is the high nibble of the selector byte. Returns `None` for
/// combinations that are not instructions.
#[must_use]
pub fn decode_bit_op(op: u8, sel: u8) -> Option<(BitOp, BitIndex)> {
    let imm = BitIndex::Imm(sel & 7);
    let inverted = sel & 8 != 0;
    let pick = |plain, inv| if inverted { inv } else { plain };
    Some(match op {
        0x60 => (BitOp::Set, BitIndex::Reg(sel)),
        0x61 => (BitOp::Not, BitIndex::Reg(sel)),
        0x62 => (BitOp::Clear, BitIndex::Reg(sel)),
        0x63 => (BitOp::Test, BitIndex::Reg(sel)),
        0x67 => (pick(BitOp::St, BitOp::Ist), imm),
        0x70..=0x73 if inverted => return None,
        0x70 => (BitOp::Set, imm),
        0x71 => (BitOp::Not, imm),
        0x72 => (BitOp::Clear, imm),
        0x73 => (BitOp::Test, imm),
        0x74 => (pick(BitOp::Or, BitOp::Ior), imm),
        0x75 => (pick(BitOp::Xor, BitOp::Ixor), imm),
        0x76 => (pick(BitOp::And, BitOp::Iand), imm),
        0x77 => (pick(BitOp::Ld, BitOp::Ild), imm),
        _ => return None,
    })
}

/// Execute `op` on bit `bit` of `value`. Returns the new byte for
/// operations that write back.
pub fn apply(ccr: &mut Ccr, op: BitOp, bit: u8, value: u8) -> Option<u8> {
    let mask = 1u8 << (bit & 7);
    let set = value & mask != 0;
    match op {
        BitOp::Set => return Some(value | mask),
        BitOp::Clear => return Some(value & !mask),
        BitOp::Not => return Some(value ^ mask),
        BitOp::Test => ccr.z = !set,
        BitOp::And => ccr.c &= set,
        BitOp::Iand => ccr.c &= !set,
        BitOp::Or => ccr.c |= set,
        BitOp::Ior => ccr.c |= !set,
        BitOp::Xor => ccr.c ^= set,
        BitOp::Ixor => ccr.c ^= !set,
        BitOp::Ld => ccr.c = set,
        BitOp::Ild => ccr.c = !set,
        BitOp::St => {
            return Some(if ccr.c { value | mask } else { value & !mask });
        }
        BitOp::Ist => {
            return Some(if ccr.c { value & !mask } else { value | mask });
        }
    }
    None
}
