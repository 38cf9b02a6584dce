//! Shift and rotate instructions.
//!
//! Encoding (register only):
//! ```text
//! 10 [s r]  SHLL/SHAL    s: 0/1/3 = .B/.W/.L by 1, 4/5/7 by 2 (H8S)
//! 11 [s r]  SHLR/SHAR       8/9/B = arithmetic by 1, C/D/F by 2
//! 12 [s r]  ROTXL/ROTL      (rotate-through-carry in the low half,
//! 13 [s r]  ROTXR/ROTR       plain rotate in the high half)
//! ```

use crate::alu::Size;
use crate::flags::Ccr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Shal,
    Shar,
    Shll,
    Shlr,
    Rotl,
    Rotr,
    Rotxl,
    Rotxr,
}

impl ShiftOp {
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Shal => "shal",
            Self::Shar => "shar",
            Self::Shll => "shll",
            Self::Shlr => "shlr",
            Self::Rotl => "rotl",
            Self::Rotr => "rotr",
            Self::Rotxl => "rotxl",
            Self::Rotxr => "rotxr",
        }
    }
}

/// Shift `value` by `count` (1 or 2) and update flags.
///
/// C is the last bit shifted out. V is set by SHAL when the sign bit
/// changed at any step, and cleared by every other operation.
pub fn shift(ccr: &mut Ccr, size: Size, op: ShiftOp, value: u32, count: u8) -> u32 {
    let mask = size.mask();
    let msb = size.msb();
    let mut v = value & mask;
    let mut overflow = false;

    for _ in 0..count {
        let top = v & msb != 0;
        let bottom = v & 1 != 0;
        v = match op {
            ShiftOp::Shal | ShiftOp::Shll => {
                ccr.c = top;
                (v << 1) & mask
            }
            ShiftOp::Shar => {
                ccr.c = bottom;
                (v >> 1) | (v & msb)
            }
            ShiftOp::Shlr => {
                ccr.c = bottom;
                v >> 1
            }
            ShiftOp::Rotl => {
                ccr.c = top;
                ((v << 1) & mask) | u32::from(top)
            }
            ShiftOp::Rotr => {
                ccr.c = bottom;
                (v >> 1) | if bottom { msb } else { 0 }
            }
            ShiftOp::Rotxl => {
                let carry_in = u32::from(ccr.c);
                ccr.c = top;
                ((v << 1) & mask) | carry_in
            }
            ShiftOp::Rotxr => {
                let carry_in = if ccr.c { msb } else { 0 };
                ccr.c = bottom;
                (v >> 1) | carry_in
            }
        };
        if op == ShiftOp::Shal && (v & msb != 0) != top {
            overflow = true;
        }
    }

    ccr.n = v & msb != 0;
    ccr.z = v == 0;
    ccr.v = overflow;
    v
}
