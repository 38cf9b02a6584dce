//! H8/300H and H8S CPU registers.
//!
//! - ER0-ER7: 8 general registers (32-bit, ER7 is the stack pointer)
//! - E0-E7 / R0-R7: upper and lower 16-bit halves
//! - R0H-R7H / R0L-R7L: upper and lower bytes of R0-R7
//! - PC: Program counter (24-bit)
//! - CCR: Condition code register
//! - EXR: Extended control register (H8S)
//!
//! Register fields in opcodes are 4 bits. For byte operands 0-7 select
//! RnH and 8-15 select RnL. For word operands 0-7 select Rn and 8-15
//! select En. For long operands only the low 3 bits matter.

use crate::flags::{Ccr, Exr};

/// Stack pointer index.
pub const SP: usize = 7;

/// Mask applied to every address and to the PC.
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// H8 CPU register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// General registers ER0-ER7.
    pub er: [u32; 8],
    /// Program counter.
    pub pc: u32,
    /// Condition code register.
    pub ccr: Ccr,
    /// Extended control register (ignored on the H8/300H).
    pub exr: Exr,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Create registers in reset state: interrupts masked, EXR level 7.
    #[must_use]
    pub fn new() -> Self {
        Self {
            er: [0; 8],
            pc: 0,
            ccr: Ccr::from_byte(0x80),
            exr: Exr::from_byte(0x7F),
        }
    }

    /// Read a byte register (0-7 RnH, 8-15 RnL).
    #[must_use]
    pub fn r8(&self, field: u8) -> u8 {
        let er = self.er[usize::from(field & 7)];
        if field & 8 == 0 { (er >> 8) as u8 } else { er as u8 }
    }

    pub fn set_r8(&mut self, field: u8, value: u8) {
        let er = &mut self.er[usize::from(field & 7)];
        if field & 8 == 0 {
            *er = (*er & !0xFF00) | (u32::from(value) << 8);
        } else {
            *er = (*er & !0x00FF) | u32::from(value);
        }
    }

    /// Read a word register (0-7 Rn, 8-15 En).
    #[must_use]
    pub fn r16(&self, field: u8) -> u16 {
        let er = self.er[usize::from(field & 7)];
        if field & 8 == 0 { er as u16 } else { (er >> 16) as u16 }
    }

    pub fn set_r16(&mut self, field: u8, value: u16) {
        let er = &mut self.er[usize::from(field & 7)];
        if field & 8 == 0 {
            *er = (*er & 0xFFFF_0000) | u32::from(value);
        } else {
            *er = (*er & 0x0000_FFFF) | (u32::from(value) << 16);
        }
    }

    #[must_use]
    pub fn r32(&self, field: u8) -> u32 {
        self.er[usize::from(field & 7)]
    }

    pub fn set_r32(&mut self, field: u8, value: u32) {
        self.er[usize::from(field & 7)] = value;
    }

    #[must_use]
    pub fn sp(&self) -> u32 {
        self.er[SP]
    }

    pub fn set_sp(&mut self, value: u32) {
        self.er[SP] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_fields_select_high_then_low() {
        let mut regs = Registers::new();
        regs.er[0] = 0x1234_5678;
        assert_eq!(regs.r8(0), 0x56); // R0H
        assert_eq!(regs.r8(8), 0x78); // R0L
        regs.set_r8(8, 0x12);
        assert_eq!(regs.er[0], 0x1234_5612);
        regs.set_r8(0, 0xAB);
        assert_eq!(regs.er[0], 0x1234_AB12);
    }

    #[test]
    fn word_fields_select_low_then_extended() {
        let mut regs = Registers::new();
        regs.er[3] = 0xAAAA_BBBB;
        assert_eq!(regs.r16(3), 0xBBBB); // R3
        assert_eq!(regs.r16(11), 0xAAAA); // E3
        regs.set_r16(11, 0x1111);
        assert_eq!(regs.er[3], 0x1111_BBBB);
    }

    #[test]
    fn long_field_ignores_top_bit() {
        let mut regs = Registers::new();
        regs.set_r32(0xF, 0xDEAD_BEEF);
        assert_eq!(regs.sp(), 0xDEAD_BEEF);
    }
}
