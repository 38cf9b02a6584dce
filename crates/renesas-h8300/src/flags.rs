//! H8 condition code register (CCR) and extended control register (EXR).
//!
//! CCR is 8 bits:
//! - C (bit 0): Carry
//! - V (bit 1): Overflow
//! - Z (bit 2): Zero
//! - N (bit 3): Negative
//! - U (bit 4): User bit
//! - H (bit 5): Half-carry
//! - UI (bit 6): User bit / interrupt mask
//! - I (bit 7): Interrupt mask
//!
//! EXR (H8S only) is 8 bits:
//! - I2-I0 (bits 0-2): Interrupt mask level
//! - Bits 3-6: Reserved (always read as 1)
//! - T (bit 7): Trace

/// Carry flag.
pub const C: u8 = 0x01;
/// Overflow flag.
pub const V: u8 = 0x02;
/// Zero flag.
pub const Z: u8 = 0x04;
/// Negative flag.
pub const N: u8 = 0x08;
/// User bit.
pub const U: u8 = 0x10;
/// Half-carry flag.
pub const H: u8 = 0x20;
/// User bit / secondary interrupt mask.
pub const UI: u8 = 0x40;
/// Interrupt mask.
pub const I: u8 = 0x80;

/// EXR trace bit.
pub const EXR_T: u8 = 0x80;
/// EXR interrupt mask field.
pub const EXR_I_MASK: u8 = 0x07;
/// EXR bits that always read as 1.
pub const EXR_RESERVED: u8 = 0x78;

/// Decomposed condition code register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Ccr {
    pub c: bool,
    pub v: bool,
    pub z: bool,
    pub n: bool,
    pub u: bool,
    pub h: bool,
    pub ui: bool,
    pub i: bool,
}

impl Ccr {
    /// Unpack a CCR byte.
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self {
            c: value & C != 0,
            v: value & V != 0,
            z: value & Z != 0,
            n: value & N != 0,
            u: value & U != 0,
            h: value & H != 0,
            ui: value & UI != 0,
            i: value & I != 0,
        }
    }

    /// Pack into a CCR byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let mut value = 0;
        if self.c {
            value |= C;
        }
        if self.v {
            value |= V;
        }
        if self.z {
            value |= Z;
        }
        if self.n {
            value |= N;
        }
        if self.u {
            value |= U;
        }
        if self.h {
            value |= H;
        }
        if self.ui {
            value |= UI;
        }
        if self.i {
            value |= I;
        }
        value
    }

    /// Set N and Z from a result of `msb` width, clear V.
    pub fn set_logic(&mut self, result: u32, msb: u32) {
        self.n = result & msb != 0;
        self.z = result & (msb | (msb - 1)) == 0;
        self.v = false;
    }
}

/// Extended control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exr {
    /// Trace bit.
    pub t: bool,
    /// Interrupt mask level 0-7.
    pub i: u8,
}

impl Default for Exr {
    fn default() -> Self {
        Self::from_byte(0x7F)
    }
}

impl Exr {
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self {
            t: value & EXR_T != 0,
            i: value & EXR_I_MASK,
        }
    }

    /// Pack into a byte. Reserved bits read as 1.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let t = if self.t { EXR_T } else { 0 };
        t | EXR_RESERVED | (self.i & EXR_I_MASK)
    }
}

/// Evaluate a Bcc condition code (0-15) against the flags.
#[must_use]
pub fn condition(ccr: &Ccr, cc: u8) -> bool {
    match cc & 0x0F {
        0x0 => true,                          // BRA (BT)
        0x1 => false,                         // BRN (BF)
        0x2 => !(ccr.c || ccr.z),             // BHI
        0x3 => ccr.c || ccr.z,                // BLS
        0x4 => !ccr.c,                        // BCC (BHS)
        0x5 => ccr.c,                         // BCS (BLO)
        0x6 => !ccr.z,                        // BNE
        0x7 => ccr.z,                         // BEQ
        0x8 => !ccr.v,                        // BVC
        0x9 => ccr.v,                         // BVS
        0xA => !ccr.n,                        // BPL
        0xB => ccr.n,                         // BMI
        0xC => ccr.n == ccr.v,                // BGE
        0xD => ccr.n != ccr.v,                // BLT
        0xE => !ccr.z && ccr.n == ccr.v,      // BGT
        _ => ccr.z || ccr.n != ccr.v,         // BLE
    }
}
