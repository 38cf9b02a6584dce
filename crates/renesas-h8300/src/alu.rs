//! Arithmetic and logic with H8 condition code side effects.
//!
//! Every function here takes already-fetched operand values and the
//! flags to update. Operand fetch and write-back live in `execute`.

use tracing::warn;

use crate::flags::Ccr;

/// Operation size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Long => 0xFFFF_FFFF,
        }
    }

    #[must_use]
    pub const fn msb(self) -> u32 {
        match self {
            Self::Byte => 0x80,
            Self::Word => 0x8000,
            Self::Long => 0x8000_0000,
        }
    }

    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
        }
    }

    /// Bits below the half-carry position (bit 3, 11 or 27).
    const fn half_mask(self) -> u32 {
        match self {
            Self::Byte => 0x0F,
            Self::Word => 0x0FFF,
            Self::Long => 0x0FFF_FFFF,
        }
    }

    /// Assembler suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Byte => "b",
            Self::Word => "w",
            Self::Long => "l",
        }
    }
}

// ============================================================================
// Add / subtract
// ============================================================================

struct Sum {
    result: u32,
    carry: bool,
    overflow: bool,
    half: bool,
}

fn add_core(size: Size, a: u32, b: u32, carry_in: bool) -> Sum {
    let mask = size.mask();
    let (a, b, cin) = (a & mask, b & mask, u32::from(carry_in));
    let wide = u64::from(a) + u64::from(b) + u64::from(cin);
    let result = (wide as u32) & mask;
    let hm = size.half_mask();
    Sum {
        result,
        carry: wide > u64::from(mask),
        overflow: (!(a ^ b) & (a ^ result) & size.msb()) != 0,
        half: (a & hm) + (b & hm) + cin > hm,
    }
}

fn sub_core(size: Size, a: u32, b: u32, borrow_in: bool) -> Sum {
    let mask = size.mask();
    let (a, b, bin) = (a & mask, b & mask, u32::from(borrow_in));
    let result = a.wrapping_sub(b).wrapping_sub(bin) & mask;
    let hm = size.half_mask();
    Sum {
        result,
        carry: u64::from(b) + u64::from(bin) > u64::from(a),
        overflow: ((a ^ b) & (a ^ result) & size.msb()) != 0,
        half: (b & hm) + bin > (a & hm),
    }
}

fn apply(ccr: &mut Ccr, size: Size, sum: &Sum) {
    ccr.c = sum.carry;
    ccr.v = sum.overflow;
    ccr.h = sum.half;
    ccr.n = sum.result & size.msb() != 0;
    ccr.z = sum.result == 0;
}

/// ADD: `a + b`.
pub fn add(ccr: &mut Ccr, size: Size, a: u32, b: u32) -> u32 {
    let sum = add_core(size, a, b, false);
    apply(ccr, size, &sum);
    sum.result
}

/// ADDX: `a + b + C`. Z is only ever cleared.
pub fn addx(ccr: &mut Ccr, size: Size, a: u32, b: u32) -> u32 {
    let z = ccr.z;
    let sum = add_core(size, a, b, ccr.c);
    apply(ccr, size, &sum);
    ccr.z = z && sum.result == 0;
    sum.result
}

/// SUB and CMP: `a - b`.
pub fn sub(ccr: &mut Ccr, size: Size, a: u32, b: u32) -> u32 {
    let diff = sub_core(size, a, b, false);
    apply(ccr, size, &diff);
    diff.result
}

/// SUBX: `a - b - C`. Z is only ever cleared.
pub fn subx(ccr: &mut Ccr, size: Size, a: u32, b: u32) -> u32 {
    let z = ccr.z;
    let diff = sub_core(size, a, b, ccr.c);
    apply(ccr, size, &diff);
    ccr.z = z && diff.result == 0;
    diff.result
}

/// NEG: `0 - a`.
pub fn neg(ccr: &mut Ccr, size: Size, a: u32) -> u32 {
    sub(ccr, size, 0, a)
}

/// INC: like ADD but C and H are left alone.
pub fn inc(ccr: &mut Ccr, size: Size, a: u32, amount: u32) -> u32 {
    let sum = add_core(size, a, amount, false);
    ccr.v = sum.overflow;
    ccr.n = sum.result & size.msb() != 0;
    ccr.z = sum.result == 0;
    sum.result
}

/// DEC: like SUB but C and H are left alone.
pub fn dec(ccr: &mut Ccr, size: Size, a: u32, amount: u32) -> u32 {
    let diff = sub_core(size, a, amount, false);
    ccr.v = diff.overflow;
    ccr.n = diff.result & size.msb() != 0;
    ccr.z = diff.result == 0;
    diff.result
}

/// Logical operation selector for AND/OR/XOR and the CCR/EXR forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

impl LogicOp {
    #[must_use]
    pub const fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            Self::And => a & b,
            Self::Or => a | b,
            Self::Xor => a ^ b,
        }
    }
}

/// AND/OR/XOR: N and Z from the result, V cleared.
pub fn logic(ccr: &mut Ccr, size: Size, op: LogicOp, a: u32, b: u32) -> u32 {
    let result = op.apply(a, b) & size.mask();
    ccr.set_logic(result, size.msb());
    result
}

// ============================================================================
// Decimal adjust
//
// Each row matches on (C, upper nibble range, H, lower nibble range) and
// gives the correction to add and the new carry.
// ============================================================================

/// One row of a decimal-adjust table.
#[derive(Debug, Clone, Copy)]
pub struct BcdRow {
    pub carry: bool,
    pub upper: (u8, u8),
    pub half: bool,
    pub lower: (u8, u8),
    pub correction: u8,
    pub carry_out: bool,
}

impl BcdRow {
    const fn new(
        carry: bool,
        upper: (u8, u8),
        half: bool,
        lower: (u8, u8),
        correction: u8,
        carry_out: bool,
    ) -> Self {
        Self {
            carry,
            upper,
            half,
            lower,
            correction,
            carry_out,
        }
    }

    #[must_use]
    pub fn matches(&self, carry: bool, half: bool, value: u8) -> bool {
        let (hi, lo) = (value >> 4, value & 0x0F);
        self.carry == carry
            && self.half == half
            && (self.upper.0..=self.upper.1).contains(&hi)
            && (self.lower.0..=self.lower.1).contains(&lo)
    }
}

/// Rows follow the DAA table in the H8/300H programming manual. The C=1
/// rows bound the upper nibble to 0-2 (0-3 with H=1); inputs above that
/// cannot come from adding two BCD bytes and take the invalid path.
pub const DAA_TABLE: [BcdRow; 8] = [
    BcdRow::new(false, (0, 9), false, (0, 9), 0x00, false),
    BcdRow::new(false, (0, 8), false, (10, 15), 0x06, false),
    BcdRow::new(false, (0, 9), true, (0, 3), 0x06, false),
    BcdRow::new(false, (10, 15), false, (0, 9), 0x60, true),
    BcdRow::new(false, (9, 15), false, (10, 15), 0x66, true),
    BcdRow::new(true, (0, 2), false, (0, 9), 0x60, true),
    BcdRow::new(true, (0, 2), false, (10, 15), 0x66, true),
    BcdRow::new(true, (0, 3), true, (0, 3), 0x66, true),
];

pub const DAS_TABLE: [BcdRow; 4] = [
    BcdRow::new(false, (0, 9), false, (0, 9), 0x00, false),
    BcdRow::new(false, (0, 8), true, (6, 15), 0xFA, false),
    BcdRow::new(true, (7, 15), false, (0, 9), 0xA0, true),
    BcdRow::new(true, (6, 15), true, (6, 15), 0x9A, true),
];

fn decimal_adjust(ccr: &mut Ccr, table: &[BcdRow], value: u8, name: &str) -> u8 {
    let Some(row) = table.iter().find(|row| row.matches(ccr.c, ccr.h, value)) else {
        warn!(target: "guest", "invalid {name} value {value:#04x}");
        return value;
    };
    let result = value.wrapping_add(row.correction);
    ccr.c = row.carry_out;
    ccr.n = result & 0x80 != 0;
    ccr.z = result == 0;
    result
}

/// DAA: decimal adjust after addition.
pub fn daa(ccr: &mut Ccr, value: u8) -> u8 {
    decimal_adjust(ccr, &DAA_TABLE, value, "DAA")
}

/// DAS: decimal adjust after subtraction.
pub fn das(ccr: &mut Ccr, value: u8) -> u8 {
    decimal_adjust(ccr, &DAS_TABLE, value, "DAS")
}

// ============================================================================
// Multiply / divide
//
// `size` is the source operand size (Byte: 8x8->16 and 16/8,
// Word: 16x16->32 and 32/16).
// ============================================================================

/// MULXU: unsigned multiply, no flags.
#[must_use]
pub fn mulxu(size: Size, rd: u32, rs: u32) -> u32 {
    let m = size.mask();
    (rd & m) * (rs & m)
}

/// MULXS: signed multiply, N and Z from the product.
pub fn mulxs(ccr: &mut Ccr, size: Size, rd: u32, rs: u32) -> u32 {
    let (product, msb) = match size {
        Size::Byte => {
            let p = i32::from(rd as u8 as i8) * i32::from(rs as u8 as i8);
            ((p as u32) & 0xFFFF, 0x8000)
        }
        _ => {
            let p = i64::from(rd as u16 as i16) * i64::from(rs as u16 as i16);
            (p as u32, 0x8000_0000)
        }
    };
    ccr.n = product & msb != 0;
    ccr.z = product == 0;
    product
}

fn pack_quotient(size: Size, quotient: u32, remainder: u32) -> u32 {
    match size {
        Size::Byte => ((remainder & 0xFF) << 8) | (quotient & 0xFF),
        _ => ((remainder & 0xFFFF) << 16) | (quotient & 0xFFFF),
    }
}

/// DIVXU: unsigned divide. Quotient in the low half, remainder in the
/// high half. A zero divisor leaves the dividend as quotient.
pub fn divxu(ccr: &mut Ccr, size: Size, dividend: u32, divisor: u32) -> u32 {
    let divisor = divisor & size.mask();
    let dividend = match size {
        Size::Byte => dividend & 0xFFFF,
        _ => dividend,
    };
    ccr.n = divisor & size.msb() != 0;
    ccr.z = divisor == 0;
    if divisor == 0 {
        return pack_quotient(size, dividend, 0);
    }
    pack_quotient(size, dividend / divisor, dividend % divisor)
}

/// DIVXS: signed divide. A zero divisor or MIN / -1 leaves the dividend
/// as quotient.
pub fn divxs(ccr: &mut Ccr, size: Size, dividend: u32, divisor: u32) -> u32 {
    let (n, d, min) = match size {
        Size::Byte => (
            i32::from(dividend as u16 as i16),
            i32::from(divisor as u8 as i8),
            i32::from(i16::MIN),
        ),
        _ => (dividend as i32, i32::from(divisor as u16 as i16), i32::MIN),
    };
    ccr.z = d == 0;
    let (q, r) = if d == 0 || (n == min && d == -1) {
        (n, 0)
    } else {
        (n / d, n % d)
    };
    let half_msb = match size {
        Size::Byte => 0x80,
        _ => 0x8000,
    };
    ccr.n = (q as u32) & half_msb != 0;
    pack_quotient(size, q as u32, r as u32)
}

/// EXTU: zero-extend the low half. N cleared, Z from result, V cleared.
pub fn extu(ccr: &mut Ccr, size: Size, value: u32) -> u32 {
    let result = match size {
        Size::Long => value & 0xFFFF,
        _ => value & 0xFF,
    };
    ccr.set_logic(result, size.msb());
    result
}

/// EXTS: sign-extend the low half. N and Z from result, V cleared.
pub fn exts(ccr: &mut Ccr, size: Size, value: u32) -> u32 {
    let result = match size {
        Size::Long => value as u16 as i16 as i32 as u32,
        _ => u32::from(value as u8 as i8 as i16 as u16),
    };
    ccr.set_logic(result, size.msb());
    result
}
