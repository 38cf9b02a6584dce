//! Instruction decoder.
//!
//! Turns the byte stream at an address into an [`Instruction`] and its
//! length. Bytes are pulled lazily from the fetch callback into a window
//! of at most 10 bytes, so later fields can be read only once earlier
//! ones have picked the pattern.
//!
//! All addresses are advanced-mode 24-bit: `@aa:8` maps into
//! `0xFFFF00-0xFFFFFF`, `@aa:16` is sign-extended, `d:24` is sign-extended
//! from bit 23.

use thiserror::Error;

use crate::alu::{LogicOp, Size};
use crate::bitops::{BitIndex, BitOp, decode_bit_op};
use crate::model::CpuModel;
use crate::registers::ADDRESS_MASK;
use crate::shifts::ShiftOp;

/// Longest encoding (MOV.L / LDC with `@(d:24,ERn)`).
pub const MAX_INSTRUCTION_LEN: usize = 10;

/// Decoder failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("illegal instruction at {address:#08x} (bytes {bytes:02x?})")]
    Illegal { address: u32, bytes: Vec<u8> },
    #[error("instruction at {address:#08x} requires the H8S (bytes {bytes:02x?})")]
    RequiresH8s { address: u32, bytes: Vec<u8> },
}

impl DecodeError {
    /// Address of the first byte of the faulting instruction.
    #[must_use]
    pub fn address(&self) -> u32 {
        match self {
            Self::Illegal { address, .. } | Self::RequiresH8s { address, .. } => *address,
        }
    }
}

/// Data operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// `#imm`
    Imm(u32),
    /// `Rn` (register field interpreted by operand size)
    Reg(u8),
    /// `@ERn`
    Indirect(u8),
    /// `@ERn+`
    PostInc(u8),
    /// `@-ERn`
    PreDec(u8),
    /// `@(d,ERn)`
    Disp { er: u8, disp: i32 },
    /// `@aa` (already normalised to 24 bits)
    Abs(u32),
}

/// Two-operand arithmetic and logic with a register destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Addx,
    Sub,
    Subx,
    Cmp,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Extu,
    Exts,
}

/// Control register targeted by LDC/STC/ANDC/ORC/XORC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReg {
    Ccr,
    Exr,
}

/// Byte operand of a bit-manipulation instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitTarget {
    Reg(u8),
    Indirect(u8),
    Abs(u32),
}

/// JMP/JSR destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    /// `@ERn`
    Reg(u8),
    /// `@aa:24`
    Abs(u32),
    /// `@@aa:8`: target is the long stored at `aa`.
    MemIndirect(u32),
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Sleep,
    Mov { size: Size, src: Operand, dst: Operand },
    Movfpe { addr: u32, rd: u8 },
    Movtpe { rs: u8, addr: u32 },
    Alu { op: AluOp, size: Size, src: Operand, rd: u8 },
    Adds { amount: u8, rd: u8 },
    Subs { amount: u8, rd: u8 },
    Inc { size: Size, amount: u8, rd: u8 },
    Dec { size: Size, amount: u8, rd: u8 },
    Daa(u8),
    Das(u8),
    Mul { signed: bool, size: Size, rs: u8, rd: u8 },
    Div { signed: bool, size: Size, rs: u8, rd: u8 },
    Unary { op: UnaryOp, size: Size, rd: u8 },
    Shift { op: ShiftOp, size: Size, count: u8, rd: u8 },
    Bit { op: BitOp, index: BitIndex, target: BitTarget },
    Bcc { cond: u8, disp: i32 },
    Bsr { disp: i32 },
    Jmp(JumpTarget),
    Jsr(JumpTarget),
    Rts,
    Rte,
    Trapa(u8),
    Ldc { reg: ControlReg, src: Operand },
    Stc { reg: ControlReg, dst: Operand },
    ControlLogic { op: LogicOp, reg: ControlReg, imm: u8 },
    Eepmov(Size),
}

impl Instruction {
    /// True for encodings the H8/300H does not have.
    #[must_use]
    pub fn requires_h8s(&self) -> bool {
        match *self {
            Self::Ldc { reg, .. } | Self::Stc { reg, .. } | Self::ControlLogic { reg, .. } => {
                reg == ControlReg::Exr
            }
            Self::Shift { count, .. } => count == 2,
            _ => false,
        }
    }
}

/// Decoded instruction with its encoded length in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub insn: Instruction,
    pub len: u8,
}

/// Lazily filled view of the instruction bytes.
struct Window<F> {
    fetch: F,
    base: u32,
    bytes: [u8; MAX_INSTRUCTION_LEN],
    len: usize,
}

impl<F: FnMut(u32) -> u8> Window<F> {
    fn byte(&mut self, i: usize) -> u8 {
        debug_assert!(i < MAX_INSTRUCTION_LEN);
        while self.len <= i {
            let addr = self.base.wrapping_add(self.len as u32) & ADDRESS_MASK;
            self.bytes[self.len] = (self.fetch)(addr);
            self.len += 1;
        }
        self.bytes[i]
    }

    fn word(&mut self, i: usize) -> u16 {
        u16::from_be_bytes([self.byte(i), self.byte(i + 1)])
    }

    fn long(&mut self, i: usize) -> u32 {
        (u32::from(self.word(i)) << 16) | u32::from(self.word(i + 2))
    }

    fn seen(&self) -> Vec<u8> {
        self.bytes[..self.len].to_vec()
    }
}

fn abs8(aa: u8) -> u32 {
    0x00FF_FF00 | u32::from(aa)
}

fn abs16(aa: u16) -> u32 {
    (aa as i16 as i32 as u32) & ADDRESS_MASK
}

fn disp16(d: u16) -> i32 {
    i32::from(d as i16)
}

fn disp24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

/// Decode the instruction at `address` for `model`.
///
/// # Errors
///
/// Returns [`DecodeError`] if the bytes are not an instruction, or are an
/// H8S-only instruction on the H8/300H.
pub fn decode<F>(model: CpuModel, address: u32, fetch: F) -> Result<Decoded, DecodeError>
where
    F: FnMut(u32) -> u8,
{
    let mut w = Window {
        fetch,
        base: address & ADDRESS_MASK,
        bytes: [0; MAX_INSTRUCTION_LEN],
        len: 0,
    };
    let Some((insn, len)) = decode_window(&mut w) else {
        return Err(DecodeError::Illegal {
            address,
            bytes: w.seen(),
        });
    };
    if insn.requires_h8s() && !model.has_exr() {
        return Err(DecodeError::RequiresH8s {
            address,
            bytes: w.seen(),
        });
    }
    Ok(Decoded { insn, len })
}

#[allow(clippy::too_many_lines)]
fn decode_window<F: FnMut(u32) -> u8>(w: &mut Window<F>) -> Option<(Instruction, u8)> {
    use Instruction as I;

    let b0 = w.byte(0);
    let b1 = w.byte(1);
    let (hi, lo) = (b1 >> 4, b1 & 0x0F);
    // Long register pair [1ers][0erd] / [0ers][0erd].
    let long_pair = b1 & 0x88 == 0x80;

    Some(match b0 {
        0x00 if b1 == 0 => (I::Nop, 2),
        0x01 => return decode_prefixed(w, b1),
        0x02 | 0x03 => {
            let reg = match hi {
                0 => ControlReg::Ccr,
                1 => ControlReg::Exr,
                _ => return None,
            };
            if b0 == 0x02 {
                (I::Stc { reg, dst: Operand::Reg(lo) }, 2)
            } else {
                (I::Ldc { reg, src: Operand::Reg(lo) }, 2)
            }
        }
        0x04..=0x06 => {
            let op = [LogicOp::Or, LogicOp::Xor, LogicOp::And][usize::from(b0 - 4)];
            (I::ControlLogic { op, reg: ControlReg::Ccr, imm: b1 }, 2)
        }
        0x07 => (I::Ldc { reg: ControlReg::Ccr, src: Operand::Imm(u32::from(b1)) }, 2),
        0x08 => (alu(AluOp::Add, Size::Byte, hi, lo), 2),
        0x09 => (alu(AluOp::Add, Size::Word, hi, lo), 2),
        0x0A if hi == 0 => (I::Inc { size: Size::Byte, amount: 1, rd: lo }, 2),
        0x0A if long_pair => (alu(AluOp::Add, Size::Long, hi & 7, lo), 2),
        0x0B => (step_op(hi, lo, false)?, 2),
        0x0C => (mov_rr(Size::Byte, hi, lo), 2),
        0x0D => (mov_rr(Size::Word, hi, lo), 2),
        0x0E => (alu(AluOp::Addx, Size::Byte, hi, lo), 2),
        0x0F if hi == 0 => (I::Daa(lo), 2),
        0x0F if long_pair => (mov_rr(Size::Long, hi & 7, lo), 2),
        0x10..=0x13 => (shift_op(b0, hi, lo)?, 2),
        0x14 => (alu(AluOp::Or, Size::Byte, hi, lo), 2),
        0x15 => (alu(AluOp::Xor, Size::Byte, hi, lo), 2),
        0x16 => (alu(AluOp::And, Size::Byte, hi, lo), 2),
        0x17 => (unary_op(hi, lo)?, 2),
        0x18 => (alu(AluOp::Sub, Size::Byte, hi, lo), 2),
        0x19 => (alu(AluOp::Sub, Size::Word, hi, lo), 2),
        0x1A if hi == 0 => (I::Dec { size: Size::Byte, amount: 1, rd: lo }, 2),
        0x1A if long_pair => (alu(AluOp::Sub, Size::Long, hi & 7, lo), 2),
        0x1B => (step_op(hi, lo, true)?, 2),
        0x1C => (alu(AluOp::Cmp, Size::Byte, hi, lo), 2),
        0x1D => (alu(AluOp::Cmp, Size::Word, hi, lo), 2),
        0x1E => (alu(AluOp::Subx, Size::Byte, hi, lo), 2),
        0x1F if hi == 0 => (I::Das(lo), 2),
        0x1F if long_pair => (alu(AluOp::Cmp, Size::Long, hi & 7, lo), 2),
        0x20..=0x2F => (
            I::Mov { size: Size::Byte, src: Operand::Abs(abs8(b1)), dst: Operand::Reg(b0 & 0x0F) },
            2,
        ),
        0x30..=0x3F => (
            I::Mov { size: Size::Byte, src: Operand::Reg(b0 & 0x0F), dst: Operand::Abs(abs8(b1)) },
            2,
        ),
        0x40..=0x4F => (I::Bcc { cond: b0 & 0x0F, disp: i32::from(b1 as i8) }, 2),
        0x50 => (I::Mul { signed: false, size: Size::Byte, rs: hi, rd: lo }, 2),
        0x51 => (I::Div { signed: false, size: Size::Byte, rs: hi, rd: lo }, 2),
        0x52 if lo & 8 == 0 => (I::Mul { signed: false, size: Size::Word, rs: hi, rd: lo }, 2),
        0x53 if lo & 8 == 0 => (I::Div { signed: false, size: Size::Word, rs: hi, rd: lo }, 2),
        0x54 if b1 == 0x70 => (I::Rts, 2),
        0x55 => (I::Bsr { disp: i32::from(b1 as i8) }, 2),
        0x56 if b1 == 0x70 => (I::Rte, 2),
        0x57 if b1 & 0xCF == 0 => (I::Trapa(hi & 3), 2),
        0x58 if lo == 0 => (I::Bcc { cond: hi, disp: disp16(w.word(2)) }, 4),
        0x59 if b1 & 0x8F == 0 => (I::Jmp(JumpTarget::Reg(hi)), 2),
        0x5A => (I::Jmp(JumpTarget::Abs(w.long(0) & ADDRESS_MASK)), 4),
        0x5B => (I::Jmp(JumpTarget::MemIndirect(u32::from(b1))), 2),
        0x5C if b1 == 0 => (I::Bsr { disp: disp16(w.word(2)) }, 4),
        0x5D if b1 & 0x8F == 0 => (I::Jsr(JumpTarget::Reg(hi)), 2),
        0x5E => (I::Jsr(JumpTarget::Abs(w.long(0) & ADDRESS_MASK)), 4),
        0x5F => (I::Jsr(JumpTarget::MemIndirect(u32::from(b1))), 2),
        0x60..=0x63 | 0x67 | 0x70..=0x77 => {
            let (op, index) = decode_bit_op(b0, hi)?;
            (I::Bit { op, index, target: BitTarget::Reg(lo) }, 2)
        }
        0x64 => (alu(AluOp::Or, Size::Word, hi, lo), 2),
        0x65 => (alu(AluOp::Xor, Size::Word, hi, lo), 2),
        0x66 => (alu(AluOp::And, Size::Word, hi, lo), 2),
        0x68 | 0x69 => {
            let size = if b0 == 0x68 { Size::Byte } else { Size::Word };
            (mov_mem(size, b1, Operand::Indirect(hi & 7), Operand::Indirect(hi & 7)), 2)
        }
        0x6A | 0x6B => {
            let size = if b0 == 0x6A { Size::Byte } else { Size::Word };
            match hi {
                0x0 => (mov_load(size, Operand::Abs(abs16(w.word(2))), lo), 4),
                0x2 if w.byte(2) == 0 => (mov_load(size, Operand::Abs(w.long(2) & ADDRESS_MASK), lo), 6),
                0x8 => (mov_store(size, lo, Operand::Abs(abs16(w.word(2)))), 4),
                0xA if w.byte(2) == 0 => (mov_store(size, lo, Operand::Abs(w.long(2) & ADDRESS_MASK)), 6),
                0x4 if size == Size::Byte => (I::Movfpe { addr: abs16(w.word(2)), rd: lo }, 4),
                0xC if size == Size::Byte => (I::Movtpe { rs: lo, addr: abs16(w.word(2)) }, 4),
                _ => return None,
            }
        }
        0x6C | 0x6D => {
            let size = if b0 == 0x6C { Size::Byte } else { Size::Word };
            (mov_mem(size, b1, Operand::PostInc(hi & 7), Operand::PreDec(hi & 7)), 2)
        }
        0x6E | 0x6F => {
            let size = if b0 == 0x6E { Size::Byte } else { Size::Word };
            let ea = Operand::Disp { er: hi & 7, disp: disp16(w.word(2)) };
            (mov_mem(size, b1, ea, ea), 4)
        }
        0x78 if b1 & 0x8F == 0 => {
            let size = match w.byte(2) {
                0x6A => Size::Byte,
                0x6B => Size::Word,
                _ => return None,
            };
            let b3 = w.byte(3);
            if w.byte(4) != 0 {
                return None;
            }
            let ea = Operand::Disp { er: hi, disp: disp24(w.long(4) & ADDRESS_MASK) };
            match b3 >> 4 {
                0x2 => (mov_load(size, ea, b3 & 0x0F), 8),
                0xA => (mov_store(size, b3 & 0x0F, ea), 8),
                _ => return None,
            }
        }
        0x79 => (imm_op(Size::Word, hi, lo, u32::from(w.word(2)))?, 4),
        0x7A if lo & 8 == 0 => (imm_op(Size::Long, hi, lo, w.long(2))?, 6),
        0x7B => match (b1, w.word(2)) {
            (0x5C, 0x598F) => (I::Eepmov(Size::Byte), 4),
            (0xD4, 0x598F) => (I::Eepmov(Size::Word), 4),
            _ => return None,
        },
        0x7C..=0x7F => {
            let target = if b0 <= 0x7D {
                if b1 & 0x8F != 0 {
                    return None;
                }
                BitTarget::Indirect(hi)
            } else {
                BitTarget::Abs(abs8(b1))
            };
            let (op, sel) = (w.byte(2), w.byte(3));
            if sel & 0x0F != 0 {
                return None;
            }
            let (bit_op, index) = decode_bit_op(op, sel >> 4)?;
            // 7C/7E read the operand, 7D/7F write it back.
            if bit_op.writes() != (b0 & 1 == 1) {
                return None;
            }
            (I::Bit { op: bit_op, index, target }, 4)
        }
        0x80..=0xFF => {
            let rd = b0 & 0x0F;
            let imm = Operand::Imm(u32::from(b1));
            let op = match b0 >> 4 {
                0x8 => AluOp::Add,
                0x9 => AluOp::Addx,
                0xA => AluOp::Cmp,
                0xB => AluOp::Subx,
                0xC => AluOp::Or,
                0xD => AluOp::Xor,
                0xE => AluOp::And,
                _ => return Some((I::Mov { size: Size::Byte, src: imm, dst: Operand::Reg(rd) }, 2)),
            };
            (I::Alu { op, size: Size::Byte, src: imm, rd }, 2)
        }
        _ => return None,
    })
}

/// `01 xx` prefixed forms.
fn decode_prefixed<F: FnMut(u32) -> u8>(w: &mut Window<F>, b1: u8) -> Option<(Instruction, u8)> {
    use Instruction as I;

    match b1 {
        0x00 => decode_mov_long(w),
        0x40 => decode_control_mem(w, ControlReg::Ccr),
        0x41 => match w.byte(2) {
            b2 @ 0x04..=0x06 => {
                let op = [LogicOp::Or, LogicOp::Xor, LogicOp::And][usize::from(b2 - 4)];
                Some((I::ControlLogic { op, reg: ControlReg::Exr, imm: w.byte(3) }, 4))
            }
            0x07 => Some((
                I::Ldc { reg: ControlReg::Exr, src: Operand::Imm(u32::from(w.byte(3))) },
                4,
            )),
            _ => decode_control_mem(w, ControlReg::Exr),
        },
        0x80 => Some((I::Sleep, 2)),
        0xC0 | 0xD0 => {
            let (b2, b3) = (w.byte(2), w.byte(3));
            let (rs, rd) = (b3 >> 4, b3 & 0x0F);
            let size = match b2 & 0xFD {
                0x50 | 0x51 => Size::Byte,
                _ => return None,
            };
            let size = if b2 & 2 == 0 { size } else { Size::Word };
            if size == Size::Word && rd & 8 != 0 {
                return None;
            }
            match (b1, b2 & 1) {
                (0xC0, 0) => Some((I::Mul { signed: true, size, rs, rd }, 4)),
                (0xD0, 1) => Some((I::Div { signed: true, size, rs, rd }, 4)),
                _ => None,
            }
        }
        0xF0 => {
            let (b2, b3) = (w.byte(2), w.byte(3));
            if b3 & 0x88 != 0 {
                return None;
            }
            let op = match b2 {
                0x64 => AluOp::Or,
                0x65 => AluOp::Xor,
                0x66 => AluOp::And,
                _ => return None,
            };
            Some((alu(op, Size::Long, b3 >> 4, b3 & 7), 4))
        }
        _ => None,
    }
}

/// `01 00` MOV.L memory forms.
fn decode_mov_long<F: FnMut(u32) -> u8>(w: &mut Window<F>) -> Option<(Instruction, u8)> {
    let (b2, b3) = (w.byte(2), w.byte(3));
    let er = (b3 >> 4) & 7;
    Some(match b2 {
        0x69 | 0x6D | 0x6F if b3 & 0x08 == 0 => {
            let (load, store, len) = match b2 {
                0x69 => (Operand::Indirect(er), Operand::Indirect(er), 4),
                0x6D => (Operand::PostInc(er), Operand::PreDec(er), 4),
                _ => {
                    let ea = Operand::Disp { er, disp: disp16(w.word(4)) };
                    (ea, ea, 6)
                }
            };
            (mov_mem(Size::Long, b3, load, store), len)
        }
        0x78 if b3 & 0x8F == 0 => {
            if w.byte(4) != 0x6B || w.byte(6) != 0 {
                return None;
            }
            let b5 = w.byte(5);
            if b5 & 0x08 != 0 {
                return None;
            }
            let ea = Operand::Disp { er: b3 >> 4, disp: disp24(w.long(6) & ADDRESS_MASK) };
            match b5 >> 4 {
                0x2 => (mov_load(Size::Long, ea, b5 & 7), 10),
                0xA => (mov_store(Size::Long, b5 & 7, ea), 10),
                _ => return None,
            }
        }
        0x6B if b3 & 0x08 == 0 => {
            let r = b3 & 7;
            match b3 >> 4 {
                0x0 => (mov_load(Size::Long, Operand::Abs(abs16(w.word(4))), r), 6),
                0x2 if w.byte(4) == 0 => {
                    (mov_load(Size::Long, Operand::Abs(w.long(4) & ADDRESS_MASK), r), 8)
                }
                0x8 => (mov_store(Size::Long, r, Operand::Abs(abs16(w.word(4)))), 6),
                0xA if w.byte(4) == 0 => {
                    (mov_store(Size::Long, r, Operand::Abs(w.long(4) & ADDRESS_MASK)), 8)
                }
                _ => return None,
            }
        }
        _ => return None,
    })
}

/// `01 40` / `01 41` LDC/STC memory forms. The operand is a word whose
/// high byte carries the register.
fn decode_control_mem<F: FnMut(u32) -> u8>(
    w: &mut Window<F>,
    reg: ControlReg,
) -> Option<(Instruction, u8)> {
    let (b2, b3) = (w.byte(2), w.byte(3));
    let er = (b3 >> 4) & 7;
    let store = b3 & 0x80 != 0;
    let pick = |load: Operand, stored: Operand| {
        if store {
            Instruction::Stc { reg, dst: stored }
        } else {
            Instruction::Ldc { reg, src: load }
        }
    };
    Some(match b2 {
        0x69 if b3 & 0x0F == 0 => (pick(Operand::Indirect(er), Operand::Indirect(er)), 4),
        0x6D if b3 & 0x0F == 0 => (pick(Operand::PostInc(er), Operand::PreDec(er)), 4),
        0x6F if b3 & 0x0F == 0 => {
            let ea = Operand::Disp { er, disp: disp16(w.word(4)) };
            (pick(ea, ea), 6)
        }
        0x78 if b3 & 0x8F == 0 => {
            if w.byte(4) != 0x6B || w.byte(6) != 0 {
                return None;
            }
            let ea = Operand::Disp { er, disp: disp24(w.long(6) & ADDRESS_MASK) };
            match w.byte(5) {
                0x20 => (Instruction::Ldc { reg, src: ea }, 10),
                0xA0 => (Instruction::Stc { reg, dst: ea }, 10),
                _ => return None,
            }
        }
        0x6B => match b3 {
            0x00 | 0x80 => {
                let ea = Operand::Abs(abs16(w.word(4)));
                (pick(ea, ea), 6)
            }
            0x20 | 0xA0 if w.byte(4) == 0 => {
                let ea = Operand::Abs(w.long(4) & ADDRESS_MASK);
                (pick(ea, ea), 8)
            }
            _ => return None,
        },
        _ => return None,
    })
}

fn alu(op: AluOp, size: Size, rs: u8, rd: u8) -> Instruction {
    Instruction::Alu { op, size, src: Operand::Reg(rs), rd }
}

fn mov_rr(size: Size, rs: u8, rd: u8) -> Instruction {
    Instruction::Mov { size, src: Operand::Reg(rs), dst: Operand::Reg(rd) }
}

fn mov_load(size: Size, src: Operand, rd: u8) -> Instruction {
    Instruction::Mov { size, src, dst: Operand::Reg(rd) }
}

fn mov_store(size: Size, rs: u8, dst: Operand) -> Instruction {
    Instruction::Mov { size, src: Operand::Reg(rs), dst }
}

/// Memory MOV selected by bit 7 of the `[d ern][r]` byte: clear loads
/// from `load`, set stores to `store`.
fn mov_mem(size: Size, sel: u8, load: Operand, store: Operand) -> Instruction {
    let r = sel & 0x0F;
    if sel & 0x80 == 0 {
        mov_load(size, load, r)
    } else {
        mov_store(size, r, store)
    }
}

/// `0B`/`1B` ADDS/INC and SUBS/DEC.
fn step_op(hi: u8, lo: u8, down: bool) -> Option<Instruction> {
    use Instruction as I;

    let (size, amount) = match hi {
        0x0 => return adds(1, lo, down),
        0x8 => return adds(2, lo, down),
        0x9 => return adds(4, lo, down),
        0x5 => (Size::Word, 1),
        0xD => (Size::Word, 2),
        0x7 if lo & 8 == 0 => (Size::Long, 1),
        0xF if lo & 8 == 0 => (Size::Long, 2),
        _ => return None,
    };
    Some(if down {
        I::Dec { size, amount, rd: lo }
    } else {
        I::Inc { size, amount, rd: lo }
    })
}

fn adds(amount: u8, rd: u8, down: bool) -> Option<Instruction> {
    if rd & 8 != 0 {
        return None;
    }
    Some(if down {
        Instruction::Subs { amount, rd }
    } else {
        Instruction::Adds { amount, rd }
    })
}

fn shift_op(b0: u8, hi: u8, lo: u8) -> Option<Instruction> {
    let size = match hi & 3 {
        0 => Size::Byte,
        1 => Size::Word,
        3 if lo & 8 == 0 => Size::Long,
        _ => return None,
    };
    let count = if hi & 4 == 0 { 1 } else { 2 };
    let alt = hi & 8 != 0;
    let op = match (b0 & 3, alt) {
        (0, false) => ShiftOp::Shll,
        (0, true) => ShiftOp::Shal,
        (1, false) => ShiftOp::Shlr,
        (1, true) => ShiftOp::Shar,
        (2, false) => ShiftOp::Rotxl,
        (2, true) => ShiftOp::Rotl,
        (_, false) => ShiftOp::Rotxr,
        (_, true) => ShiftOp::Rotr,
    };
    Some(Instruction::Shift { op, size, count, rd: lo })
}

fn unary_op(hi: u8, lo: u8) -> Option<Instruction> {
    let (op, size) = match hi {
        0x0 => (UnaryOp::Not, Size::Byte),
        0x1 => (UnaryOp::Not, Size::Word),
        0x3 => (UnaryOp::Not, Size::Long),
        0x5 => (UnaryOp::Extu, Size::Word),
        0x7 => (UnaryOp::Extu, Size::Long),
        0x8 => (UnaryOp::Neg, Size::Byte),
        0x9 => (UnaryOp::Neg, Size::Word),
        0xB => (UnaryOp::Neg, Size::Long),
        0xD => (UnaryOp::Exts, Size::Word),
        0xF => (UnaryOp::Exts, Size::Long),
        _ => return None,
    };
    if size == Size::Long && lo & 8 != 0 {
        return None;
    }
    Some(Instruction::Unary { op, size, rd: lo })
}

/// `79`/`7A` immediate forms: MOV, ADD, CMP, SUB, OR, XOR, AND.
fn imm_op(size: Size, op: u8, rd: u8, imm: u32) -> Option<Instruction> {
    let src = Operand::Imm(imm);
    let op = match op {
        0 => return Some(Instruction::Mov { size, src, dst: Operand::Reg(rd) }),
        1 => AluOp::Add,
        2 => AluOp::Cmp,
        3 => AluOp::Sub,
        4 => AluOp::Or,
        5 => AluOp::Xor,
        6 => AluOp::And,
        _ => return None,
    };
    Some(Instruction::Alu { op, size, src, rd })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(bytes: &[u8]) -> Result<Decoded, DecodeError> {
        dec_model(CpuModel::H8S, bytes)
    }

    fn dec_model(model: CpuModel, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let image = bytes.to_vec();
        decode(model, 0x1000, |addr| {
            image.get((addr - 0x1000) as usize).copied().unwrap_or(0xFF)
        })
    }

    fn ok(bytes: &[u8]) -> (Instruction, u8) {
        let d = dec(bytes).unwrap();
        (d.insn, d.len)
    }

    #[test]
    fn mov_byte_immediate() {
        assert_eq!(
            ok(&[0xF8, 0x12]),
            (
                Instruction::Mov { size: Size::Byte, src: Operand::Imm(0x12), dst: Operand::Reg(8) },
                2
            )
        );
    }

    #[test]
    fn absolute_addresses_are_normalised() {
        assert_eq!(
            ok(&[0x28, 0x10]).0,
            Instruction::Mov { size: Size::Byte, src: Operand::Abs(0xFF_FF10), dst: Operand::Reg(8) }
        );
        assert_eq!(
            ok(&[0x6B, 0x02, 0x80, 0x00]).0,
            Instruction::Mov { size: Size::Word, src: Operand::Abs(0xFF_8000), dst: Operand::Reg(2) }
        );
        assert_eq!(
            ok(&[0x6A, 0xA8, 0x00, 0x12, 0x34, 0x56]),
            (
                Instruction::Mov { size: Size::Byte, src: Operand::Reg(8), dst: Operand::Abs(0x12_3456) },
                6
            )
        );
    }

    #[test]
    fn displacement_24_is_sign_extended() {
        let (insn, len) = ok(&[0x01, 0x00, 0x78, 0x30, 0x6B, 0xA2, 0x00, 0xFF, 0xFF, 0xFC]);
        assert_eq!(len, 10);
        assert_eq!(
            insn,
            Instruction::Mov {
                size: Size::Long,
                src: Operand::Reg(2),
                dst: Operand::Disp { er: 3, disp: -4 }
            }
        );
    }

    #[test]
    fn bit_ops_share_second_stage() {
        // BLD #3, R0L
        assert_eq!(
            ok(&[0x77, 0x38]).0,
            Instruction::Bit { op: BitOp::Ld, index: BitIndex::Imm(3), target: BitTarget::Reg(8) }
        );
        // BILD #3, @ER2
        assert_eq!(
            ok(&[0x7C, 0x20, 0x77, 0xB0]).0,
            Instruction::Bit { op: BitOp::Ild, index: BitIndex::Imm(3), target: BitTarget::Indirect(2) }
        );
        // BSET R1H, @0xFFFF20
        assert_eq!(
            ok(&[0x7F, 0x20, 0x60, 0x10]).0,
            Instruction::Bit { op: BitOp::Set, index: BitIndex::Reg(1), target: BitTarget::Abs(0xFF_FF20) }
        );
        // BSET in the read-only prefix is not an instruction.
        assert!(dec(&[0x7C, 0x20, 0x70, 0x10]).is_err());
    }

    #[test]
    fn branch_displacements() {
        assert_eq!(ok(&[0x46, 0xFE]).0, Instruction::Bcc { cond: 6, disp: -2 });
        assert_eq!(
            ok(&[0x58, 0x70, 0x01, 0x00]),
            (Instruction::Bcc { cond: 7, disp: 0x100 }, 4)
        );
        assert_eq!(ok(&[0x5C, 0x00, 0xFF, 0x00]).0, Instruction::Bsr { disp: -256 });
    }

    #[test]
    fn prefixed_multiply_divide() {
        assert_eq!(
            ok(&[0x01, 0xC0, 0x52, 0x13]).0,
            Instruction::Mul { signed: true, size: Size::Word, rs: 1, rd: 3 }
        );
        assert_eq!(
            ok(&[0x01, 0xD0, 0x51, 0x98]).0,
            Instruction::Div { signed: true, size: Size::Byte, rs: 9, rd: 8 }
        );
        assert!(dec(&[0x01, 0xC0, 0x51, 0x98]).is_err());
    }

    #[test]
    fn control_register_forms() {
        assert_eq!(
            ok(&[0x01, 0x40, 0x6D, 0xF0]).0,
            Instruction::Stc { reg: ControlReg::Ccr, dst: Operand::PreDec(7) }
        );
        assert_eq!(
            ok(&[0x01, 0x41, 0x06, 0xF8]).0,
            Instruction::ControlLogic { op: LogicOp::And, reg: ControlReg::Exr, imm: 0xF8 }
        );
        assert_eq!(
            ok(&[0x01, 0x40, 0x6B, 0x20, 0x00, 0xFF, 0xFF, 0x00]),
            (
                Instruction::Ldc { reg: ControlReg::Ccr, src: Operand::Abs(0xFF_FF00) },
                8
            )
        );
    }

    #[test]
    fn h8s_only_forms_rejected_on_h8300h() {
        let err = dec_model(CpuModel::H8300H, &[0x03, 0x18]).unwrap_err();
        assert!(matches!(err, DecodeError::RequiresH8s { address: 0x1000, .. }));
        // SHLL.B #2, R0L
        assert!(dec_model(CpuModel::H8300H, &[0x10, 0x48]).is_err());
        assert_eq!(
            dec_model(CpuModel::H8S, &[0x10, 0x48]).unwrap().insn,
            Instruction::Shift { op: ShiftOp::Shll, size: Size::Byte, count: 2, rd: 8 }
        );
    }

    #[test]
    fn eepmov_and_sleep() {
        assert_eq!(ok(&[0x7B, 0x5C, 0x59, 0x8F]), (Instruction::Eepmov(Size::Byte), 4));
        assert_eq!(ok(&[0x7B, 0xD4, 0x59, 0x8F]), (Instruction::Eepmov(Size::Word), 4));
        assert_eq!(ok(&[0x01, 0x80]), (Instruction::Sleep, 2));
    }

    #[test]
    fn illegal_reports_address_and_bytes() {
        let err = dec(&[0x00, 0x01]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Illegal { address: 0x1000, bytes: vec![0x00, 0x01] }
        );
        assert_eq!(err.address(), 0x1000);
    }

    #[test]
    fn window_is_lazy() {
        let mut fetched = Vec::new();
        let d = decode(CpuModel::H8S, 0x200, |addr| {
            fetched.push(addr);
            match addr {
                0x200 => 0x0C,
                0x201 => 0x8A,
                _ => 0xFF,
            }
        })
        .unwrap();
        assert_eq!(d.len, 2);
        assert_eq!(fetched, vec![0x200, 0x201]);
    }
}
