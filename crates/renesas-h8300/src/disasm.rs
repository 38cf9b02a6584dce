//! Assembler-syntax rendering of decoded instructions.
//!
//! Used by the `exec` trace and by the runner's register dump. Branch
//! targets are printed as signed displacements; an instruction does not
//! know its own address.

use std::fmt;

use crate::alu::{LogicOp, Size};
use crate::bitops::BitIndex;
use crate::decode::{
    AluOp, BitTarget, ControlReg, Instruction, JumpTarget, Operand, UnaryOp,
};

/// Name of a register field at the given size.
#[must_use]
pub fn reg_name(size: Size, field: u8) -> String {
    let n = field & 7;
    match size {
        Size::Byte if field & 8 == 0 => format!("r{n}h"),
        Size::Byte => format!("r{n}l"),
        Size::Word if field & 8 == 0 => format!("r{n}"),
        Size::Word => format!("e{n}"),
        Size::Long => format!("er{n}"),
    }
}

struct Op(Size, Operand);

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Operand::Imm(v) => write!(f, "#{v:#x}"),
            Operand::Reg(r) => f.write_str(&reg_name(self.0, r)),
            Operand::Indirect(r) => write!(f, "@er{r}"),
            Operand::PostInc(r) => write!(f, "@er{r}+"),
            Operand::PreDec(r) => write!(f, "@-er{r}"),
            Operand::Disp { er, disp } => write!(f, "@({disp},er{er})"),
            Operand::Abs(a) => write!(f, "@{a:#08x}"),
        }
    }
}

const CONDITIONS: [&str; 16] = [
    "bra", "brn", "bhi", "bls", "bcc", "bcs", "bne", "beq", "bvc", "bvs", "bpl", "bmi", "bge",
    "blt", "bgt", "ble",
];

fn control(reg: ControlReg) -> &'static str {
    match reg {
        ControlReg::Ccr => "ccr",
        ControlReg::Exr => "exr",
    }
}

fn target(t: JumpTarget) -> String {
    match t {
        JumpTarget::Reg(r) => format!("@er{r}"),
        JumpTarget::Abs(a) => format!("@{a:#08x}"),
        JumpTarget::MemIndirect(a) => format!("@@{a:#04x}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Nop => f.write_str("nop"),
            Self::Sleep => f.write_str("sleep"),
            Self::Mov { size, src, dst } => {
                write!(f, "mov.{} {},{}", size.suffix(), Op(size, src), Op(size, dst))
            }
            Self::Movfpe { addr, rd } => {
                write!(f, "movfpe @{addr:#08x},{}", reg_name(Size::Byte, rd))
            }
            Self::Movtpe { rs, addr } => {
                write!(f, "movtpe {},@{addr:#08x}", reg_name(Size::Byte, rs))
            }
            Self::Alu { op, size, src, rd } => {
                let name = match op {
                    AluOp::Add => "add",
                    AluOp::Addx => "addx",
                    AluOp::Sub => "sub",
                    AluOp::Subx => "subx",
                    AluOp::Cmp => "cmp",
                    AluOp::And => "and",
                    AluOp::Or => "or",
                    AluOp::Xor => "xor",
                };
                write!(f, "{name}.{} {},{}", size.suffix(), Op(size, src), reg_name(size, rd))
            }
            Self::Adds { amount, rd } => write!(f, "adds #{amount},er{}", rd & 7),
            Self::Subs { amount, rd } => write!(f, "subs #{amount},er{}", rd & 7),
            Self::Inc { size, amount, rd } => {
                write!(f, "inc.{} #{amount},{}", size.suffix(), reg_name(size, rd))
            }
            Self::Dec { size, amount, rd } => {
                write!(f, "dec.{} #{amount},{}", size.suffix(), reg_name(size, rd))
            }
            Self::Daa(r) => write!(f, "daa {}", reg_name(Size::Byte, r)),
            Self::Das(r) => write!(f, "das {}", reg_name(Size::Byte, r)),
            Self::Mul { signed, size, rs, rd } | Self::Div { signed, size, rs, rd } => {
                let base = if matches!(self, Self::Mul { .. }) { "mulx" } else { "divx" };
                let kind = if signed { 's' } else { 'u' };
                let wide = if size == Size::Byte { Size::Word } else { Size::Long };
                write!(
                    f,
                    "{base}{kind}.{} {},{}",
                    size.suffix(),
                    reg_name(size, rs),
                    reg_name(wide, rd)
                )
            }
            Self::Unary { op, size, rd } => {
                let name = match op {
                    UnaryOp::Neg => "neg",
                    UnaryOp::Not => "not",
                    UnaryOp::Extu => "extu",
                    UnaryOp::Exts => "exts",
                };
                write!(f, "{name}.{} {}", size.suffix(), reg_name(size, rd))
            }
            Self::Shift { op, size, count, rd } => {
                write!(f, "{}.{} ", op.mnemonic(), size.suffix())?;
                if count == 2 {
                    f.write_str("#2,")?;
                }
                f.write_str(&reg_name(size, rd))
            }
            Self::Bit { op, index, target } => {
                write!(f, "{} ", op.mnemonic())?;
                match index {
                    BitIndex::Imm(n) => write!(f, "#{n},")?,
                    BitIndex::Reg(r) => write!(f, "{},", reg_name(Size::Byte, r))?,
                }
                match target {
                    BitTarget::Reg(r) => f.write_str(&reg_name(Size::Byte, r)),
                    BitTarget::Indirect(r) => write!(f, "@er{r}"),
                    BitTarget::Abs(a) => write!(f, "@{a:#08x}:8"),
                }
            }
            Self::Bcc { cond, disp } => {
                write!(f, "{} .{disp:+}", CONDITIONS[usize::from(cond & 0x0F)])
            }
            Self::Bsr { disp } => write!(f, "bsr .{disp:+}"),
            Self::Jmp(t) => write!(f, "jmp {}", target(t)),
            Self::Jsr(t) => write!(f, "jsr {}", target(t)),
            Self::Rts => f.write_str("rts"),
            Self::Rte => f.write_str("rte"),
            Self::Trapa(n) => write!(f, "trapa #{n}"),
            Self::Ldc { reg, src } => {
                let size = if matches!(src, Operand::Reg(_) | Operand::Imm(_)) {
                    Size::Byte
                } else {
                    Size::Word
                };
                write!(f, "ldc {},{}", Op(size, src), control(reg))
            }
            Self::Stc { reg, dst } => {
                let size = if matches!(dst, Operand::Reg(_)) { Size::Byte } else { Size::Word };
                write!(f, "stc {},{}", control(reg), Op(size, dst))
            }
            Self::ControlLogic { op, reg, imm } => {
                let name = match op {
                    LogicOp::And => "andc",
                    LogicOp::Or => "orc",
                    LogicOp::Xor => "xorc",
                };
                write!(f, "{name} #{imm:#04x},{}", control(reg))
            }
            Self::Eepmov(size) => write!(f, "eepmov.{}", size.suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitops::BitOp;

    #[test]
    fn renders_common_forms() {
        let mov = Instruction::Mov { size: Size::Byte, src: Operand::Imm(0x12), dst: Operand::Reg(8) };
        assert_eq!(mov.to_string(), "mov.b #0x12,r0l");

        let push = Instruction::Mov { size: Size::Long, src: Operand::Reg(6), dst: Operand::PreDec(7) };
        assert_eq!(push.to_string(), "mov.l er6,@-er7");

        let bit = Instruction::Bit {
            op: BitOp::Ist,
            index: BitIndex::Imm(2),
            target: BitTarget::Abs(0xFF_FF20),
        };
        assert_eq!(bit.to_string(), "bist #2,@0xffff20:8");

        assert_eq!(Instruction::Bcc { cond: 7, disp: -4 }.to_string(), "beq .-4");
        assert_eq!(
            Instruction::Mul { signed: false, size: Size::Word, rs: 1, rd: 2 }.to_string(),
            "mulxu.w r1,er2"
        );
    }
}
