//! Instruction execution.
//!
//! `Cpu::execute` runs one decoded instruction. PC already points past
//! the instruction, so branch displacements are added to it directly.

use crate::alu::{self, LogicOp, Size};
use crate::bitops::{self, BitIndex};
use crate::bus::H8Bus;
use crate::cpu::{Cpu, State};
use crate::decode::{AluOp, BitTarget, ControlReg, Instruction, JumpTarget, Operand, UnaryOp};
use crate::exceptions::{ExceptionKind, VECTOR_TRAPA};
use crate::flags::{Ccr, Exr, condition};
use crate::registers::ADDRESS_MASK;
use crate::shifts;

/// R4L as a byte register field.
const R4L: u8 = 12;
/// R4 as a word register field.
const R4: u8 = 4;
const ER5: u8 = 5;
const ER6: u8 = 6;

impl Cpu {
    /// Resolve a memory operand to its address, applying `@ERn+` and
    /// `@-ERn` register updates by `step` bytes.
    fn effective_address(&mut self, op: Operand, step: u32) -> u32 {
        let addr = match op {
            Operand::Indirect(er) => self.regs.r32(er),
            Operand::PostInc(er) => {
                let addr = self.regs.r32(er);
                self.regs.set_r32(er, addr.wrapping_add(step));
                addr
            }
            Operand::PreDec(er) => {
                let addr = self.regs.r32(er).wrapping_sub(step);
                self.regs.set_r32(er, addr);
                addr
            }
            Operand::Disp { er, disp } => self.regs.r32(er).wrapping_add(disp as u32),
            Operand::Abs(addr) => addr,
            Operand::Imm(_) | Operand::Reg(_) => 0,
        };
        addr & ADDRESS_MASK
    }

    fn read_operand<B: H8Bus>(&mut self, bus: &mut B, size: Size, op: Operand) -> u32 {
        match op {
            Operand::Imm(value) => value & size.mask(),
            Operand::Reg(r) => self.reg(size, r),
            _ => {
                let addr = self.effective_address(op, size.bytes());
                self.read_sized(bus, size, addr)
            }
        }
    }

    fn write_operand<B: H8Bus>(&mut self, bus: &mut B, size: Size, op: Operand, value: u32) {
        match op {
            Operand::Reg(r) => self.set_reg(size, r, value),
            // Never produced as a destination by the decoder.
            Operand::Imm(_) => {}
            _ => {
                let addr = self.effective_address(op, size.bytes());
                self.write_sized(bus, size, addr, value);
            }
        }
    }

    fn push_pc<B: H8Bus>(&mut self, bus: &mut B) {
        let sp = self.regs.sp().wrapping_sub(4);
        let pc = self.regs.pc;
        self.write_long(bus, sp, pc);
        self.regs.set_sp(sp);
    }

    fn branch(&mut self, disp: i32) {
        self.regs.pc = self.regs.pc.wrapping_add(disp as u32) & ADDRESS_MASK;
    }

    fn jump_target<B: H8Bus>(&mut self, bus: &mut B, target: JumpTarget) -> u32 {
        match target {
            JumpTarget::Reg(r) => self.regs.r32(r) & ADDRESS_MASK,
            JumpTarget::Abs(addr) => addr,
            JumpTarget::MemIndirect(aa) => self.read_long(bus, aa) & ADDRESS_MASK,
        }
    }

    fn control(&self, reg: ControlReg) -> u8 {
        match reg {
            ControlReg::Ccr => self.regs.ccr.to_byte(),
            ControlReg::Exr => self.regs.exr.to_byte(),
        }
    }

    fn set_control(&mut self, reg: ControlReg, value: u8) {
        match reg {
            ControlReg::Ccr => self.regs.ccr = Ccr::from_byte(value),
            ControlReg::Exr => self.regs.exr = Exr::from_byte(value),
        }
    }

    pub(crate) fn execute<B: H8Bus>(&mut self, bus: &mut B, insn: Instruction) {
        match insn {
            Instruction::Nop => {}
            Instruction::Sleep => self.state = State::Sleeping,

            // === Data movement ===
            Instruction::Mov { size, src, dst } => {
                let value = self.read_operand(bus, size, src);
                self.regs.ccr.set_logic(value, size.msb());
                self.write_operand(bus, size, dst, value);
            }
            Instruction::Movfpe { addr, rd } => {
                let value = self.read_byte(bus, addr);
                self.regs.set_r8(rd, value);
            }
            Instruction::Movtpe { rs, addr } => {
                let value = self.regs.r8(rs);
                self.write_byte(bus, addr, value);
            }
            Instruction::Eepmov(size) => self.eepmov(bus, size),

            // === Arithmetic and logic ===
            Instruction::Alu { op, size, src, rd } => {
                let b = self.read_operand(bus, size, src);
                let a = self.reg(size, rd);
                let ccr = &mut self.regs.ccr;
                let result = match op {
                    AluOp::Add => alu::add(ccr, size, a, b),
                    AluOp::Addx => alu::addx(ccr, size, a, b),
                    AluOp::Sub => alu::sub(ccr, size, a, b),
                    AluOp::Subx => alu::subx(ccr, size, a, b),
                    AluOp::Cmp => {
                        alu::sub(ccr, size, a, b);
                        return;
                    }
                    AluOp::And => alu::logic(ccr, size, LogicOp::And, a, b),
                    AluOp::Or => alu::logic(ccr, size, LogicOp::Or, a, b),
                    AluOp::Xor => alu::logic(ccr, size, LogicOp::Xor, a, b),
                };
                self.set_reg(size, rd, result);
            }
            Instruction::Adds { amount, rd } => {
                let value = self.regs.r32(rd).wrapping_add(u32::from(amount));
                self.regs.set_r32(rd, value);
            }
            Instruction::Subs { amount, rd } => {
                let value = self.regs.r32(rd).wrapping_sub(u32::from(amount));
                self.regs.set_r32(rd, value);
            }
            Instruction::Inc { size, amount, rd } => {
                let value = self.reg(size, rd);
                let result = alu::inc(&mut self.regs.ccr, size, value, u32::from(amount));
                self.set_reg(size, rd, result);
            }
            Instruction::Dec { size, amount, rd } => {
                let value = self.reg(size, rd);
                let result = alu::dec(&mut self.regs.ccr, size, value, u32::from(amount));
                self.set_reg(size, rd, result);
            }
            Instruction::Daa(rd) => {
                let value = self.regs.r8(rd);
                let result = alu::daa(&mut self.regs.ccr, value);
                self.regs.set_r8(rd, result);
            }
            Instruction::Das(rd) => {
                let value = self.regs.r8(rd);
                let result = alu::das(&mut self.regs.ccr, value);
                self.regs.set_r8(rd, result);
            }
            Instruction::Mul { signed, size, rs, rd } => {
                let wide = wide_size(size);
                // The multiplicand is the low half of the destination.
                let (a, b) = (self.reg(wide, rd), self.reg(size, rs));
                let product = if signed {
                    alu::mulxs(&mut self.regs.ccr, size, a, b)
                } else {
                    alu::mulxu(size, a, b)
                };
                self.set_reg(wide, rd, product);
                self.cycles += multiply_states(size);
            }
            Instruction::Div { signed, size, rs, rd } => {
                let wide = wide_size(size);
                let (dividend, divisor) = (self.reg(wide, rd), self.reg(size, rs));
                let packed = if signed {
                    alu::divxs(&mut self.regs.ccr, size, dividend, divisor)
                } else {
                    alu::divxu(&mut self.regs.ccr, size, dividend, divisor)
                };
                self.set_reg(wide, rd, packed);
                self.cycles += multiply_states(size);
            }
            Instruction::Unary { op, size, rd } => {
                let value = self.reg(size, rd);
                let ccr = &mut self.regs.ccr;
                let result = match op {
                    UnaryOp::Neg => alu::neg(ccr, size, value),
                    UnaryOp::Not => alu::logic(ccr, size, LogicOp::Xor, value, size.mask()),
                    UnaryOp::Extu => alu::extu(ccr, size, value),
                    UnaryOp::Exts => alu::exts(ccr, size, value),
                };
                self.set_reg(size, rd, result);
            }
            Instruction::Shift { op, size, count, rd } => {
                let value = self.reg(size, rd);
                let result = shifts::shift(&mut self.regs.ccr, size, op, value, count);
                self.set_reg(size, rd, result);
            }

            // === Bit manipulation ===
            Instruction::Bit { op, index, target } => {
                let bit = match index {
                    BitIndex::Imm(n) => n,
                    BitIndex::Reg(r) => self.regs.r8(r) & 7,
                };
                match target {
                    BitTarget::Reg(r) => {
                        let value = self.regs.r8(r);
                        if let Some(result) = bitops::apply(&mut self.regs.ccr, op, bit, value) {
                            self.regs.set_r8(r, result);
                        }
                    }
                    BitTarget::Indirect(er) => {
                        let addr = self.regs.r32(er);
                        self.bit_memory(bus, op, bit, addr);
                    }
                    BitTarget::Abs(addr) => self.bit_memory(bus, op, bit, addr),
                }
            }

            // === Branches ===
            Instruction::Bcc { cond, disp } => {
                if condition(&self.regs.ccr, cond) {
                    self.branch(disp);
                }
            }
            Instruction::Bsr { disp } => {
                self.push_pc(bus);
                self.branch(disp);
            }
            Instruction::Jmp(target) => self.regs.pc = self.jump_target(bus, target),
            Instruction::Jsr(target) => {
                let dest = self.jump_target(bus, target);
                self.push_pc(bus);
                self.regs.pc = dest;
            }
            Instruction::Rts => {
                let sp = self.regs.sp();
                self.regs.pc = self.read_long(bus, sp) & ADDRESS_MASK;
                self.regs.set_sp(sp.wrapping_add(4));
            }
            Instruction::Rte => self.return_from_exception(bus),
            Instruction::Trapa(n) => {
                self.enter_exception(bus, VECTOR_TRAPA + (n & 3), ExceptionKind::Trap);
            }

            // === Control registers ===
            Instruction::Ldc { reg, src } => {
                let value = match src {
                    Operand::Imm(v) => v as u8,
                    Operand::Reg(r) => self.regs.r8(r),
                    _ => {
                        let addr = self.effective_address(src, 2);
                        (self.read_word(bus, addr) >> 8) as u8
                    }
                };
                self.set_control(reg, value);
            }
            Instruction::Stc { reg, dst } => {
                let value = self.control(reg);
                match dst {
                    Operand::Reg(r) => self.regs.set_r8(r, value),
                    _ => {
                        let addr = self.effective_address(dst, 2);
                        self.write_word(bus, addr, u16::from(value) << 8);
                    }
                }
            }
            Instruction::ControlLogic { op, reg, imm } => {
                let value = op.apply(u32::from(self.control(reg)), u32::from(imm)) as u8;
                self.set_control(reg, value);
            }
        }
    }

    fn bit_memory<B: H8Bus>(&mut self, bus: &mut B, op: bitops::BitOp, bit: u8, addr: u32) {
        let value = self.read_byte(bus, addr);
        if let Some(result) = bitops::apply(&mut self.regs.ccr, op, bit, value) {
            self.write_byte(bus, addr, result);
        }
    }

    /// Block copy of R4L (.B) or R4 (.W) bytes from @ER5+ to @ER6+.
    fn eepmov<B: H8Bus>(&mut self, bus: &mut B, size: Size) {
        let count = match size {
            Size::Byte => u32::from(self.regs.r8(R4L)),
            _ => u32::from(self.regs.r16(R4)),
        };
        for _ in 0..count {
            let (src, dst) = (self.regs.r32(ER5), self.regs.r32(ER6));
            let value = self.read_byte(bus, src);
            self.write_byte(bus, dst, value);
            self.regs.set_r32(ER5, src.wrapping_add(1));
            self.regs.set_r32(ER6, dst.wrapping_add(1));
        }
        match size {
            Size::Byte => self.regs.set_r8(R4L, 0),
            _ => self.regs.set_r16(R4, 0),
        }
    }
}

/// Destination width of MULX/DIVX for a given source size.
fn wide_size(size: Size) -> Size {
    match size {
        Size::Byte => Size::Word,
        _ => Size::Long,
    }
}

/// Extra internal states for MULX/DIVX.
fn multiply_states(size: Size) -> u64 {
    match size {
        Size::Byte => 10,
        _ => 18,
    }
}
