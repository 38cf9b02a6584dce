//! Renesas H8/300H and H8S CPU emulator.
//!
//! Instruction-stepped, advanced (24-bit) mode only. Each call to
//! `Cpu::step()` takes a pending interrupt or executes one instruction
//! and accounts its approximate state count.

mod alu;
mod bitops;
mod bus;
mod cpu;
pub mod debug;
mod decode;
mod disasm;
mod exceptions;
mod execute;
mod flags;
mod model;
mod registers;
mod shifts;

pub use alu::{DAA_TABLE, DAS_TABLE, LogicOp, Size};
pub use bitops::{BitIndex, BitOp};
pub use bus::H8Bus;
pub use cpu::{Cpu, StepOutcome};
pub use decode::{
    AluOp, BitTarget, ControlReg, DecodeError, Decoded, Instruction, JumpTarget,
    MAX_INSTRUCTION_LEN, Operand, UnaryOp, decode,
};
pub use disasm::reg_name;
pub use exceptions::{InterruptMode, IrqRequest, VECTOR_NMI, VECTOR_TRACE, VECTOR_TRAPA};
pub use flags::{C, Ccr, EXR_I_MASK, EXR_RESERVED, EXR_T, Exr, H, I, N, U, UI, V, Z, condition};
pub use model::{CpuCapabilities, CpuModel};
pub use registers::{ADDRESS_MASK, Registers, SP};
pub use shifts::ShiftOp;
