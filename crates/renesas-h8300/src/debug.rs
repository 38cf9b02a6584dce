//! Debugger register access.
//!
//! Registers are numbered the way a remote debugger sees them: 0-7 are
//! ER0-ER7, 8 is CCR, 9 is PC and 10 is EXR (H8S only). All values are
//! 32-bit.

use crate::cpu::Cpu;
use crate::flags::{Ccr, Exr};
use crate::model::CpuModel;
use crate::registers::ADDRESS_MASK;

pub const REG_CCR: usize = 8;
pub const REG_PC: usize = 9;
pub const REG_EXR: usize = 10;

const H8300H_REGISTER_NAMES: [&str; 10] =
    ["er0", "er1", "er2", "er3", "er4", "er5", "er6", "er7", "ccr", "pc"];

const H8S_REGISTER_NAMES: [&str; 11] =
    ["er0", "er1", "er2", "er3", "er4", "er5", "er6", "er7", "ccr", "pc", "exr"];

/// Register names in debugger order for `model`.
#[must_use]
pub const fn register_names(model: CpuModel) -> &'static [&'static str] {
    match model {
        CpuModel::H8300H => &H8300H_REGISTER_NAMES,
        CpuModel::H8S => &H8S_REGISTER_NAMES,
    }
}

impl Cpu {
    /// Read debugger register `n`. `None` if the model has no such register.
    #[must_use]
    pub fn read_debug_register(&self, n: usize) -> Option<u32> {
        match n {
            0..=7 => Some(self.regs.er[n]),
            REG_CCR => Some(u32::from(self.regs.ccr.to_byte())),
            REG_PC => Some(self.regs.pc),
            REG_EXR if self.model().has_exr() => Some(u32::from(self.regs.exr.to_byte())),
            _ => None,
        }
    }

    /// Write debugger register `n`. Returns false if the model has no such
    /// register.
    pub fn write_debug_register(&mut self, n: usize, value: u32) -> bool {
        match n {
            0..=7 => self.regs.er[n] = value,
            REG_CCR => self.regs.ccr = Ccr::from_byte(value as u8),
            REG_PC => self.regs.pc = value & ADDRESS_MASK,
            REG_EXR if self.model().has_exr() => self.regs.exr = Exr::from_byte(value as u8),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_tables_follow_model() {
        assert_eq!(register_names(CpuModel::H8300H).len(), 10);
        assert_eq!(register_names(CpuModel::H8S)[REG_EXR], "exr");
        assert_eq!(register_names(CpuModel::H8S)[REG_PC], "pc");
    }

    #[test]
    fn read_write_round_trip() {
        let mut cpu = Cpu::new(CpuModel::H8S);
        assert!(cpu.write_debug_register(3, 0xDEAD_BEEF));
        assert_eq!(cpu.read_debug_register(3), Some(0xDEAD_BEEF));
        assert!(cpu.write_debug_register(REG_PC, 0x1234_5678));
        assert_eq!(cpu.read_debug_register(REG_PC), Some(0x34_5678));
        assert!(cpu.write_debug_register(REG_EXR, 0x02));
        assert_eq!(cpu.read_debug_register(REG_EXR), Some(0x7A));
        assert!(!cpu.write_debug_register(11, 0));
    }

    #[test]
    fn h8300h_has_no_exr() {
        let mut cpu = Cpu::new(CpuModel::H8300H);
        assert_eq!(cpu.read_debug_register(REG_EXR), None);
        assert!(!cpu.write_debug_register(REG_EXR, 0));
        assert!(cpu.write_debug_register(REG_CCR, 0x85));
        assert_eq!(cpu.read_debug_register(REG_CCR), Some(0x85));
    }
}
