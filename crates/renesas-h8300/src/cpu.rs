//! H8/300H and H8S CPU core.
//!
//! Instruction-stepped: each call to [`Cpu::step`] either takes a pending
//! interrupt or fetches, decodes and executes one instruction. Time is
//! counted in approximate CPU states (one φ tick each) so the machine can
//! drive its timers from the same clock.

use std::collections::BTreeSet;

use emu_core::{Observable, Ticks, Value};
use tracing::{trace, warn};

use crate::alu::Size;
use crate::bus::H8Bus;
use crate::decode::decode;
use crate::exceptions::{ExceptionKind, InterruptMode, IrqRequest, VECTOR_TRACE};
use crate::model::CpuModel;
use crate::registers::{ADDRESS_MASK, Registers};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Normal execution.
    Running,
    /// SLEEP executed, waiting for an interrupt.
    Sleeping,
}

/// Result of one [`Cpu::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction executed.
    Executed,
    /// An interrupt was accepted; PC now holds its handler.
    Interrupt { vector: u8 },
    /// Sleeping with no acceptable interrupt; nothing executed.
    Sleeping,
    /// PC is on a host breakpoint; nothing executed. The next step runs
    /// the instruction.
    Breakpoint { address: u32 },
    /// The bytes at `address` are not an instruction. PC has moved to
    /// `address + 2`.
    IllegalInstruction { address: u32 },
}

/// H8 CPU.
#[derive(Debug, Clone)]
pub struct Cpu {
    // === Registers ===
    pub regs: Registers,

    // === Configuration ===
    model: CpuModel,
    pub(crate) interrupt_mode: InterruptMode,

    // === Execution state ===
    pub(crate) state: State,
    /// Latched request from the interrupt controller.
    pub(crate) irq: Option<IrqRequest>,

    // === Debugging ===
    breakpoints: BTreeSet<u32>,
    /// Set after reporting a breakpoint so the next step executes it.
    resume_past_breakpoint: bool,

    // === Timing ===
    /// States accrued by the step in progress.
    pub(crate) cycles: u64,
    total_cycles: Ticks,
}

impl Cpu {
    /// Create a CPU in reset state. PC is loaded by [`Cpu::reset`].
    #[must_use]
    pub fn new(model: CpuModel) -> Self {
        Self {
            regs: Registers::new(),
            model,
            interrupt_mode: InterruptMode::default(),
            state: State::Running,
            irq: None,
            breakpoints: BTreeSet::new(),
            resume_past_breakpoint: false,
            cycles: 0,
            total_cycles: Ticks::ZERO,
        }
    }

    /// Reset: CCR = 0x80, EXR = 0x7F, PC from vector 0, wake up.
    pub fn reset<B: H8Bus>(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.state = State::Running;
        self.irq = None;
        self.resume_past_breakpoint = false;
        self.regs.pc = bus.read_long(0) & ADDRESS_MASK;
    }

    #[must_use]
    pub fn model(&self) -> CpuModel {
        self.model
    }

    #[must_use]
    pub fn interrupt_mode(&self) -> InterruptMode {
        self.interrupt_mode
    }

    /// Select the interrupt control mode (from SYSCR.UE or INTCR.INTM).
    pub fn set_interrupt_mode(&mut self, mode: InterruptMode) {
        self.interrupt_mode = mode;
    }

    /// Latch the controller's current request, or `None` when deasserted.
    pub fn set_irq(&mut self, request: Option<IrqRequest>) {
        self.irq = request;
    }

    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.state == State::Sleeping
    }

    /// Total CPU states executed since creation.
    #[must_use]
    pub fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }

    /// Account for time spent outside instruction execution (sleep).
    pub fn idle(&mut self, ticks: u64) {
        self.total_cycles += ticks;
    }

    pub fn add_breakpoint(&mut self, address: u32) {
        self.breakpoints.insert(address & ADDRESS_MASK);
    }

    pub fn remove_breakpoint(&mut self, address: u32) -> bool {
        self.breakpoints.remove(&(address & ADDRESS_MASK))
    }

    /// Run one step: accept an interrupt, or execute one instruction.
    pub fn step<B: H8Bus>(&mut self, bus: &mut B) -> StepOutcome {
        self.cycles = 0;
        let outcome = self.step_inner(bus);
        self.total_cycles += self.cycles;
        outcome
    }

    fn step_inner<B: H8Bus>(&mut self, bus: &mut B) -> StepOutcome {
        if let Some(vector) = self.poll_interrupt(bus) {
            self.resume_past_breakpoint = false;
            return StepOutcome::Interrupt { vector };
        }
        if self.state == State::Sleeping {
            return StepOutcome::Sleeping;
        }

        let address = self.regs.pc & ADDRESS_MASK;
        if self.breakpoints.contains(&address) && !self.resume_past_breakpoint {
            self.resume_past_breakpoint = true;
            return StepOutcome::Breakpoint { address };
        }
        self.resume_past_breakpoint = false;

        let decoded = match decode(self.model, address, |a| bus.read_byte(a)) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(target: "guest", "{err}");
                self.regs.pc = address.wrapping_add(2) & ADDRESS_MASK;
                self.cycles += 2;
                return StepOutcome::IllegalInstruction { address };
            }
        };
        trace!(target: "exec", "{address:06x}: {}", decoded.insn);

        let tracing_enabled = self.interrupt_mode == InterruptMode::Exr && self.regs.exr.t;
        self.regs.pc = address.wrapping_add(u32::from(decoded.len)) & ADDRESS_MASK;
        self.cycles += u64::from(decoded.len);
        self.execute(bus, decoded.insn);

        if tracing_enabled && self.state == State::Running {
            self.enter_exception(bus, VECTOR_TRACE, ExceptionKind::Trace);
        }
        StepOutcome::Executed
    }

    // === Bus access with state accounting ===

    pub(crate) fn read_byte<B: H8Bus>(&mut self, bus: &mut B, addr: u32) -> u8 {
        self.cycles += 2;
        bus.read_byte(addr & ADDRESS_MASK)
    }

    pub(crate) fn write_byte<B: H8Bus>(&mut self, bus: &mut B, addr: u32, value: u8) {
        self.cycles += 2;
        bus.write_byte(addr & ADDRESS_MASK, value);
    }

    pub(crate) fn read_word<B: H8Bus>(&mut self, bus: &mut B, addr: u32) -> u16 {
        self.cycles += 2;
        bus.read_word(addr & ADDRESS_MASK)
    }

    pub(crate) fn write_word<B: H8Bus>(&mut self, bus: &mut B, addr: u32, value: u16) {
        self.cycles += 2;
        bus.write_word(addr & ADDRESS_MASK, value);
    }

    pub(crate) fn read_long<B: H8Bus>(&mut self, bus: &mut B, addr: u32) -> u32 {
        self.cycles += 4;
        bus.read_long(addr & ADDRESS_MASK)
    }

    pub(crate) fn write_long<B: H8Bus>(&mut self, bus: &mut B, addr: u32, value: u32) {
        self.cycles += 4;
        bus.write_long(addr & ADDRESS_MASK, value);
    }

    pub(crate) fn read_sized<B: H8Bus>(&mut self, bus: &mut B, size: Size, addr: u32) -> u32 {
        match size {
            Size::Byte => u32::from(self.read_byte(bus, addr)),
            Size::Word => u32::from(self.read_word(bus, addr)),
            Size::Long => self.read_long(bus, addr),
        }
    }

    pub(crate) fn write_sized<B: H8Bus>(&mut self, bus: &mut B, size: Size, addr: u32, value: u32) {
        match size {
            Size::Byte => self.write_byte(bus, addr, value as u8),
            Size::Word => self.write_word(bus, addr, value as u16),
            Size::Long => self.write_long(bus, addr, value),
        }
    }

    /// Register read at operand size.
    pub(crate) fn reg(&self, size: Size, field: u8) -> u32 {
        match size {
            Size::Byte => u32::from(self.regs.r8(field)),
            Size::Word => u32::from(self.regs.r16(field)),
            Size::Long => self.regs.r32(field),
        }
    }

    pub(crate) fn set_reg(&mut self, size: Size, field: u8, value: u32) {
        match size {
            Size::Byte => self.regs.set_r8(field, value as u8),
            Size::Word => self.regs.set_r16(field, value as u16),
            Size::Long => self.regs.set_r32(field, value),
        }
    }
}

const QUERY_PATHS: &[&str] = &[
    "pc", "ccr", "exr", "er0", "er1", "er2", "er3", "er4", "er5", "er6", "er7", "sp", "ccr.i",
    "ccr.ui", "exr.i", "sleeping", "irq", "cycles",
];

impl Observable for Cpu {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(n) = path.strip_prefix("er") {
            let n: usize = n.parse().ok()?;
            return self.regs.er.get(n).copied().map(Value::U32);
        }
        Some(match path {
            "pc" => Value::U32(self.regs.pc),
            "ccr" => Value::U8(self.regs.ccr.to_byte()),
            "exr" if self.model.has_exr() => Value::U8(self.regs.exr.to_byte()),
            "sp" => Value::U32(self.regs.sp()),
            "ccr.i" => Value::Bool(self.regs.ccr.i),
            "ccr.ui" => Value::Bool(self.regs.ccr.ui),
            "exr.i" if self.model.has_exr() => Value::U8(self.regs.exr.i),
            "sleeping" => Value::Bool(self.is_sleeping()),
            "irq" => Value::from(self.irq.map(|r| r.vector)),
            "cycles" => Value::U64(self.total_cycles.get()),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat(Vec<u8>);

    impl H8Bus for Flat {
        fn read_byte(&mut self, addr: u32) -> u8 {
            self.0.get(addr as usize).copied().unwrap_or(0)
        }
        fn write_byte(&mut self, addr: u32, value: u8) {
            if let Some(b) = self.0.get_mut(addr as usize) {
                *b = value;
            }
        }
    }

    #[test]
    fn reset_loads_vector_zero() {
        let mut bus = Flat(vec![0; 0x100]);
        bus.0[..4].copy_from_slice(&[0x00, 0x00, 0x01, 0x00]);
        let mut cpu = Cpu::new(CpuModel::H8S);
        cpu.regs.ccr.c = true;
        cpu.reset(&mut bus);
        assert_eq!(cpu.regs.pc, 0x100);
        assert_eq!(cpu.regs.ccr.to_byte(), 0x80);
        assert_eq!(cpu.regs.exr.to_byte(), 0x7F);
        assert!(!cpu.is_sleeping());
    }

    #[test]
    fn query_exposes_registers() {
        let mut cpu = Cpu::new(CpuModel::H8300H);
        cpu.regs.er[3] = 0x1234;
        assert_eq!(cpu.query("er3"), Some(Value::U32(0x1234)));
        assert_eq!(cpu.query("er8"), None);
        assert_eq!(cpu.query("exr"), None);
        assert_eq!(cpu.query("irq"), Some(Value::None));
        assert!(cpu.query_paths().contains(&"ccr.ui"));
    }
}
