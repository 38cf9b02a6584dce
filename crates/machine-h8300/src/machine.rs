//! Top-level machine: one board, its CPU and its bus.
//!
//! # Run loop
//!
//! Each step:
//! 1. Sync the timers if virtual time has reached their earliest deadline
//! 2. Copy the interrupt mode (SYSCR or INTCR) and the controller's
//!    resolved request into the CPU
//! 3. Step the CPU, with peripheral accesses stamped at the step's start
//! 4. If the CPU is asleep, skip ahead to the next timer deadline
//!
//! Time is φ ticks as counted by the CPU.

use emu_core::{Observable, SystemClock, Ticks, Value};
use renesas_h8300::{Cpu, H8Bus, StepOutcome};
use serde::Serialize;
use tracing::{debug, info};

use crate::board::{Board, DRAM_BASE};
use crate::bus::SocBus;
use crate::config::BoardConfig;
use crate::error::MachineError;
use crate::loader::{load_image, read_image, vector_table};
use crate::memory::Ram;
use crate::soc::Soc;

/// Why [`Machine::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// The instruction budget ran out.
    Budget,
    /// PC reached a host breakpoint.
    Breakpoint { address: u32 },
    /// Asleep with nothing left that could wake the CPU.
    Halted,
}

/// Snapshot of the machine for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineStatus {
    pub board: Board,
    pub soc: Soc,
    pub clock_hz: u64,
    pub pc: u32,
    pub ccr: u8,
    pub exr: Option<u8>,
    pub er: [u32; 8],
    pub interrupt_mode: String,
    pub sleeping: bool,
    pub asserted: Option<u8>,
    pub cycles: u64,
    pub elapsed_ns: u64,
    pub instructions: u64,
}

pub struct Machine {
    board: Board,
    cpu: Cpu,
    bus: SocBus,
    clock: SystemClock,
    /// Instructions executed, including illegal ones skipped.
    instructions: u64,
}

impl Machine {
    /// Build `board` with empty memory, clocked at `clock_hz`.
    #[must_use]
    pub fn new(board: Board, clock_hz: u64) -> Self {
        let soc = board.soc();
        let mut bus = SocBus::new(soc);
        if let Some(size) = board.flash_size() {
            bus.add_memory(Ram::new("flash", 0, size));
        }
        bus.add_memory(Ram::new("dram", DRAM_BASE, board.dram_size()));

        let mut machine = Self {
            board,
            cpu: Cpu::new(soc.cpu_model()),
            bus,
            clock: SystemClock::new(clock_hz),
            instructions: 0,
        };
        machine.reset();
        machine
    }

    /// Build the configured board and load its images.
    pub fn from_config(config: &BoardConfig) -> Result<Self, MachineError> {
        config.validate()?;
        let mut machine = Self::new(config.board, config.clock_hz());

        if let Some(path) = &config.kernel {
            let image = read_image(path)?;
            machine.boot_kernel(&image, config.kernel_address())?;
            if let Some(path) = &config.dtb {
                let blob = read_image(path)?;
                machine.load_dtb(&blob)?;
            }
        } else if let Some(path) = &config.firmware {
            let image = read_image(path)?;
            machine.load_firmware(&image)?;
        } else {
            return Err(MachineError::NoImage);
        }
        Ok(machine)
    }

    /// Copy a raw image to address 0 and reset through its vector table.
    pub fn load_firmware(&mut self, image: &[u8]) -> Result<(), MachineError> {
        load_image(&mut self.bus, "firmware", 0, image, None)?;
        info!("firmware: {} bytes, {}", image.len(), self.board);
        self.reset();
        Ok(())
    }

    /// Load a kernel at `address`, point every vector at the board's
    /// trampoline area, reset, and start at the kernel's first byte.
    pub fn boot_kernel(&mut self, image: &[u8], address: u32) -> Result<(), MachineError> {
        load_image(
            &mut self.bus,
            "kernel",
            address,
            image,
            Some(self.board.kernel_max()),
        )?;
        let vectors = vector_table(self.board.vector_base(), self.board.vector_count());
        load_image(&mut self.bus, "vector table", 0, &vectors, None)?;
        self.reset();
        self.cpu.regs.pc = address;
        info!(
            "kernel: {} bytes at {address:#08x}, {}",
            image.len(),
            self.board
        );
        Ok(())
    }

    /// Place a device tree blob at the top of DRAM and pass its address
    /// in ER0. Returns the address.
    pub fn load_dtb(&mut self, blob: &[u8]) -> Result<u32, MachineError> {
        let top = self.board.dtb_top();
        let address = u32::try_from(blob.len())
            .ok()
            .and_then(|len| top.checked_sub(len))
            .filter(|&address| address >= DRAM_BASE)
            .ok_or(MachineError::ImageTooLarge {
                name: "dtb",
                address: DRAM_BASE,
                len: blob.len(),
                room: (top - DRAM_BASE) as usize,
            })?;
        load_image(&mut self.bus, "dtb", address, blob, None)?;
        self.cpu.regs.er[0] = address;
        debug!("dtb: {} bytes at {address:#08x}", blob.len());
        Ok(address)
    }

    /// Reset the CPU and peripherals. Memory and elapsed time survive.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.cpu.set_interrupt_mode(self.bus.interrupt_mode());
    }

    #[must_use]
    pub fn board(&self) -> Board {
        self.board
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SocBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SocBus {
        &mut self.bus
    }

    #[must_use]
    pub fn now(&self) -> Ticks {
        self.cpu.total_cycles()
    }

    #[must_use]
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Run one step of the loop described in the module docs.
    pub fn step(&mut self) -> StepOutcome {
        let now = self.now();
        if self.bus.next_deadline() <= now {
            self.bus.sync_timers(now);
        }
        self.cpu.set_interrupt_mode(self.bus.interrupt_mode());
        self.cpu.set_irq(self.bus.intc.request());
        self.bus.set_now(now);

        let outcome = self.cpu.step(&mut self.bus);
        match outcome {
            StepOutcome::Executed | StepOutcome::IllegalInstruction { .. } => {
                self.instructions += 1;
            }
            StepOutcome::Sleeping => {
                let deadline = self.bus.next_deadline();
                if deadline != Ticks::NEVER {
                    self.cpu.idle(deadline.since(now));
                }
            }
            StepOutcome::Interrupt { .. } | StepOutcome::Breakpoint { .. } => {}
        }
        outcome
    }

    /// Step until a breakpoint, a dead sleep, or `budget` more
    /// instructions have run.
    pub fn run(&mut self, budget: Option<u64>) -> StopReason {
        let limit = budget.map(|n| self.instructions.saturating_add(n));
        loop {
            if limit.is_some_and(|limit| self.instructions >= limit) {
                return StopReason::Budget;
            }
            match self.step() {
                StepOutcome::Breakpoint { address } => {
                    return StopReason::Breakpoint { address };
                }
                StepOutcome::Sleeping if self.bus.next_deadline() == Ticks::NEVER => {
                    return StopReason::Halted;
                }
                _ => {}
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> MachineStatus {
        let regs = &self.cpu.regs;
        MachineStatus {
            board: self.board,
            soc: self.board.soc(),
            clock_hz: self.clock.frequency_hz,
            pc: regs.pc,
            ccr: regs.ccr.to_byte(),
            exr: self
                .cpu
                .model()
                .has_exr()
                .then(|| regs.exr.to_byte()),
            er: regs.er,
            interrupt_mode: format!("{:?}", self.cpu.interrupt_mode()),
            sleeping: self.cpu.is_sleeping(),
            asserted: self.bus.intc.asserted().map(|s| s as u8),
            cycles: self.now().get(),
            elapsed_ns: self.clock.nanos(self.now()),
            instructions: self.instructions,
        }
    }

    /// Read memory the way the CPU would, including peripheral side
    /// effects.
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        self.bus.set_now(self.now());
        self.bus.read_byte(addr)
    }
}

fn parse_address(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl Observable for Machine {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|addr| Value::U8(self.bus.peek(addr)))
        } else {
            match path {
                "instructions" => Some(self.instructions.into()),
                "elapsed_ns" => Some(self.clock.nanos(self.now()).into()),
                _ => self.bus.query(path).or_else(|| self.cpu.query(path)),
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<h8_paths>",
            "memory.<address>",
            "intc.<controller_paths>",
            "tmr<unit>.<tmr_paths>",
            "timer16.<timer16_paths>",
            "tpu.<tpu_paths>",
            "syscr",
            "deadline",
            "instructions",
            "elapsed_ns",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_boot_layout() {
        let mut m = Machine::new(Board::Kanebebe, 25_000_000);
        m.boot_kernel(&[0x01, 0x80], 0x68_0000).unwrap();
        assert_eq!(m.cpu().regs.pc, 0x68_0000);
        assert_eq!(m.bus().peek(0x68_0001), 0x80);
        // Vector 7 (NMI) points into the trampoline area.
        assert_eq!(m.query("memory.0x1f"), Some(Value::U8(0x3C)));
    }

    #[test]
    fn kernel_over_the_limit() {
        let mut m = Machine::new(Board::Kanebebe, 25_000_000);
        let image = vec![0; Board::Kanebebe.kernel_max() + 1];
        assert!(matches!(
            m.boot_kernel(&image, 0x40_0000),
            Err(MachineError::ImageTooLarge { name: "kernel", .. })
        ));
    }

    #[test]
    fn dtb_sits_at_the_top_of_dram() {
        let mut m = Machine::new(Board::Edosk2674, 33_333_333);
        let address = m.load_dtb(&[0xD0, 0x0D, 0xFE, 0xED]).unwrap();
        assert_eq!(address, 0x7F_FFFC);
        assert_eq!(m.cpu().regs.er[0], 0x7F_FFFC);
    }

    #[test]
    fn firmware_reset_vector() {
        let mut m = Machine::new(Board::Edosk2674, 33_333_333);
        m.load_firmware(&[0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(m.cpu().regs.pc, 0x100);
        assert_eq!(m.query("cpu.pc"), Some(Value::U32(0x100)));
        assert_eq!(m.query("pc"), Some(Value::U32(0x100)));
    }

    #[test]
    fn sleeping_without_timers_halts() {
        let mut m = Machine::new(Board::Kanebebe, 25_000_000);
        let mut image = vec![0; 0x102];
        image[2] = 0x01;
        // SLEEP
        image[0x100] = 0x01;
        image[0x101] = 0x80;
        m.load_firmware(&image).unwrap();
        assert_eq!(m.run(Some(10)), StopReason::Halted);
        assert!(m.cpu().is_sleeping());
        assert_eq!(m.instructions(), 1);
    }

    #[test]
    fn budget_and_breakpoint() {
        let mut m = Machine::new(Board::Kanebebe, 25_000_000);
        // NOPs from 0x100.
        let mut image = vec![0; 0x110];
        image[2] = 0x01;
        m.load_firmware(&image).unwrap();
        assert_eq!(m.run(Some(3)), StopReason::Budget);
        assert_eq!(m.cpu().regs.pc, 0x106);

        m.cpu_mut().add_breakpoint(0x10A);
        assert_eq!(m.run(None), StopReason::Breakpoint { address: 0x10A });
        assert_eq!(m.instructions(), 5);
    }
}
