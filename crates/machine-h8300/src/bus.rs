//! SoC bus: memory and peripheral routing.
//!
//! Implements `H8Bus` for both SoCs. Memory regions take byte accesses;
//! peripheral windows see the CPU's access width so word-only registers
//! behave. Long accesses arrive as two word accesses.
//!
//! Timer outputs are wired to controller inputs through [`Wired`], which
//! offsets a timer's local line numbers by the window's IRQ base.

use emu_core::{AccessSize, IrqSink, Observable, Ticks, Value};
use renesas_h8300::{ADDRESS_MASK, H8Bus, InterruptMode};
use renesas_intc::InterruptController;
use renesas_timer::{Timer16, Tmr, Tpu, TpuWindow};
use tracing::{debug, warn};

use crate::memory::Ram;
use crate::soc::{Device, SYSCR_RESET, SYSCR_UE, Soc, Window};

/// Controller inputs seen through a timer's local line numbers.
struct Wired<'a> {
    intc: &'a mut InterruptController,
    base: usize,
}

impl IrqSink for Wired<'_> {
    fn set_irq(&mut self, line: usize, level: bool) {
        self.intc.assert(self.base + line, level);
    }
}

/// The SoC bus, owning memory, the interrupt controller and the timers.
pub struct SocBus {
    soc: Soc,
    pub memory: Vec<Ram>,
    pub intc: InterruptController,
    pub tmr: Vec<Tmr>,
    pub timer16: Option<Timer16>,
    pub tpu: Option<Tpu>,
    syscr: u8,
    /// Start time of the instruction in progress.
    now: Ticks,
}

impl SocBus {
    /// Build the SoC with its on-chip memory. Boards add external
    /// regions with [`SocBus::add_memory`].
    #[must_use]
    pub fn new(soc: Soc) -> Self {
        let (iram_base, iram_size) = soc.iram();
        let mut memory = vec![Ram::new("iram", iram_base, iram_size)];
        if let Some((base, size)) = soc.flash() {
            memory.push(Ram::new("flash", base, size));
        }
        Self {
            soc,
            memory,
            intc: InterruptController::new(soc.intc_model()),
            tmr: (0..soc.tmr_units()).map(|_| Tmr::new(soc.tmr_model())).collect(),
            timer16: soc.has_timer16().then(Timer16::new),
            tpu: soc.has_tpu().then(Tpu::new),
            syscr: SYSCR_RESET,
            now: Ticks::ZERO,
        }
    }

    pub fn add_memory(&mut self, ram: Ram) {
        self.memory.push(ram);
    }

    #[must_use]
    pub fn soc(&self) -> Soc {
        self.soc
    }

    /// Reset peripherals. Memory contents survive.
    pub fn reset(&mut self) {
        self.intc.reset();
        for tmr in &mut self.tmr {
            tmr.reset();
        }
        if let Some(timer16) = &mut self.timer16 {
            timer16.reset();
        }
        if let Some(tpu) = &mut self.tpu {
            tpu.reset();
        }
        self.syscr = SYSCR_RESET;
    }

    /// Set the time peripheral accesses in the next step are made at.
    pub fn set_now(&mut self, now: Ticks) {
        self.now = now;
    }

    /// CPU interrupt control mode: SYSCR.UE on the H8/3069, INTCR.INTM
    /// on the H8S/2674.
    #[must_use]
    pub fn interrupt_mode(&self) -> InterruptMode {
        match self.soc {
            Soc::H83069 if self.syscr & SYSCR_UE != 0 => InterruptMode::Ccr,
            Soc::H83069 => InterruptMode::CcrUi,
            Soc::H8S2674 => self.intc.interrupt_mode(),
        }
    }

    /// Earliest time any timer has an event to deliver.
    #[must_use]
    pub fn next_deadline(&self) -> Ticks {
        let tmr = self.tmr.iter().map(Tmr::next_deadline);
        let timer16 = self.timer16.iter().map(Timer16::next_deadline);
        let tpu = self.tpu.iter().map(Tpu::next_deadline);
        tmr.chain(timer16).chain(tpu).min().unwrap_or(Ticks::NEVER)
    }

    /// Bring every timer up to `now`, raising the interrupts that fell due.
    pub fn sync_timers(&mut self, now: Ticks) {
        for window in self.soc.windows() {
            let base = window.irq_base;
            let mut irq = Wired {
                intc: &mut self.intc,
                base,
            };
            match window.device {
                Device::Tmr(unit) => self.tmr[unit].sync(now, &mut irq),
                Device::Timer16 => {
                    if let Some(timer16) = &mut self.timer16 {
                        timer16.sync(now, &mut irq);
                    }
                }
                // One sync covers all six channels.
                Device::Tpu(TpuWindow::Common) => {
                    if let Some(tpu) = &mut self.tpu {
                        tpu.sync(now, &mut irq);
                    }
                }
                _ => {}
            }
        }
    }

    /// Memory region holding `addr`.
    #[must_use]
    pub fn region(&self, addr: u32) -> Option<&Ram> {
        self.memory.iter().find(|r| r.contains(addr))
    }

    pub fn region_mut(&mut self, addr: u32) -> Option<&mut Ram> {
        self.memory.iter_mut().find(|r| r.contains(addr))
    }

    /// Read memory without side effects. Peripheral and unmapped
    /// addresses read as 0.
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.region(addr).map_or(0, |r| r.read(addr))
    }

    fn device_read(&mut self, window: Window, offset: u32, size: AccessSize) -> u16 {
        let now = self.now;
        let mut irq = Wired {
            intc: &mut self.intc,
            base: window.irq_base,
        };
        match window.device {
            Device::Syscr => match size {
                AccessSize::Byte => u16::from(self.syscr),
                AccessSize::Word => {
                    warn!(target: "guest", "SYSCR word read");
                    0xFFFF
                }
            },
            Device::Intc(region) => irq.intc.read(region, offset, size),
            Device::Tmr(unit) => self.tmr[unit].read(offset, size, now, &mut irq),
            Device::Timer16 => self
                .timer16
                .as_mut()
                .map_or(0, |t| t.read(offset, size, now, &mut irq)),
            Device::Tpu(tpu_window) => self
                .tpu
                .as_mut()
                .map_or(0, |t| t.read(tpu_window, offset, size, now, &mut irq)),
        }
    }

    fn device_write(&mut self, window: Window, offset: u32, size: AccessSize, value: u16) {
        let now = self.now;
        let mut irq = Wired {
            intc: &mut self.intc,
            base: window.irq_base,
        };
        match window.device {
            Device::Syscr => match size {
                AccessSize::Byte => self.syscr = value as u8,
                AccessSize::Word => warn!(target: "guest", "SYSCR word write {value:#06x}"),
            },
            Device::Intc(region) => irq.intc.write(region, offset, size, value),
            Device::Tmr(unit) => self.tmr[unit].write(offset, size, value, now, &mut irq),
            Device::Timer16 => {
                if let Some(timer16) = &mut self.timer16 {
                    timer16.write(offset, size, value, now, &mut irq);
                }
            }
            Device::Tpu(tpu_window) => {
                if let Some(tpu) = &mut self.tpu {
                    tpu.write(tpu_window, offset, size, value, now, &mut irq);
                }
            }
        }
    }
}

impl H8Bus for SocBus {
    fn read_byte(&mut self, addr: u32) -> u8 {
        if let Some(ram) = self.region(addr) {
            return ram.read(addr);
        }
        if let Some((window, offset)) = self.soc.decode(addr) {
            return self.device_read(window, offset, AccessSize::Byte) as u8;
        }
        debug!(target: "unimp", "read from unmapped {addr:#08x}");
        0
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        if let Some(ram) = self.region_mut(addr) {
            ram.write(addr, value);
            return;
        }
        if let Some((window, offset)) = self.soc.decode(addr) {
            self.device_write(window, offset, AccessSize::Byte, u16::from(value));
            return;
        }
        debug!(target: "unimp", "write {value:#04x} to unmapped {addr:#08x}");
    }

    fn read_word(&mut self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK & !1;
        match self.soc.decode(addr) {
            Some((window, offset)) => self.device_read(window, offset, AccessSize::Word),
            None => u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr | 1)]),
        }
    }

    fn write_word(&mut self, addr: u32, value: u16) {
        let addr = addr & ADDRESS_MASK & !1;
        match self.soc.decode(addr) {
            Some((window, offset)) => self.device_write(window, offset, AccessSize::Word, value),
            None => {
                let [hi, lo] = value.to_be_bytes();
                self.write_byte(addr, hi);
                self.write_byte(addr | 1, lo);
            }
        }
    }

    fn interrupt_ack(&mut self, vector: u8) {
        self.intc.acknowledge(vector);
    }
}

impl Observable for SocBus {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("intc.") {
            return self.intc.query(rest);
        }
        if let Some(rest) = path.strip_prefix("timer16.") {
            return self.timer16.as_ref()?.query(rest);
        }
        if let Some(rest) = path.strip_prefix("tpu.") {
            return self.tpu.as_ref()?.query(rest);
        }
        if let Some(rest) = path.strip_prefix("tmr") {
            let (unit, rest) = rest.split_once('.')?;
            let unit: usize = unit.parse().ok()?;
            return self.tmr.get(unit)?.query(rest);
        }
        match path {
            "syscr" if self.soc == Soc::H83069 => Some(Value::U8(self.syscr)),
            "deadline" => Some(Value::U64(self.next_deadline().get())),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "intc.<controller_paths>",
            "tmr<unit>.<tmr_paths>",
            "timer16.<timer16_paths>",
            "tpu.<tpu_paths>",
            "syscr",
            "deadline",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_chip_memory_and_unmapped() {
        let mut bus = SocBus::new(Soc::H83069);
        bus.write_long(0xFF_BF20, 0x1234_5678);
        assert_eq!(bus.read_word(0xFF_BF22), 0x5678);
        assert_eq!(bus.read_byte(0x00_0000), 0);
        bus.write_byte(0x80_0000, 0xAA);
        assert_eq!(bus.read_byte(0x80_0000), 0);
    }

    #[test]
    fn syscr_selects_interrupt_mode() {
        let mut bus = SocBus::new(Soc::H83069);
        assert_eq!(bus.read_byte(0xFE_E012), 0x09);
        assert_eq!(bus.interrupt_mode(), InterruptMode::Ccr);
        bus.write_byte(0xFE_E012, 0x01);
        assert_eq!(bus.interrupt_mode(), InterruptMode::CcrUi);
        bus.reset();
        assert_eq!(bus.interrupt_mode(), InterruptMode::Ccr);
    }

    #[test]
    fn intcr_selects_interrupt_mode() {
        let mut bus = SocBus::new(Soc::H8S2674);
        assert_eq!(bus.interrupt_mode(), InterruptMode::Ccr);
        // INTM = 2
        bus.write_byte(0xFF_FF31, 0x20);
        assert_eq!(bus.interrupt_mode(), InterruptMode::Exr);
    }

    #[test]
    fn tmr_unit_one_drives_its_own_inputs() {
        let mut bus = SocBus::new(Soc::H83069);
        // TCORA2 = 3, TCR2 = CMIEA | φ/8.
        bus.write_byte(0xFF_FF94, 3);
        bus.write_byte(0xFF_FF90, 0x41);
        assert_eq!(bus.next_deadline(), Ticks::new(24));
        bus.sync_timers(Ticks::new(24));
        assert!(bus.intc.is_pending(40));
        assert_eq!(bus.intc.asserted(), Some(40));
    }

    #[test]
    fn word_access_reaches_word_registers() {
        let mut bus = SocBus::new(Soc::H8S2674);
        // TPU channel 0 TGRA.
        bus.write_word(0xFF_FFD8, 0x1234);
        assert_eq!(bus.read_word(0xFF_FFD8), 0x1234);
        assert_eq!(bus.read_long(0xFF_FFD8), 0x1234_FFFF);
    }

    #[test]
    fn query_routes_by_prefix() {
        let bus = SocBus::new(Soc::H83069);
        assert_eq!(bus.query("syscr"), Some(Value::U8(0x09)));
        assert_eq!(bus.query("tmr1.tcsr1"), Some(Value::U8(0x10)));
        assert_eq!(bus.query("tpu.tstr"), None);
        assert_eq!(bus.query("intc.asserted"), Some(Value::from(None::<u8>)));
    }
}
