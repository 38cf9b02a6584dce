//! Exception processing: interrupt acceptance, TRAPA and trace.
//!
//! Interrupts are sampled between instructions. The mask the CPU
//! compares against depends on the interrupt control mode:
//!
//! | Mode    | mask level  | request level      |
//! |---------|-------------|--------------------|
//! | `Ccr`   | `3 * I`     | `2 + (priority>0)` |
//! | `CcrUi` | `2 * I + UI`| `2 + (priority>0)` |
//! | `Exr`   | `EXR.I`     | `priority`         |
//!
//! A request is taken when it is an NMI or its level is strictly above
//! the mask level.
//!
//! Stack frame (advanced mode), lowest address first:
//! ```text
//! SP   -> [EXR | reserved]   (Exr mode only, one word)
//!         [CCR | PC23-PC0]   (one long)
//! ```

use tracing::debug;

use crate::bus::H8Bus;
use crate::cpu::{Cpu, State};
use crate::flags::{Ccr, Exr};
use crate::registers::ADDRESS_MASK;

/// Vector of the H8S trace exception.
pub const VECTOR_TRACE: u8 = 5;
/// Vector of the non-maskable interrupt.
pub const VECTOR_NMI: u8 = 7;
/// Vector of TRAPA #0.
pub const VECTOR_TRAPA: u8 = 8;

/// Interrupt control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptMode {
    /// CCR.I masks every maskable interrupt (H8/300H UE=1, H8S INTM=0).
    #[default]
    Ccr,
    /// CCR.I and CCR.UI form a two-level mask (H8/300H UE=0, H8S INTM=1).
    CcrUi,
    /// EXR.I is a three-bit mask level (H8S INTM=2).
    Exr,
}

/// Interrupt request presented to the CPU by the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqRequest {
    /// Vector number (also the controller's source number).
    pub vector: u8,
    /// Priority from the controller's IPR lookup.
    pub priority: u8,
    /// Non-maskable.
    pub nmi: bool,
}

impl IrqRequest {
    #[must_use]
    pub const fn new(vector: u8, priority: u8) -> Self {
        Self {
            vector,
            priority,
            nmi: false,
        }
    }

    #[must_use]
    pub const fn nmi() -> Self {
        Self {
            vector: VECTOR_NMI,
            priority: 7,
            nmi: true,
        }
    }
}

/// What caused exception processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExceptionKind {
    Interrupt(IrqRequest),
    Trap,
    Trace,
}

impl Cpu {
    /// Current mask level in the active interrupt control mode.
    #[must_use]
    pub fn mask_level(&self) -> u8 {
        let ccr = &self.regs.ccr;
        match self.interrupt_mode {
            InterruptMode::Ccr => 3 * u8::from(ccr.i),
            InterruptMode::CcrUi => 2 * u8::from(ccr.i) + u8::from(ccr.ui),
            InterruptMode::Exr => self.regs.exr.i,
        }
    }

    /// Level a request competes at in the active interrupt control mode.
    #[must_use]
    pub fn request_level(&self, request: &IrqRequest) -> u8 {
        match self.interrupt_mode {
            InterruptMode::Ccr | InterruptMode::CcrUi => 2 + u8::from(request.priority > 0),
            InterruptMode::Exr => request.priority,
        }
    }

    /// True if `request` would be accepted before the next instruction.
    #[must_use]
    pub fn accepts(&self, request: &IrqRequest) -> bool {
        request.nmi || self.request_level(request) > self.mask_level()
    }

    /// Take the latched interrupt if the mask allows it.
    pub(crate) fn poll_interrupt<B: H8Bus>(&mut self, bus: &mut B) -> Option<u8> {
        let request = self.irq?;
        if !self.accepts(&request) {
            return None;
        }
        self.irq = None;
        debug!(
            target: "int",
            "interrupt vector {} accepted (priority {}, pc {:#08x})",
            request.vector, request.priority, self.regs.pc
        );
        self.enter_exception(bus, request.vector, ExceptionKind::Interrupt(request));
        bus.interrupt_ack(request.vector);
        Some(request.vector)
    }

    /// Push the return frame, mask interrupts and jump through `vector`.
    pub(crate) fn enter_exception<B: H8Bus>(&mut self, bus: &mut B, vector: u8, kind: ExceptionKind) {
        let frame = (u32::from(self.regs.ccr.to_byte()) << 24) | (self.regs.pc & ADDRESS_MASK);
        let sp = self.regs.sp().wrapping_sub(4);
        self.write_long(bus, sp, frame);
        self.regs.set_sp(sp);
        if self.interrupt_mode == InterruptMode::Exr {
            let sp = self.regs.sp().wrapping_sub(2);
            self.write_word(bus, sp, u16::from(self.regs.exr.to_byte()) << 8);
            self.regs.set_sp(sp);
        }

        self.regs.ccr.i = true;
        match (self.interrupt_mode, kind) {
            (InterruptMode::CcrUi, ExceptionKind::Interrupt(req)) => {
                if self.request_level(&req) == 3 || req.nmi {
                    self.regs.ccr.ui = true;
                }
            }
            (InterruptMode::CcrUi, _) => self.regs.ccr.ui = true,
            (InterruptMode::Exr, ExceptionKind::Interrupt(req)) => {
                self.regs.exr.i = if req.nmi { 7 } else { req.priority & 7 };
                self.regs.exr.t = false;
            }
            (InterruptMode::Exr, _) => self.regs.exr.t = false,
            (InterruptMode::Ccr, _) => {}
        }

        self.regs.pc = self.read_long(bus, u32::from(vector) * 4) & ADDRESS_MASK;
        self.state = State::Running;
        self.cycles += 8;
    }

    /// Return from exception: pop EXR (Exr mode) and the CCR/PC long.
    pub(crate) fn return_from_exception<B: H8Bus>(&mut self, bus: &mut B) {
        if self.interrupt_mode == InterruptMode::Exr {
            let sp = self.regs.sp();
            let exr = self.read_word(bus, sp);
            self.regs.exr = Exr::from_byte((exr >> 8) as u8);
            self.regs.set_sp(sp.wrapping_add(2));
        }
        let sp = self.regs.sp();
        let frame = self.read_long(bus, sp);
        self.regs.set_sp(sp.wrapping_add(4));
        self.regs.ccr = Ccr::from_byte((frame >> 24) as u8);
        self.regs.pc = frame & ADDRESS_MASK;
    }
}
