//! Request latching, priority resolution and acknowledge.

use emu_core::{IrqSink, Observable, Value};
use renesas_h8300::{InterruptMode, IrqRequest};
use tracing::{debug, warn};

use crate::model::{IntcModel, NMI_SOURCE};

/// How a source's input level becomes a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Requested while the line is low.
    LowLevel,
    Falling,
    Rising,
    BothEdges,
}

/// H8/300H or H8S interrupt controller.
#[derive(Debug, Clone)]
pub struct InterruptController {
    model: IntcModel,

    // === Registers ===
    /// IPRA.. in order. The H8/300H uses only the low byte of two entries.
    pub(crate) ipr: [u16; 11],
    pub(crate) ier: u16,
    pub(crate) isr: u16,
    /// Two bits per IRQ on the H8S (ISCRH:ISCRL), one bit on the H8/300H.
    pub(crate) iscr: u32,
    pub(crate) itsr: u16,
    pub(crate) ssier: u16,
    pub(crate) intcr: u8,
    /// Last valid INTCR.INTM value.
    pub(crate) intm: u8,

    // === Source state ===
    pending: u128,
    levels: u128,
    asserted: Option<usize>,
}

const fn bit(source: usize) -> u128 {
    1 << source
}

impl InterruptController {
    #[must_use]
    pub fn new(model: IntcModel) -> Self {
        let mut intc = Self {
            model,
            ipr: [0; 11],
            ier: 0,
            isr: 0,
            iscr: 0,
            itsr: 0,
            ssier: 0,
            intcr: 0,
            intm: 0,
            pending: 0,
            levels: 0,
            asserted: None,
        };
        intc.reset();
        intc
    }

    /// Power-on state: nothing pending, external pins idle high.
    pub fn reset(&mut self) {
        let ipr_reset = match self.model {
            IntcModel::H8300H => 0,
            IntcModel::H8S => 0x7777,
        };
        self.ipr = [0; 11];
        self.ipr[..self.model.ipr_count()].fill(ipr_reset);
        self.ier = 0;
        self.isr = 0;
        self.iscr = 0;
        self.itsr = 0;
        self.ssier = 0;
        self.intcr = 0;
        self.intm = 0;
        self.pending = 0;
        self.levels = (0..self.model.external_irqs())
            .map(|n| bit(self.model.external_irq(n)))
            .fold(0, |acc, b| acc | b);
        self.asserted = None;
    }

    #[must_use]
    pub fn model(&self) -> IntcModel {
        self.model
    }

    /// Trigger mode of `source`. Internal sources latch on a rising edge.
    #[must_use]
    pub fn trigger(&self, source: usize) -> Trigger {
        let Some(n) = self.model.external_index(source) else {
            return Trigger::Rising;
        };
        match self.model {
            IntcModel::H8300H => {
                if self.iscr & (1 << n) != 0 {
                    Trigger::Falling
                } else {
                    Trigger::LowLevel
                }
            }
            IntcModel::H8S => match (self.iscr >> (n * 2)) & 3 {
                0 => Trigger::LowLevel,
                1 => Trigger::Falling,
                2 => Trigger::Rising,
                _ => Trigger::BothEdges,
            },
        }
    }

    /// Drive input `source` to `level`.
    pub fn assert(&mut self, source: usize, level: bool) {
        if source >= self.model.sources() {
            warn!(target: "guest", "interrupt source {source} out of range");
            return;
        }
        if !self.model.is_deliverable(source) {
            warn!(target: "guest", "interrupt source {source} has no priority assignment");
            return;
        }

        let trigger = self.trigger(source);
        let previous = self.levels & bit(source) != 0;
        if level {
            self.levels |= bit(source);
        } else {
            self.levels &= !bit(source);
        }

        let detected = match trigger {
            Trigger::LowLevel => !level,
            Trigger::Falling => previous && !level,
            Trigger::Rising => !previous && level,
            Trigger::BothEdges => previous != level,
        };
        if detected {
            self.latch(source);
        } else if trigger == Trigger::LowLevel && level {
            self.pending &= !bit(source);
        }
        self.resolve();
    }

    /// Record a request and, for external lines, its ISR flag. The flag
    /// sets whatever IER says; IER only gates delivery.
    fn latch(&mut self, source: usize) {
        self.pending |= bit(source);
        if let Some(n) = self.model.external_index(source) {
            self.isr |= 1 << n;
        }
    }

    /// Low-level external line currently held low.
    fn is_held(&self, source: usize) -> bool {
        self.trigger(source) == Trigger::LowLevel && self.levels & bit(source) == 0
    }

    /// Internal sources are gated at the peripheral; external IRQs by IER.
    fn is_enabled(&self, source: usize) -> bool {
        self.model
            .external_index(source)
            .is_none_or(|n| self.ier & (1 << n) != 0)
    }

    /// The CPU accepted `vector`: retire its request and re-resolve.
    ///
    /// A low-level external line that is still low stays pending.
    pub fn acknowledge(&mut self, vector: u8) {
        let source = usize::from(vector);
        if self.asserted != Some(source) {
            debug!(target: "int", "acknowledge of vector {vector} while {:?} asserted", self.asserted);
        }
        if source < self.model.sources() && !self.is_held(source) {
            self.pending &= !bit(source);
            if let Some(n) = self.model.external_index(source) {
                self.isr &= !(1 << n);
            }
        }
        self.resolve();
    }

    /// Drop pending requests whose ISR flag the guest cleared. A line
    /// still held low keeps its request and sets the flag again.
    pub(crate) fn sync_isr(&mut self) {
        for n in 0..self.model.external_irqs() {
            let source = self.model.external_irq(n);
            if self.isr & (1 << n) != 0 {
                continue;
            }
            if self.is_held(source) {
                self.latch(source);
            } else {
                self.pending &= !bit(source);
            }
        }
    }

    /// Latch every external line that is low under a low-level trigger.
    /// An ISCR write can turn a held line into a request without an edge.
    pub(crate) fn latch_held_lines(&mut self) {
        for n in 0..self.model.external_irqs() {
            let source = self.model.external_irq(n);
            if self.is_held(source) {
                self.latch(source);
            }
        }
    }

    /// Recompute the asserted source: NMI first, then the highest
    /// priority pending and enabled source, ties to the lowest number.
    pub(crate) fn resolve(&mut self) {
        if self.pending & bit(NMI_SOURCE) != 0 {
            self.asserted = Some(NMI_SOURCE);
            return;
        }
        let mut best: Option<(usize, u8)> = None;
        for source in 0..self.model.sources() {
            if self.pending & bit(source) == 0 || !self.is_enabled(source) {
                continue;
            }
            let Some(priority) = self.model.priority(source, &self.ipr) else {
                continue;
            };
            if best.is_none_or(|(_, p)| priority > p) {
                best = Some((source, priority));
            }
        }
        self.asserted = best.map(|(source, _)| source);
    }

    /// Source currently presented to the CPU.
    #[must_use]
    pub fn asserted(&self) -> Option<usize> {
        self.asserted
    }

    #[must_use]
    pub fn is_pending(&self, source: usize) -> bool {
        source < 128 && self.pending & bit(source) != 0
    }

    /// Request for the CPU's latch, or `None` when nothing is asserted.
    #[must_use]
    pub fn request(&self) -> Option<IrqRequest> {
        let source = self.asserted?;
        if source == NMI_SOURCE {
            return Some(IrqRequest::nmi());
        }
        let priority = self.model.priority(source, &self.ipr)?;
        Some(IrqRequest::new(source as u8, priority))
    }

    /// CPU interrupt control mode selected by INTCR.INTM (H8S).
    #[must_use]
    pub fn interrupt_mode(&self) -> InterruptMode {
        match self.intm {
            1 => InterruptMode::CcrUi,
            2 => InterruptMode::Exr,
            _ => InterruptMode::Ccr,
        }
    }

    fn pending_sources(&self) -> Vec<Value> {
        (0..self.model.sources())
            .filter(|&s| self.pending & bit(s) != 0)
            .map(|s| Value::U8(s as u8))
            .collect()
    }
}

impl IrqSink for InterruptController {
    fn set_irq(&mut self, line: usize, level: bool) {
        self.assert(line, level);
    }
}

impl Observable for InterruptController {
    fn query(&self, path: &str) -> Option<Value> {
        Some(match path {
            "asserted" => Value::from(self.asserted.map(|s| s as u8)),
            "pending" => Value::List(self.pending_sources()),
            "ipr" => Value::List(
                self.ipr[..self.model.ipr_count()]
                    .iter()
                    .map(|&v| Value::U16(v))
                    .collect(),
            ),
            "ier" => Value::U16(self.ier),
            "isr" => Value::U16(self.isr),
            "iscr" => Value::U32(self.iscr),
            "intm" => Value::U8(self.intm),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["asserted", "pending", "ipr", "ier", "isr", "iscr", "intm"]
    }
}
