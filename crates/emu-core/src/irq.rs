//! IRQ line signalling between peripherals and the interrupt controller.

/// Receiver for IRQ line level changes.
///
/// Peripherals own numbered output lines starting at 0. Board wiring
/// translates those numbers into interrupt controller inputs.
pub trait IrqSink {
    /// Drive `line` to `level`.
    fn set_irq(&mut self, line: usize, level: bool);

    /// Raise and drop `line`, signalling a single event.
    fn pulse(&mut self, line: usize) {
        self.set_irq(line, true);
        self.set_irq(line, false);
    }
}

/// Sink that discards every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl IrqSink for NullSink {
    fn set_irq(&mut self, _line: usize, _level: bool) {}
}

/// Sink that records every level change, in order.
#[derive(Debug, Default, Clone)]
pub struct LineRecorder {
    pub events: Vec<(usize, bool)>,
}

impl LineRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rising edges seen on `line`.
    #[must_use]
    pub fn rising_edges(&self, line: usize) -> usize {
        self.events
            .iter()
            .filter(|&&(l, level)| l == line && level)
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl IrqSink for LineRecorder {
    fn set_irq(&mut self, line: usize, level: bool) {
        self.events.push((line, level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_is_one_rising_edge() {
        let mut rec = LineRecorder::new();
        rec.pulse(3);
        assert_eq!(rec.events, vec![(3, true), (3, false)]);
        assert_eq!(rec.rising_edges(3), 1);
        assert_eq!(rec.rising_edges(2), 0);
    }
}
