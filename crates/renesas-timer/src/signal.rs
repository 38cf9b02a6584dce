//! Interrupt signalling from status flags.

use emu_core::IrqSink;

/// Pulse the output line of every request bit set in `after` but not in
/// `before`. `line` maps a request bit index to a local output line;
/// bits without a line are dropped.
pub(crate) fn pulse_new_requests(
    before: u64,
    after: u64,
    irq: &mut impl IrqSink,
    line: impl Fn(usize) -> Option<usize>,
) {
    let mut fresh = after & !before;
    while fresh != 0 {
        let bit = fresh.trailing_zeros() as usize;
        fresh &= fresh - 1;
        if let Some(line) = line(bit) {
            irq.pulse(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::LineRecorder;

    #[test]
    fn only_new_bits_pulse() {
        let mut rec = LineRecorder::new();
        pulse_new_requests(0b0011, 0b1110, &mut rec, |bit| (bit != 3).then_some(bit + 10));
        assert_eq!(rec.rising_edges(12), 1);
        assert_eq!(rec.rising_edges(11), 0);
        assert_eq!(rec.events.len(), 2);
    }
}
