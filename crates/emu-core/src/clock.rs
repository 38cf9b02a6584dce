//! System clock configuration.

use crate::Ticks;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Peripheral clock (φ) configuration for a board.
///
/// The H8/3069 boards run at 25 MHz, the EDOSK-2674 at 33.33 MHz. Every
/// timer prescaler divides this frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    /// φ frequency in Hz.
    pub frequency_hz: u64,
}

impl SystemClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks elapsed in the given number of milliseconds.
    #[must_use]
    pub const fn ticks_for_millis(&self, millis: u64) -> Ticks {
        Ticks::new(self.frequency_hz / 1000 * millis)
    }

    /// Virtual nanoseconds represented by a tick count.
    #[must_use]
    pub const fn nanos(&self, ticks: Ticks) -> u64 {
        if self.frequency_hz == 0 {
            return 0;
        }
        ((ticks.get() as u128 * NANOS_PER_SECOND as u128) / self.frequency_hz as u128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_and_nanos_agree() {
        let clock = SystemClock::new(25_000_000);
        let t = clock.ticks_for_millis(2);
        assert_eq!(t, Ticks::new(50_000));
        assert_eq!(clock.nanos(t), 2_000_000);
    }
}
