//! Prescaled channel clock.
//!
//! A channel's stored counter is exact at its anchor, and the anchor sits
//! on a prescaler edge. The register path and the deadline path both go
//! through [`ChannelClock::elapsed_counts`], so a read at a deadline sees
//! exactly the counts the deadline was computed from.

use emu_core::Ticks;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelClock {
    anchor: Ticks,
}

impl ChannelClock {
    #[must_use]
    pub const fn new(anchor: Ticks) -> Self {
        Self { anchor }
    }

    #[must_use]
    pub const fn anchor(&self) -> Ticks {
        self.anchor
    }

    /// Whole φ/`divisor` counts between the anchor and `now`.
    #[must_use]
    pub fn elapsed_counts(&self, now: Ticks, divisor: u64) -> u64 {
        now.since(self.anchor) / divisor.max(1)
    }

    /// Consume the counts elapsed at `now`, keeping the prescaler
    /// remainder. A channel that is not counting φ re-anchors at `now`.
    pub fn sync(&mut self, now: Ticks, divisor: Option<u64>) -> u64 {
        match divisor {
            Some(divisor) => {
                let counts = self.elapsed_counts(now, divisor);
                self.anchor = self.anchor.after(counts * divisor.max(1));
                counts
            }
            None => {
                self.anchor = now;
                0
            }
        }
    }

    /// Time at which `distance` more counts will have elapsed.
    #[must_use]
    pub fn deadline(&self, distance: u64, divisor: u64) -> Ticks {
        self.anchor.after(distance.saturating_mul(divisor.max(1)))
    }
}
