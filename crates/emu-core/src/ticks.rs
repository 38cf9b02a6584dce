//! The fundamental unit of time in the emulator.

/// A count of peripheral clock (φ) ticks.
///
/// CPU states and timer prescaler inputs are both measured in φ ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);
    /// A deadline that never arrives.
    pub const NEVER: Self = Self(u64::MAX);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Ticks from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Offset by a tick count, saturating at [`Ticks::NEVER`].
    #[must_use]
    pub const fn after(self, count: u64) -> Self {
        Self(self.0.saturating_add(count))
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::ops::AddAssign<u64> for Ticks {
    fn add_assign(&mut self, rhs: u64) {
        self.0 = self.0.saturating_add(rhs);
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl core::fmt::Display for Ticks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}φ", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Ticks;

    #[test]
    fn since_saturates() {
        assert_eq!(Ticks::new(10).since(Ticks::new(4)), 6);
        assert_eq!(Ticks::new(4).since(Ticks::new(10)), 0);
    }

    #[test]
    fn after_never_wraps() {
        assert_eq!(Ticks::NEVER.after(5), Ticks::NEVER);
        let mut t = Ticks::new(1);
        t += 2;
        assert_eq!(t, Ticks::new(3));
    }
}
