//! Counting engine shared by every timer channel.
//!
//! A counter steps by one per count. A compare matches when the counter
//! becomes equal to its value. A channel with a clear compare returns to
//! zero on the count after that compare matches; otherwise the counter
//! wraps from `top` to zero, which is an overflow. A clear compare equal
//! to `top` clears instead of overflowing.

/// Watch-mask bit for the overflow event. Bits 0-3 select compares.
pub const OVERFLOW: u8 = 1 << 4;

const WATCH_ALL: u8 = OVERFLOW | 0x0F;

/// Events crossed while advancing a counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Events {
    pub matches: [u64; 4],
    pub overflows: u64,
}

impl Events {
    /// Watch-mask bits of every event that happened at least once.
    #[must_use]
    pub fn mask(&self) -> u8 {
        let compares = self
            .matches
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .fold(0, |acc, (i, _)| acc | (1 << i));
        if self.overflows > 0 {
            compares | OVERFLOW
        } else {
            compares
        }
    }
}

/// Counter geometry: width, compare registers and clear selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    top: u32,
    compares: [u32; 4],
    used: usize,
    clear: Option<usize>,
}

impl Counter {
    /// `compares` beyond the fourth are ignored. A `clear` index outside
    /// `compares` means the counter runs free.
    #[must_use]
    pub fn new(top: u32, compares: &[u32], clear: Option<usize>) -> Self {
        let used = compares.len().min(4);
        let mut values = [0; 4];
        values[..used].copy_from_slice(&compares[..used]);
        Self {
            top,
            compares: values,
            used,
            clear: clear.filter(|&c| c < used),
        }
    }

    fn clear_point(&self) -> Option<u32> {
        self.clear.map(|c| self.compares[c])
    }

    /// Counts from `value` until the counter next becomes `target`.
    fn steps_to(&self, value: u32, target: u32) -> Option<u64> {
        if target > self.top {
            return None;
        }
        match self.clear_point() {
            Some(c) if value <= c => {
                if target > c {
                    None
                } else if target > value {
                    Some(u64::from(target - value))
                } else {
                    Some(u64::from(c - value) + 1 + u64::from(target))
                }
            }
            clear => {
                if target > value {
                    Some(u64::from(target - value))
                } else if clear.is_some_and(|c| target > c) {
                    None
                } else {
                    Some(u64::from(self.top - value) + 1 + u64::from(target))
                }
            }
        }
    }

    fn steps_to_overflow(&self, value: u32) -> Option<u64> {
        match self.clear_point() {
            Some(c) if value <= c => None,
            _ => Some(u64::from(self.top - value) + 1),
        }
    }

    /// Length of the repeating cycle `value` is on, if it is on one.
    fn period(&self, value: u32) -> Option<u64> {
        match self.clear_point() {
            Some(c) if value <= c => Some(u64::from(c) + 1),
            Some(_) => None,
            None => Some(u64::from(self.top) + 1),
        }
    }

    /// Counts from `value` until the next event selected by `watch`, or
    /// `None` if none of them can happen.
    #[must_use]
    pub fn distance(&self, value: u32, watch: u8) -> Option<u64> {
        debug_assert!(value <= self.top);
        let compares = (0..self.used)
            .filter(|&i| watch & (1 << i) != 0)
            .filter_map(|i| self.steps_to(value, self.compares[i]));
        let overflow = if watch & OVERFLOW != 0 {
            self.steps_to_overflow(value)
        } else {
            None
        };
        compares.chain(overflow).min()
    }

    /// Advance `value` by `counts` and report the events crossed.
    pub fn advance(&self, value: &mut u32, counts: u64) -> Events {
        debug_assert!(*value <= self.top);
        let mut events = Events::default();
        let mut remaining = counts;
        while remaining > 0 {
            if let Some(period) = self.period(*value) {
                let cycles = remaining / period;
                if cycles > 0 {
                    for i in 0..self.used {
                        if self.steps_to(*value, self.compares[i]).is_some() {
                            events.matches[i] += cycles;
                        }
                    }
                    if self.steps_to_overflow(*value).is_some() {
                        events.overflows += cycles;
                    }
                    remaining %= period;
                    continue;
                }
            }

            let Some(step) = self.distance(*value, WATCH_ALL) else {
                break;
            };
            if step > remaining {
                *value += remaining as u32;
                break;
            }
            let before = *value;
            let mut landed = before;
            for i in 0..self.used {
                if self.steps_to(before, self.compares[i]) == Some(step) {
                    events.matches[i] += 1;
                    landed = self.compares[i];
                }
            }
            if self.steps_to_overflow(before) == Some(step) {
                events.overflows += 1;
                landed = 0;
            }
            *value = landed;
            remaining -= step;
        }
        events
    }
}
