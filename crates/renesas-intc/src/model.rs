//! Controller variants and their fixed priority tables.

/// Source number of the non-maskable interrupt on both variants.
pub const NMI_SOURCE: usize = 7;

/// Interrupt controller variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntcModel {
    /// H8/300H (H8/3069): IPRA/IPRB select priority 0 or 1 per group.
    H8300H,
    /// H8S (H8S/2674): IPRA-IPRK hold a 3-bit level per group.
    H8S,
}

// IPR bit per source. 0-7 index IPRA and 8-15 index IPRB, so 7 is IPRA7
// and 15 is IPRB7. -1: no priority assignment.
#[rustfmt::skip]
const H8300H_IPR_BIT: [i8; 64] = [
    -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1,  7,  6,  5,  5,
     4,  4, -1, -1,  3,  3,  3,  3,
     2,  2,  2, -1,  1,  1,  1, -1,
     0,  0,  0, -1, 15, 15, 15, 15,
    14, 14, 14, 14, 13, 13, 13, 13,
    -1, -1, -1, -1, 11, 11, 11, 11,
    10, 10, 10, 10,  9,  9,  9,  9,
];

// IPR field per source. Field f is IPR[f / 4] bits (f % 4) * 4 + 2..0,
// so field 3 is IPRA14-12 and field 0 is IPRA2-0. -1: none.
#[rustfmt::skip]
const H8S_IPR_FIELD: [i8; 128] = [
    -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1,
     3,  2,  1,  0,  7,  6,  5,  4,
    11, 10,  9,  8, 15, 14, 13, 12,
    19, 18, 17, 16, 23, 23, 22, 22,
    21, 21, 21, 21, 21, 21, 21, 21,
    20, 20, 20, 20, 27, 27, 27, 27,
    26, 26, 26, 26, 26, 26, 26, 26,
    25, 25, 25, 25, 24, 24, 24, 24,
    31, 31, 31, 31, 30, 30, 30, 30,
    29, 29, 29, 29, 28, 35, 34, 33,
    32, 32, 32, 32, 39, 39, 39, 39,
    38, 38, 38, 38, 37, 37, 37, 37,
    36, 36, 36, 36, 43, 43, 43, 43,
    42, 42, 42, 42, 41, 41, 41, 41,
    40, 40, 40, 40, 40, 40, 40, 40,
];

impl IntcModel {
    /// Number of interrupt sources (and vectors).
    #[must_use]
    pub const fn sources(self) -> usize {
        match self {
            Self::H8300H => 64,
            Self::H8S => 128,
        }
    }

    /// Number of IPR registers.
    #[must_use]
    pub const fn ipr_count(self) -> usize {
        match self {
            Self::H8300H => 2,
            Self::H8S => 11,
        }
    }

    /// Number of external IRQ pins.
    #[must_use]
    pub const fn external_irqs(self) -> usize {
        match self {
            Self::H8300H => 6,
            Self::H8S => 16,
        }
    }

    const fn external_base(self) -> usize {
        match self {
            Self::H8300H => 12,
            Self::H8S => 16,
        }
    }

    /// Source number of external pin IRQn.
    #[must_use]
    pub const fn external_irq(self, n: usize) -> usize {
        self.external_base() + n
    }

    /// External pin number if `source` is an IRQn input.
    #[must_use]
    pub fn external_index(self, source: usize) -> Option<usize> {
        let base = self.external_base();
        (base..base + self.external_irqs())
            .contains(&source)
            .then(|| source - base)
    }

    /// True if `source` has a priority assignment (or is the NMI).
    #[must_use]
    pub fn is_deliverable(self, source: usize) -> bool {
        source == NMI_SOURCE || self.table_entry(source).is_some()
    }

    fn table_entry(self, source: usize) -> Option<usize> {
        let entry = match self {
            Self::H8300H => H8300H_IPR_BIT.get(source),
            Self::H8S => H8S_IPR_FIELD.get(source),
        };
        entry.and_then(|&e| usize::try_from(e).ok())
    }

    /// Priority of `source` under the current IPR contents. `None` for
    /// sources without an assignment. The NMI is not in the tables.
    #[must_use]
    pub fn priority(self, source: usize, ipr: &[u16]) -> Option<u8> {
        let entry = self.table_entry(source)?;
        let value = match self {
            Self::H8300H => (ipr.get(entry / 8)? >> (entry % 8)) & 1,
            Self::H8S => (ipr.get(entry / 4)? >> ((entry % 4) * 4)) & 7,
        };
        Some(value as u8)
    }
}
