//! Peripheral register access width.

/// Width of a register access from the CPU bus.
///
/// On-chip peripherals sit on an 8/16-bit bus. Long accesses are split
/// into two word accesses by the SoC before they reach a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte,
    Word,
}

impl AccessSize {
    /// Access width in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
        }
    }
}
