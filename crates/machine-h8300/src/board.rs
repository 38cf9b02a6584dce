//! Board definitions.
//!
//! A board is a SoC plus external memory, a clock and the layout used to
//! boot a kernel image directly: where the kernel goes, how large it may
//! be, and the base of the synthesised vector table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MachineError;
use crate::soc::Soc;

/// External DRAM base on both boards.
pub const DRAM_BASE: u32 = 0x40_0000;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    /// KaneBebe: H8/3069 at 25 MHz, 4 MiB DRAM.
    #[default]
    Kanebebe,
    /// EDOSK2674: H8S/2674 at 33.3 MHz, 8 MiB SDRAM, 4 MiB flash at 0.
    Edosk2674,
}

impl Board {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kanebebe => "kanebebe",
            Self::Edosk2674 => "edosk2674",
        }
    }

    #[must_use]
    pub const fn soc(self) -> Soc {
        match self {
            Self::Kanebebe => Soc::H83069,
            Self::Edosk2674 => Soc::H8S2674,
        }
    }

    /// Default φ frequency in Hz.
    #[must_use]
    pub const fn clock_hz(self) -> u64 {
        match self {
            Self::Kanebebe => 25_000_000,
            Self::Edosk2674 => 33_333_333,
        }
    }

    #[must_use]
    pub const fn dram_size(self) -> usize {
        match self {
            Self::Kanebebe => 4 * MIB,
            Self::Edosk2674 => 8 * MIB,
        }
    }

    /// Board flash at 0, if any.
    #[must_use]
    pub const fn flash_size(self) -> Option<usize> {
        match self {
            Self::Kanebebe => None,
            Self::Edosk2674 => Some(4 * MIB),
        }
    }

    /// Default kernel load address.
    #[must_use]
    pub const fn kernel_address(self) -> u32 {
        match self {
            Self::Kanebebe => DRAM_BASE + 0x28_0000,
            Self::Edosk2674 => DRAM_BASE + 4 * MIB as u32,
        }
    }

    /// Largest kernel image.
    #[must_use]
    pub const fn kernel_max(self) -> usize {
        match self {
            Self::Kanebebe => 0x18_0000,
            Self::Edosk2674 => 4 * MIB,
        }
    }

    /// Entry `i` of the synthesised vector table points at
    /// `vector_base + 4 * i`.
    #[must_use]
    pub const fn vector_base(self) -> u32 {
        match self {
            Self::Kanebebe => 0xFF_FF20 - 0x100,
            Self::Edosk2674 => 0xFF_C000 - 0x200,
        }
    }

    #[must_use]
    pub const fn vector_count(self) -> usize {
        self.soc().intc_model().sources()
    }

    /// Device tree blobs go at the top of DRAM.
    #[must_use]
    pub const fn dtb_top(self) -> u32 {
        DRAM_BASE + 4 * MIB as u32
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Board {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kanebebe" => Ok(Self::Kanebebe),
            "edosk2674" => Ok(Self::Edosk2674),
            _ => Err(MachineError::UnknownBoard(s.to_string())),
        }
    }
}
