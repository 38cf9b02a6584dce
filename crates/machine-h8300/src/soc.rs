//! On-chip memory and peripheral maps of the two SoCs.
//!
//! H8/3069:
//!
//! | Address          | Device                       | IRQ base |
//! |------------------|------------------------------|----------|
//! | 0x000000 512 KiB | flash                        |          |
//! | 0xFEE012         | SYSCR                        |          |
//! | 0xFEE014         | interrupt controller         |          |
//! | 0xFFBF20 16 KiB  | on-chip RAM                  |          |
//! | 0xFFFF60         | 16-bit timer                 | 24       |
//! | 0xFFFF80         | TMR unit 0 (channels 0, 1)   | 36       |
//! | 0xFFFF90         | TMR unit 1 (channels 2, 3)   | 40       |
//!
//! H8S/2674:
//!
//! | Address          | Device                       | IRQ base |
//! |------------------|------------------------------|----------|
//! | 0xFF4000 32 KiB  | on-chip RAM                  |          |
//! | 0xFFFE00         | interrupt controller (IPR)   |          |
//! | 0xFFFE80         | TPU channels 3-5             | 40       |
//! | 0xFFFF30         | interrupt controller (INTCR) |          |
//! | 0xFFFFB0         | TMR channels 0, 1            | 72       |
//! | 0xFFFFC0         | TPU TSTR/TSYR                | 40       |
//! | 0xFFFFD0         | TPU channels 0-2             | 40       |
//!
//! The serial interfaces (0xFFFFB0 on the H8/3069, 0xFFFF78 on the
//! H8S/2674) are not modelled.

use renesas_h8300::CpuModel;
use renesas_intc::{IntcModel, Region};
use renesas_timer::{TmrModel, TpuWindow};
use serde::Serialize;

/// Peripheral behind an address window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// H8/3069 system control register.
    Syscr,
    Intc(Region),
    /// TMR unit index.
    Tmr(usize),
    Timer16,
    Tpu(TpuWindow),
}

/// Address window: base, length, device, first interrupt controller
/// input driven by the device's line 0.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub base: u32,
    pub len: u32,
    pub device: Device,
    pub irq_base: usize,
}

const fn window(base: u32, len: u32, device: Device, irq_base: usize) -> Window {
    Window {
        base,
        len,
        device,
        irq_base,
    }
}

const H83069_WINDOWS: &[Window] = &[
    window(0xFE_E012, 1, Device::Syscr, 0),
    window(0xFE_E014, 6, Device::Intc(Region::Primary), 0),
    window(0xFF_FF60, 0x20, Device::Timer16, 24),
    window(0xFF_FF80, 0x10, Device::Tmr(0), 36),
    window(0xFF_FF90, 0x10, Device::Tmr(1), 40),
];

const H8S2674_WINDOWS: &[Window] = &[
    window(0xFF_FE00, 0x1E, Device::Intc(Region::Primary), 0),
    window(0xFF_FE80, 0x30, Device::Tpu(TpuWindow::High), 40),
    window(0xFF_FF30, 6, Device::Intc(Region::Secondary), 0),
    window(0xFF_FFB0, 0x10, Device::Tmr(0), 72),
    window(0xFF_FFC0, 2, Device::Tpu(TpuWindow::Common), 40),
    window(0xFF_FFD0, 0x30, Device::Tpu(TpuWindow::Low), 40),
];

/// Reset value of the H8/3069 SYSCR: UE and RAME set.
pub const SYSCR_RESET: u8 = 0x09;

/// SYSCR.UE: 1 selects the plain I-bit mask, 0 the I/UI two-level mask.
pub const SYSCR_UE: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Soc {
    #[serde(rename = "H8/3069")]
    H83069,
    #[serde(rename = "H8S/2674")]
    H8S2674,
}

impl Soc {
    #[must_use]
    pub const fn cpu_model(self) -> CpuModel {
        match self {
            Self::H83069 => CpuModel::H8300H,
            Self::H8S2674 => CpuModel::H8S,
        }
    }

    #[must_use]
    pub const fn intc_model(self) -> IntcModel {
        match self {
            Self::H83069 => IntcModel::H8300H,
            Self::H8S2674 => IntcModel::H8S,
        }
    }

    #[must_use]
    pub const fn tmr_model(self) -> TmrModel {
        match self {
            Self::H83069 => TmrModel::H8300H,
            Self::H8S2674 => TmrModel::H8S,
        }
    }

    #[must_use]
    pub const fn tmr_units(self) -> usize {
        match self {
            Self::H83069 => 2,
            Self::H8S2674 => 1,
        }
    }

    #[must_use]
    pub const fn has_timer16(self) -> bool {
        matches!(self, Self::H83069)
    }

    #[must_use]
    pub const fn has_tpu(self) -> bool {
        matches!(self, Self::H8S2674)
    }

    /// On-chip RAM base and size.
    #[must_use]
    pub const fn iram(self) -> (u32, usize) {
        match self {
            Self::H83069 => (0xFF_BF20, 16 * 1024),
            Self::H8S2674 => (0xFF_4000, 32 * 1024),
        }
    }

    /// On-chip flash base and size, if any.
    #[must_use]
    pub const fn flash(self) -> Option<(u32, usize)> {
        match self {
            Self::H83069 => Some((0, 512 * 1024)),
            Self::H8S2674 => None,
        }
    }

    #[must_use]
    pub const fn windows(self) -> &'static [Window] {
        match self {
            Self::H83069 => H83069_WINDOWS,
            Self::H8S2674 => H8S2674_WINDOWS,
        }
    }

    /// Window containing `addr`, with the offset into it.
    #[must_use]
    pub fn decode(self, addr: u32) -> Option<(Window, u32)> {
        self.windows()
            .iter()
            .find(|w| addr >= w.base && addr < w.base + w.len)
            .map(|w| (*w, addr - w.base))
    }
}
