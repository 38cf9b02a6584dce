//! Register files.
//!
//! H8/300H, one byte-wide window at 0xFEE014:
//!
//! | Offset | Register |
//! |--------|----------|
//! | 0      | ISCR     |
//! | 1      | IER      |
//! | 2      | ISR      |
//! | 4      | IPRA     |
//! | 5      | IPRB     |
//!
//! H8S, two windows of 16-bit registers. Primary at 0xFFFE00: IPRA-IPRK
//! (0-20), ITSR 22, SSIER 24, ISCRH 26, ISCRL 28. Secondary at 0xFFFF30:
//! INTCR 1 (byte), IER 2, ISR 4.
//!
//! ISR is write-0-to-clear. Every write re-latches external lines held
//! low under a low-level trigger and re-resolves the asserted source.

use emu_core::AccessSize;
use tracing::{debug, warn};

use crate::controller::InterruptController;
use crate::model::IntcModel;

/// Which register window an access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The only H8/300H window; IPR/ISCR on the H8S.
    Primary,
    /// INTCR/IER/ISR window (H8S).
    Secondary,
}

/// IPR bits that exist on the H8S.
const H8S_IPR_MASK: u16 = 0x7777;

fn byte_of(word: u16, offset: u32) -> u8 {
    if offset & 1 == 0 { (word >> 8) as u8 } else { word as u8 }
}

fn merge(word: u16, offset: u32, value: u8) -> u16 {
    if offset & 1 == 0 {
        (u16::from(value) << 8) | (word & 0x00FF)
    } else {
        (word & 0xFF00) | u16::from(value)
    }
}

impl InterruptController {
    /// Read a register. Unknown offsets read as all ones.
    pub fn read(&mut self, region: Region, offset: u32, size: AccessSize) -> u16 {
        match size {
            AccessSize::Byte => u16::from(self.read_byte(region, offset)),
            AccessSize::Word => {
                let hi = self.read_byte(region, offset & !1);
                let lo = self.read_byte(region, offset | 1);
                u16::from_be_bytes([hi, lo])
            }
        }
    }

    /// Write a register.
    pub fn write(&mut self, region: Region, offset: u32, size: AccessSize, value: u16) {
        match size {
            AccessSize::Byte => self.write_byte(region, offset, value as u8),
            AccessSize::Word => {
                let [hi, lo] = value.to_be_bytes();
                self.write_byte(region, offset & !1, hi);
                self.write_byte(region, offset | 1, lo);
            }
        }
        self.latch_held_lines();
        self.resolve();
    }

    fn h8s_primary_word(&self, offset: u32) -> Option<u16> {
        Some(match offset {
            0..=20 => self.ipr[(offset / 2) as usize],
            22 => self.itsr,
            24 => self.ssier,
            26 => (self.iscr >> 16) as u16,
            28 => self.iscr as u16,
            _ => return None,
        })
    }

    fn set_h8s_primary_word(&mut self, offset: u32, value: u16) {
        match offset {
            0..=20 => self.ipr[(offset / 2) as usize] = value & H8S_IPR_MASK,
            22 => self.itsr = value,
            24 => self.ssier = value,
            26 => self.iscr = (self.iscr & 0x0000_FFFF) | (u32::from(value) << 16),
            28 => self.iscr = (self.iscr & 0xFFFF_0000) | u32::from(value),
            _ => {}
        }
    }

    fn read_byte(&self, region: Region, offset: u32) -> u8 {
        let value = match (self.model(), region) {
            (IntcModel::H8300H, Region::Primary) => match offset {
                0 => Some(self.iscr as u8),
                1 => Some(self.ier as u8),
                2 => Some(self.isr as u8),
                4 => Some(self.ipr[0] as u8),
                5 => Some(self.ipr[1] as u8),
                _ => None,
            },
            (IntcModel::H8S, Region::Primary) => {
                self.h8s_primary_word(offset & !1).map(|w| byte_of(w, offset))
            }
            (IntcModel::H8S, Region::Secondary) => match offset {
                1 => Some(self.intcr),
                2 | 3 => Some(byte_of(self.ier, offset)),
                4 | 5 => Some(byte_of(self.isr, offset)),
                _ => None,
            },
            (IntcModel::H8300H, Region::Secondary) => None,
        };
        value.unwrap_or_else(|| {
            debug!(target: "unimp", "interrupt controller {region:?} register {offset:#x} read");
            0xFF
        })
    }

    fn write_byte(&mut self, region: Region, offset: u32, value: u8) {
        match (self.model(), region) {
            (IntcModel::H8300H, Region::Primary) => match offset {
                0 => self.iscr = u32::from(value),
                1 => self.ier = u16::from(value),
                2 => {
                    self.isr &= u16::from(value);
                    self.sync_isr();
                }
                4 => self.ipr[0] = u16::from(value),
                5 => self.ipr[1] = u16::from(value),
                _ => self.unimplemented_write(region, offset, value),
            },
            (IntcModel::H8S, Region::Primary) => match self.h8s_primary_word(offset & !1) {
                Some(word) => self.set_h8s_primary_word(offset & !1, merge(word, offset, value)),
                None => self.unimplemented_write(region, offset, value),
            },
            (IntcModel::H8S, Region::Secondary) => match offset {
                1 => self.write_intcr(value),
                2 | 3 => self.ier = merge(self.ier, offset, value),
                4 | 5 => {
                    self.isr &= merge(self.isr, offset, value);
                    self.sync_isr();
                }
                _ => self.unimplemented_write(region, offset, value),
            },
            (IntcModel::H8300H, Region::Secondary) => self.unimplemented_write(region, offset, value),
        }
    }

    fn write_intcr(&mut self, value: u8) {
        self.intcr = value;
        let intm = (value >> 4) & 3;
        if intm > 2 {
            warn!(target: "guest", "invalid INTCR.INTM {intm}");
        } else {
            self.intm = intm;
        }
    }

    fn unimplemented_write(&self, region: Region, offset: u32, value: u8) {
        debug!(
            target: "unimp",
            "interrupt controller {region:?} register {offset:#x} write {value:#04x}"
        );
    }
}
