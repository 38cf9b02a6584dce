//! H8 bus trait with byte, word and long big-endian access.
//!
//! The CPU sees a 24-bit address space. Word and long accesses are
//! forced to even addresses, the way the H8 bus controller aligns them.
//! Implementors only need the byte accessors; boards that have wider
//! fast paths override the rest.

use crate::registers::ADDRESS_MASK;

/// System bus as seen by the H8 CPU.
pub trait H8Bus {
    /// Read a byte.
    fn read_byte(&mut self, addr: u32) -> u8;

    /// Write a byte.
    fn write_byte(&mut self, addr: u32, value: u8);

    /// Read a big-endian word. Bit 0 of the address is ignored.
    fn read_word(&mut self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK & !1;
        let hi = self.read_byte(addr);
        let lo = self.read_byte(addr | 1);
        u16::from_be_bytes([hi, lo])
    }

    /// Write a big-endian word. Bit 0 of the address is ignored.
    fn write_word(&mut self, addr: u32, value: u16) {
        let addr = addr & ADDRESS_MASK & !1;
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(addr, hi);
        self.write_byte(addr | 1, lo);
    }

    /// Read a big-endian long as two words.
    fn read_long(&mut self, addr: u32) -> u32 {
        let addr = addr & ADDRESS_MASK & !1;
        let hi = self.read_word(addr);
        let lo = self.read_word(addr.wrapping_add(2) & ADDRESS_MASK);
        (u32::from(hi) << 16) | u32::from(lo)
    }

    /// Write a big-endian long as two words.
    fn write_long(&mut self, addr: u32, value: u32) {
        let addr = addr & ADDRESS_MASK & !1;
        self.write_word(addr, (value >> 16) as u16);
        self.write_word(addr.wrapping_add(2) & ADDRESS_MASK, value as u16);
    }

    /// Called after the CPU has accepted an interrupt through `vector`.
    ///
    /// Machines forward this to the interrupt controller's acknowledge.
    /// TRAPA and trace exceptions do not call it.
    fn interrupt_ack(&mut self, _vector: u8) {}
}
