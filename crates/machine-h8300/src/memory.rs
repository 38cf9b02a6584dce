//! RAM-backed memory regions.
//!
//! On-chip RAM, flash and board DRAM are all plain byte arrays at a fixed
//! base. Flash is writable; no flash programming sequence is modelled.

use crate::error::MachineError;

/// One contiguous region of the 24-bit address space.
#[derive(Debug, Clone)]
pub struct Ram {
    name: &'static str,
    base: u32,
    data: Vec<u8>,
}

impl Ram {
    #[must_use]
    pub fn new(name: &'static str, base: u32, size: usize) -> Self {
        Self {
            name,
            base,
            data: vec![0; size],
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One past the last address.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.base + self.data.len() as u32
    }

    #[must_use]
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Read a byte. `addr` must be inside the region.
    #[must_use]
    pub fn read(&self, addr: u32) -> u8 {
        self.data[(addr - self.base) as usize]
    }

    /// Write a byte. `addr` must be inside the region.
    pub fn write(&mut self, addr: u32, value: u8) {
        self.data[(addr - self.base) as usize] = value;
    }

    /// Copy `image` in at `addr`.
    pub fn load(&mut self, name: &'static str, addr: u32, image: &[u8]) -> Result<(), MachineError> {
        let start = (addr - self.base) as usize;
        let room = self.data.len() - start;
        if image.len() > room {
            return Err(MachineError::ImageTooLarge {
                name,
                address: addr,
                len: image.len(),
                room,
            });
        }
        self.data[start..start + image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let ram = Ram::new("iram", 0xFF_BF20, 16 * 1024);
        assert!(ram.contains(0xFF_BF20));
        assert!(ram.contains(0xFF_FF1F));
        assert!(!ram.contains(0xFF_FF20));
        assert!(!ram.contains(0xFF_BF1F));
        assert_eq!(ram.end(), 0xFF_FF20);
    }

    #[test]
    fn load_checks_room() {
        let mut ram = Ram::new("dram", 0x40_0000, 16);
        ram.load("kernel", 0x40_0008, &[1, 2, 3]).unwrap();
        assert_eq!(ram.read(0x40_0009), 2);
        let err = ram.load("kernel", 0x40_0008, &[0; 9]).unwrap_err();
        assert!(matches!(err, MachineError::ImageTooLarge { room: 8, len: 9, .. }));
    }
}
