//! Raw image loading and vector table synthesis.

use std::path::Path;

use crate::bus::SocBus;
use crate::error::MachineError;

pub fn read_image(path: &Path) -> Result<Vec<u8>, MachineError> {
    std::fs::read(path).map_err(|source| MachineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy `image` into the memory region at `address`. The image must fit
/// in that one region and, when given, in `limit` bytes.
pub fn load_image(
    bus: &mut SocBus,
    name: &'static str,
    address: u32,
    image: &[u8],
    limit: Option<usize>,
) -> Result<(), MachineError> {
    if let Some(limit) = limit.filter(|&limit| image.len() > limit) {
        return Err(MachineError::ImageTooLarge {
            name,
            address,
            len: image.len(),
            room: limit,
        });
    }
    let ram = bus
        .region_mut(address)
        .ok_or(MachineError::Unmapped { name, address })?;
    ram.load(name, address, image)
}

/// Big-endian vector table with entry `i` pointing at `base + 4 * i`.
#[must_use]
pub fn vector_table(base: u32, count: usize) -> Vec<u8> {
    (0..count as u32)
        .flat_map(|i| base.wrapping_add(4 * i).to_be_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::Soc;
    use renesas_h8300::H8Bus;

    #[test]
    fn vector_entries() {
        let table = vector_table(0xFF_FE20, 64);
        assert_eq!(table.len(), 256);
        assert_eq!(&table[..4], &[0x00, 0xFF, 0xFE, 0x20]);
        assert_eq!(&table[252..], &[0x00, 0xFF, 0xFF, 0x1C]);
    }

    #[test]
    fn load_into_on_chip_ram() {
        let mut bus = SocBus::new(Soc::H8S2674);
        load_image(&mut bus, "blob", 0xFF_4000, &[0xDE, 0xAD], None).unwrap();
        assert_eq!(bus.read_word(0xFF_4000), 0xDEAD);
    }

    #[test]
    fn load_errors() {
        let mut bus = SocBus::new(Soc::H8S2674);
        assert!(matches!(
            load_image(&mut bus, "blob", 0x10_0000, &[0], None),
            Err(MachineError::Unmapped { address: 0x10_0000, .. })
        ));
        assert!(matches!(
            load_image(&mut bus, "blob", 0xFF_4000, &[0; 8], Some(4)),
            Err(MachineError::ImageTooLarge { room: 4, .. })
        ));
        assert!(matches!(
            load_image(&mut bus, "blob", 0xFF_BFFF, &[0; 2], None),
            Err(MachineError::ImageTooLarge { room: 1, .. })
        ));
    }
}
