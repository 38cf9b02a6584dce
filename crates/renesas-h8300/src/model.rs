//! CPU model/capability definitions for the H8 family.
//!
//! The H8/300H and H8S share one instruction set core. The H8S adds the
//! EXR register, a three-bit interrupt mask, a trace exception and
//! shift/rotate by two.

/// Selected H8 CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    /// H8/300H (e.g. H8/3069).
    H8300H,
    /// H8S/2000 series (e.g. H8S/2674).
    H8S,
}

/// Capability flags for a specific CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// EXR register is present (LDC/STC/ANDC/ORC/XORC on EXR, trace).
    pub exr: bool,
    /// Shift and rotate instructions accept a count of two.
    pub shift_by_two: bool,
    /// Number of entries in the exception vector table.
    pub vectors: u16,
}

impl CpuModel {
    /// Static capability set for this CPU model.
    #[must_use]
    pub const fn capabilities(self) -> CpuCapabilities {
        match self {
            Self::H8300H => CpuCapabilities {
                exr: false,
                shift_by_two: false,
                vectors: 64,
            },
            Self::H8S => CpuCapabilities {
                exr: true,
                shift_by_two: true,
                vectors: 128,
            },
        }
    }

    #[must_use]
    pub const fn has_exr(self) -> bool {
        self.capabilities().exr
    }
}

#[cfg(test)]
mod tests {
    use super::{CpuCapabilities, CpuModel};

    #[test]
    fn capabilities_match_expected_baseline_models() {
        assert_eq!(
            CpuModel::H8300H.capabilities(),
            CpuCapabilities {
                exr: false,
                shift_by_two: false,
                vectors: 64
            }
        );
        assert_eq!(
            CpuModel::H8S.capabilities(),
            CpuCapabilities {
                exr: true,
                shift_by_two: true,
                vectors: 128
            }
        );
    }
}
