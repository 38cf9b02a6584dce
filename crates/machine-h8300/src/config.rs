//! Board configuration, loaded from TOML.
//!
//! ```toml
//! board = "edosk2674"
//! clock_hz = 33333333
//! kernel = "linux.bin"
//! kernel_address = 0x800000
//! max_instructions = 5000000
//! ```
//!
//! Every field except `board` is optional; missing values come from the
//! board definition. Relative image paths are taken from the directory
//! holding the configuration file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::board::Board;
use crate::error::MachineError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    pub board: Board,
    /// φ frequency in Hz.
    pub clock_hz: Option<u64>,
    /// Raw image copied to address 0; reset fetches PC from vector 0.
    pub firmware: Option<PathBuf>,
    /// Raw kernel image, booted directly through a synthesised vector table.
    pub kernel: Option<PathBuf>,
    pub kernel_address: Option<u32>,
    /// Flattened device tree placed at the top of DRAM, address in ER0.
    pub dtb: Option<PathBuf>,
    /// Stop after this many instructions.
    pub max_instructions: Option<u64>,
}

impl BoardConfig {
    #[must_use]
    pub fn for_board(board: Board) -> Self {
        Self {
            board,
            ..Self::default()
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, MachineError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse `path`, resolving image paths against its directory.
    pub fn load(path: &Path) -> Result<Self, MachineError> {
        let text = std::fs::read_to_string(path).map_err(|source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, dir: &Path) {
        for image in [&mut self.firmware, &mut self.kernel, &mut self.dtb]
            .into_iter()
            .flatten()
        {
            if image.is_relative() {
                *image = dir.join(&*image);
            }
        }
    }

    pub fn validate(&self) -> Result<(), MachineError> {
        if self.clock_hz == Some(0) {
            return Err(MachineError::InvalidConfig("clock_hz must be non-zero".into()));
        }
        if self.dtb.is_some() && self.kernel.is_none() {
            return Err(MachineError::InvalidConfig("dtb needs a kernel".into()));
        }
        if self.kernel.is_none() && self.kernel_address.is_some() {
            return Err(MachineError::InvalidConfig(
                "kernel_address given without a kernel".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn clock_hz(&self) -> u64 {
        self.clock_hz.unwrap_or_else(|| self.board.clock_hz())
    }

    #[must_use]
    pub fn kernel_address(&self) -> u32 {
        self.kernel_address
            .unwrap_or_else(|| self.board.kernel_address())
    }
}
