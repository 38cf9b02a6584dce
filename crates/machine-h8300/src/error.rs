//! Host-side errors: images, configuration, board selection.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} image of {len} bytes does not fit at {address:#08x} (room for {room})")]
    ImageTooLarge {
        name: &'static str,
        address: u32,
        len: usize,
        room: usize,
    },

    #[error("no memory at {address:#08x} to load the {name} image")]
    Unmapped { name: &'static str, address: u32 },

    #[error("invalid board configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid board configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown board `{0}` (expected kanebebe or edosk2674)")]
    UnknownBoard(String),

    #[error("nothing to run: give a firmware or kernel image")]
    NoImage,
}
