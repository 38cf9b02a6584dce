//! H8 machines: the H8/3069 and H8S/2674 SoCs on the KaneBebe and
//! EDOSK2674 boards.
//!
//! A [`Machine`] owns the CPU and a [`SocBus`]; the bus owns memory, the
//! interrupt controller and the timers. [`Machine::run`] interleaves CPU
//! steps with timer deadlines on the CPU's φ clock.

pub mod board;
pub mod bus;
pub mod config;
pub mod error;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod soc;

pub use board::Board;
pub use bus::SocBus;
pub use config::BoardConfig;
pub use error::MachineError;
pub use machine::{Machine, MachineStatus, StopReason};
pub use soc::Soc;
