//! Renesas H8 interrupt controllers.
//!
//! One controller implementation serves both the H8/300H (64 sources,
//! one IPR bit per group) and the H8S (128 sources, 3-bit IPR fields).
//! The variant only changes the priority lookup, the external IRQ
//! numbering and the register layout.
//!
//! Source numbers are vector numbers. Peripherals drive sources through
//! [`emu_core::IrqSink`]; the CPU reads the resolved request with
//! [`InterruptController::request`] and calls
//! [`InterruptController::acknowledge`] on acceptance.

mod controller;
mod model;
mod registers;

pub use controller::{InterruptController, Trigger};
pub use model::{IntcModel, NMI_SOURCE};
pub use registers::Region;
