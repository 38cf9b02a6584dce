//! Shared vocabulary for the H8 emulator crates.
//!
//! Time is counted in ticks of the peripheral clock (φ). The CPU, the
//! interrupt controller and the timers all agree on this one clock, so a
//! timer deadline and an instruction's cost can be compared directly.

mod access;
mod clock;
mod irq;
mod observable;
mod ticks;

pub use access::AccessSize;
pub use clock::SystemClock;
pub use irq::{IrqSink, LineRecorder, NullSink};
pub use observable::{Observable, Value};
pub use ticks::Ticks;
