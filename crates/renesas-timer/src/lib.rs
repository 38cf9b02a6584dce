//! H8 timer peripherals: the 8-bit timer (TMR), the H8/3069 16-bit
//! integrated timer unit and the H8S timer pulse unit.
//!
//! Counters are not ticked. Each channel stores its counter as of an
//! anchor time and derives the current value from elapsed φ ticks when a
//! register is accessed or the machine reaches the timer's deadline.
//! Both paths run through the same [`ChannelClock`] and [`Counter`].

mod clock;
mod engine;
mod signal;
mod timer16;
mod tmr;
mod tpu;

pub use clock::ChannelClock;
pub use engine::{Counter, Events, OVERFLOW};
pub use timer16::{TIMER16_LINES, Timer16};
pub use tmr::{Tmr, TmrModel};
pub use tpu::{TPU_LINES, Tpu, TpuWindow};
