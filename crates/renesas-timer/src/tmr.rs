//! 8-bit timer (TMR), two channels per unit.
//!
//! Channel registers are interleaved: even offsets are channel 0, odd
//! offsets channel 1.
//!
//! | Offset | Register | Notes                                   |
//! |--------|----------|-----------------------------------------|
//! | 0/1    | TCR      | CKS 2-0, CCLR 4-3, OVIE, CMIEA, CMIEB   |
//! | 2/3    | TCSR     | OVF, CMFA, CMFB (write 0 to clear)      |
//! | 4/5    | TCORA    | Compare A                               |
//! | 6/7    | TCORB    | Compare B                               |
//! | 8/9    | TCNT     | Counter                                 |
//! | 10/11  | TCCR     | H8S only; stored                        |
//!
//! A word access at an even offset reads or writes channel 0 in the high
//! byte and channel 1 in the low byte (16-bit cascaded view).

use emu_core::{AccessSize, IrqSink, Observable, Ticks, Value};
use tracing::{debug, warn};

use crate::clock::ChannelClock;
use crate::engine::{Counter, Events, OVERFLOW};
use crate::signal::pulse_new_requests;

// TCR.
const CKS_MASK: u8 = 0x07;
const CKS_CASCADE: u8 = 4;
const CCLR_SHIFT: u8 = 3;

// TCSR flags and their TCR enables share bit positions.
const OVF: u8 = 0x20;
const CMFA: u8 = 0x40;
const CMFB: u8 = 0x80;
const FLAGS: u8 = OVF | CMFA | CMFB;

/// Which SoC family the unit sits in. Decides TCCR and the IRQ outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmrModel {
    /// H8/3069: CMIA0, CMIB0, CMI1, TOVI.
    H8300H,
    /// H8S/2674: CMIA, CMIB, OVI, reserved per channel.
    H8S,
}

impl TmrModel {
    /// Number of IRQ output lines.
    #[must_use]
    pub const fn lines(self) -> usize {
        match self {
            Self::H8300H => 4,
            Self::H8S => 8,
        }
    }

    /// Output line for status flag `flag` of channel `ch`.
    fn line(self, ch: usize, flag: u8) -> Option<usize> {
        match self {
            Self::H8S => {
                let kind = match flag {
                    CMFA => 0,
                    CMFB => 1,
                    OVF => 2,
                    _ => return None,
                };
                Some(ch * 4 + kind)
            }
            Self::H8300H => match (ch, flag) {
                (0, CMFA) => Some(0),
                (0, CMFB) => Some(1),
                (1, CMFA | CMFB) => Some(2),
                (_, OVF) => Some(3),
                _ => None,
            },
        }
    }
}

/// One TMR unit.
#[derive(Debug, Clone)]
pub struct Tmr {
    model: TmrModel,
    tcr: [u8; 2],
    tcsr: [u8; 2],
    tcora: [u8; 2],
    tcorb: [u8; 2],
    tcnt: [u8; 2],
    tccr: [u8; 2],
    clock: [ChannelClock; 2],
}

impl Tmr {
    #[must_use]
    pub fn new(model: TmrModel) -> Self {
        let mut tmr = Self {
            model,
            tcr: [0; 2],
            tcsr: [0; 2],
            tcora: [0; 2],
            tcorb: [0; 2],
            tcnt: [0; 2],
            tccr: [0; 2],
            clock: [ChannelClock::default(); 2],
        };
        tmr.reset();
        tmr
    }

    pub fn reset(&mut self) {
        self.tcr = [0; 2];
        self.tcsr = [0x00, 0x10];
        self.tcora = [0xFF; 2];
        self.tcorb = [0xFF; 2];
        self.tcnt = [0; 2];
        self.tccr = [0; 2];
        self.clock = [ChannelClock::default(); 2];
    }

    #[must_use]
    pub fn model(&self) -> TmrModel {
        self.model
    }

    fn cascaded(&self, ch: usize) -> bool {
        self.tcr[ch] & CKS_MASK == CKS_CASCADE
    }

    /// φ divisor, or `None` when the channel is stopped, cascaded or on
    /// an external clock.
    fn divisor(&self, ch: usize) -> Option<u64> {
        match self.tcr[ch] & CKS_MASK {
            1 => Some(8),
            2 => Some(64),
            3 => Some(8192),
            _ => None,
        }
    }

    fn counter(&self, ch: usize) -> Counter {
        let clear = match (self.tcr[ch] >> CCLR_SHIFT) & 3 {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        };
        Counter::new(
            0xFF,
            &[u32::from(self.tcora[ch]), u32::from(self.tcorb[ch])],
            clear,
        )
    }

    fn advance(&mut self, ch: usize, counts: u64) -> Events {
        let mut value = u32::from(self.tcnt[ch]);
        let events = self.counter(ch).advance(&mut value, counts);
        self.tcnt[ch] = value as u8;
        let mask = events.mask();
        if mask & 1 != 0 {
            self.tcsr[ch] |= CMFA;
        }
        if mask & 2 != 0 {
            self.tcsr[ch] |= CMFB;
        }
        if mask & OVERFLOW != 0 {
            self.tcsr[ch] |= OVF;
        }
        events
    }

    /// Enabled and flagged events, bit `ch * 8 + flag bit`.
    fn requests(&self) -> u64 {
        (0..2).fold(0, |acc, ch| {
            acc | (u64::from(self.tcsr[ch] & self.tcr[ch] & FLAGS) << (ch * 8))
        })
    }

    fn signal(&self, before: u64, irq: &mut impl IrqSink) {
        let model = self.model;
        pulse_new_requests(before, self.requests(), irq, |bit| {
            model.line(bit / 8, 1 << (bit % 8))
        });
    }

    /// Bring both counters up to `now`, setting flags and pulsing IRQs.
    pub fn sync(&mut self, now: Ticks, irq: &mut impl IrqSink) {
        let before = self.requests();
        let mut events = [Events::default(); 2];
        for (ch, slot) in events.iter_mut().enumerate() {
            let counts = self.clock[ch].sync(now, self.divisor(ch));
            *slot = self.advance(ch, counts);
        }
        match (self.cascaded(0), self.cascaded(1)) {
            (true, false) => {
                self.advance(0, events[1].overflows);
            }
            (false, true) => {
                self.advance(1, events[0].matches[0]);
            }
            _ => {}
        }
        self.signal(before, irq);
    }

    /// Events whose interrupt would fire if they happened now.
    fn watch(&self, ch: usize) -> u8 {
        let armed = self.tcr[ch] & !self.tcsr[ch] & FLAGS;
        let mut watch = 0;
        if armed & CMFA != 0 {
            watch |= 1;
        }
        if armed & CMFB != 0 {
            watch |= 2;
        }
        if armed & OVF != 0 {
            watch |= OVERFLOW;
        }
        watch
    }

    /// Earliest time at which an enabled interrupt can fire.
    #[must_use]
    pub fn next_deadline(&self) -> Ticks {
        let mut watch = [self.watch(0), self.watch(1)];
        if self.cascaded(0) && watch[0] != 0 {
            watch[1] |= OVERFLOW;
        }
        if self.cascaded(1) && watch[1] != 0 {
            watch[0] |= 1;
        }
        (0..2)
            .filter_map(|ch| {
                let divisor = self.divisor(ch)?;
                let distance = self
                    .counter(ch)
                    .distance(u32::from(self.tcnt[ch]), watch[ch])?;
                Some(self.clock[ch].deadline(distance, divisor))
            })
            .min()
            .unwrap_or(Ticks::NEVER)
    }

    fn word_access_ok(offset: u32) -> bool {
        offset & 1 == 0 && offset & 0x0E >= 4
    }

    pub fn read(
        &mut self,
        offset: u32,
        size: AccessSize,
        now: Ticks,
        irq: &mut impl IrqSink,
    ) -> u16 {
        self.sync(now, irq);
        match size {
            AccessSize::Byte => u16::from(self.read_byte(offset)),
            AccessSize::Word if Self::word_access_ok(offset) => {
                u16::from_be_bytes([self.read_byte(offset), self.read_byte(offset | 1)])
            }
            AccessSize::Word => {
                warn!(target: "guest", "TMR word read at {offset:#x}");
                0xFFFF
            }
        }
    }

    pub fn write(
        &mut self,
        offset: u32,
        size: AccessSize,
        value: u16,
        now: Ticks,
        irq: &mut impl IrqSink,
    ) {
        self.sync(now, irq);
        let before = self.requests();
        match size {
            AccessSize::Byte => self.write_byte(offset, value as u8),
            AccessSize::Word if Self::word_access_ok(offset) => {
                let [hi, lo] = value.to_be_bytes();
                self.write_byte(offset, hi);
                self.write_byte(offset | 1, lo);
            }
            AccessSize::Word => {
                warn!(target: "guest", "TMR word write at {offset:#x}");
            }
        }
        self.signal(before, irq);
    }

    fn read_byte(&self, offset: u32) -> u8 {
        let ch = (offset & 1) as usize;
        match offset & 0x0E {
            0 => self.tcr[ch],
            2 => self.tcsr[ch],
            4 => self.tcora[ch],
            6 => self.tcorb[ch],
            8 => self.tcnt[ch],
            10 if self.model == TmrModel::H8S => self.tccr[ch],
            _ => {
                debug!(target: "unimp", "TMR register {offset:#x} read");
                0xFF
            }
        }
    }

    fn write_byte(&mut self, offset: u32, value: u8) {
        let ch = (offset & 1) as usize;
        match offset & 0x0E {
            0 => {
                if value & CKS_MASK >= 5 {
                    debug!(target: "unimp", "TMR{ch} external clock select");
                }
                self.tcr[ch] = value;
            }
            2 => {
                let fixed = if ch == 1 { 0x10 } else { 0 };
                self.tcsr[ch] = (self.tcsr[ch] & value & FLAGS) | (value & !FLAGS) | fixed;
            }
            4 => self.tcora[ch] = value,
            6 => self.tcorb[ch] = value,
            8 => self.tcnt[ch] = value,
            10 if self.model == TmrModel::H8S => self.tccr[ch] = value,
            _ => debug!(target: "unimp", "TMR register {offset:#x} write {value:#04x}"),
        }
    }
}

impl Observable for Tmr {
    /// Values as of the last sync.
    fn query(&self, path: &str) -> Option<Value> {
        Some(match path {
            "tcnt0" => Value::U8(self.tcnt[0]),
            "tcnt1" => Value::U8(self.tcnt[1]),
            "tcsr0" => Value::U8(self.tcsr[0]),
            "tcsr1" => Value::U8(self.tcsr[1]),
            "tcr0" => Value::U8(self.tcr[0]),
            "tcr1" => Value::U8(self.tcr[1]),
            "deadline" => Value::U64(self.next_deadline().get()),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["tcnt0", "tcnt1", "tcsr0", "tcsr1", "tcr0", "tcr1", "deadline"]
    }
}
