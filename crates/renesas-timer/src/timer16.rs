//! 16-bit integrated timer unit (H8/3069 ITU), three channels.
//!
//! | Offset | Register |                                      |
//! |--------|----------|--------------------------------------|
//! | 0      | TSTR     | STR2-0: channel start                |
//! | 1      | TSNC     | Synchronous operation (unsupported)  |
//! | 2      | TMDR     | PWM/phase counting (unsupported)     |
//! | 3      | TOLR     | Output level (unsupported)           |
//! | 4-6    | TISRA-C  | IMF2-0 flags, IMIE2-0 enables        |
//! | 8n+8   | TCR      | TPSC 2-0, CKEG 4-3, CCLR 6-5         |
//! | 8n+9   | TIOR     | IOA 2-0, IOB 6-4                     |
//! | 8n+10  | TCNT     | word                                 |
//! | 8n+12  | GRA      | word                                 |
//! | 8n+14  | GRB      | word                                 |
//!
//! TISRA holds compare-match A, TISRB compare-match B, TISRC overflow.
//! Each channel drives IMIA, IMIB, OVI and one reserved line.

use emu_core::{AccessSize, IrqSink, Observable, Ticks, Value};
use tracing::{debug, warn};

use crate::clock::ChannelClock;
use crate::engine::{Counter, OVERFLOW};
use crate::signal::pulse_new_requests;

const CHANNELS: usize = 3;

/// IRQ output lines: four per channel.
pub const TIMER16_LINES: usize = CHANNELS * 4;

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    tcr: u8,
    tior: u8,
    tcnt: u16,
    gr: [u16; 2],
    clock: ChannelClock,
}

impl Channel {
    fn counter(&self) -> Counter {
        let clear = match (self.tcr >> 5) & 3 {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        };
        Counter::new(0xFFFF, &[u32::from(self.gr[0]), u32::from(self.gr[1])], clear)
    }
}

#[derive(Debug, Clone)]
pub struct Timer16 {
    tstr: u8,
    tsnc: u8,
    tmdr: u8,
    tolr: u8,
    /// TISRA, TISRB, TISRC.
    tisr: [u8; 3],
    channels: [Channel; CHANNELS],
}

impl Default for Timer16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer16 {
    #[must_use]
    pub fn new() -> Self {
        let mut timer = Self {
            tstr: 0,
            tsnc: 0,
            tmdr: 0,
            tolr: 0,
            tisr: [0; 3],
            channels: [Channel::default(); CHANNELS],
        };
        timer.reset();
        timer
    }

    pub fn reset(&mut self) {
        self.tstr = 0;
        self.tsnc = 0;
        self.tmdr = 0;
        self.tolr = 0;
        self.tisr = [0; 3];
        self.channels = [Channel {
            gr: [0xFFFF; 2],
            ..Channel::default()
        }; CHANNELS];
    }

    fn divisor(&self, ch: usize) -> Option<u64> {
        if self.tstr & (1 << ch) == 0 {
            return None;
        }
        match self.channels[ch].tcr & 7 {
            tpsc @ 0..=3 => Some(1 << tpsc),
            _ => None,
        }
    }

    /// Enabled and flagged events, bit `ch * 4 + register` (the line).
    fn requests(&self) -> u64 {
        let mut requests = 0;
        for (sr, &tisr) in self.tisr.iter().enumerate() {
            let active = tisr & (tisr >> 4) & 7;
            for ch in 0..CHANNELS {
                if active & (1 << ch) != 0 {
                    requests |= 1 << (ch * 4 + sr);
                }
            }
        }
        requests
    }

    /// Bring every running channel up to `now`, setting flags and
    /// pulsing IRQs.
    pub fn sync(&mut self, now: Ticks, irq: &mut impl IrqSink) {
        let before = self.requests();
        for ch in 0..CHANNELS {
            let divisor = self.divisor(ch);
            let channel = &mut self.channels[ch];
            let counts = channel.clock.sync(now, divisor);
            let mut value = u32::from(channel.tcnt);
            let mask = channel.counter().advance(&mut value, counts).mask();
            channel.tcnt = value as u16;
            if mask & 1 != 0 {
                self.tisr[0] |= 1 << ch;
            }
            if mask & 2 != 0 {
                self.tisr[1] |= 1 << ch;
            }
            if mask & OVERFLOW != 0 {
                self.tisr[2] |= 1 << ch;
            }
        }
        pulse_new_requests(before, self.requests(), irq, Some);
    }

    fn watch(&self, ch: usize) -> u8 {
        let armed = |sr: usize| {
            let tisr = self.tisr[sr];
            tisr & (0x10 << ch) != 0 && tisr & (1 << ch) == 0
        };
        let mut watch = 0;
        if armed(0) {
            watch |= 1;
        }
        if armed(1) {
            watch |= 2;
        }
        if armed(2) {
            watch |= OVERFLOW;
        }
        watch
    }

    /// Earliest time at which an enabled interrupt can fire.
    #[must_use]
    pub fn next_deadline(&self) -> Ticks {
        (0..CHANNELS)
            .filter_map(|ch| {
                let divisor = self.divisor(ch)?;
                let channel = &self.channels[ch];
                let distance = channel
                    .counter()
                    .distance(u32::from(channel.tcnt), self.watch(ch))?;
                Some(channel.clock.deadline(distance, divisor))
            })
            .min()
            .unwrap_or(Ticks::NEVER)
    }

    pub fn read(
        &mut self,
        offset: u32,
        size: AccessSize,
        now: Ticks,
        irq: &mut impl IrqSink,
    ) -> u16 {
        self.sync(now, irq);
        if offset < 8 {
            return self.read_common(offset, size);
        }
        let ch = (offset / 8 - 1) as usize;
        let reg = offset & 7;
        if ch >= CHANNELS {
            debug!(target: "unimp", "16-bit timer register {offset:#x} read");
            return 0xFF;
        }
        let channel = &self.channels[ch];
        match (reg, size) {
            (0, AccessSize::Byte) => u16::from(channel.tcr | 0x80),
            (1, AccessSize::Byte) => u16::from(channel.tior | 0x88),
            (2, AccessSize::Word) => channel.tcnt,
            (4, AccessSize::Word) => channel.gr[0],
            (6, AccessSize::Word) => channel.gr[1],
            _ => {
                warn!(target: "guest", "16-bit timer {size:?} read at {offset:#x}");
                0xFFFF
            }
        }
    }

    fn read_common(&self, offset: u32, size: AccessSize) -> u16 {
        if size != AccessSize::Byte {
            warn!(target: "guest", "16-bit timer word read at {offset:#x}");
            return 0xFFFF;
        }
        u16::from(match offset {
            0 => self.tstr | 0xF8,
            1 => self.tsnc | 0xF8,
            2 => self.tmdr | 0x98,
            3 => self.tolr | 0xC0,
            4..=6 => self.tisr[(offset - 4) as usize] | 0x88,
            _ => {
                debug!(target: "unimp", "16-bit timer register {offset:#x} read");
                0xFF
            }
        })
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
        if offset < 8 {
            self.write_common(offset, size, value as u8);
        } else {
            self.write_channel(offset, size, value);
        }
        pulse_new_requests(before, self.requests(), irq, Some);
    }

    fn write_common(&mut self, offset: u32, size: AccessSize, value: u8) {
        if size != AccessSize::Byte {
            warn!(target: "guest", "16-bit timer word write at {offset:#x}");
            return;
        }
        match offset {
            0 => self.tstr = value & 7,
            1 => {
                self.tsnc = value & 7;
                if self.tsnc != 0 {
                    warn!(target: "guest", "16-bit timer synchronous operation not supported");
                }
            }
            2 => {
                self.tmdr = value & 0x67;
                if self.tmdr != 0 {
                    warn!(target: "guest", "16-bit timer supports only normal operation");
                }
            }
            3 => {
                self.tolr = value & 0x3F;
                debug!(target: "unimp", "16-bit timer TOLR write {value:#04x}");
            }
            4..=6 => {
                let tisr = &mut self.tisr[(offset - 4) as usize];
                *tisr = (value & 0x70) | (*tisr & value & 0x07);
            }
            _ => debug!(target: "unimp", "16-bit timer register {offset:#x} write {value:#04x}"),
        }
    }

    fn write_channel(&mut self, offset: u32, size: AccessSize, value: u16) {
        let ch = (offset / 8 - 1) as usize;
        if ch >= CHANNELS {
            debug!(target: "unimp", "16-bit timer register {offset:#x} write {value:#06x}");
            return;
        }
        let running = self.tstr & (1 << ch) != 0;
        let channel = &mut self.channels[ch];
        match (offset & 7, size) {
            (0, AccessSize::Byte) => {
                if running {
                    warn!(target: "guest", "16-bit timer channel {ch} TCR written while running");
                }
                channel.tcr = value as u8 & 0x7F;
                if channel.tcr & 4 != 0 {
                    debug!(target: "unimp", "16-bit timer channel {ch} external clock");
                }
            }
            (1, AccessSize::Byte) => {
                channel.tior = value as u8 & 0x77;
                if channel.tior & 0x44 != 0 {
                    warn!(target: "guest", "16-bit timer channel {ch} input capture not supported");
                }
            }
            (2, AccessSize::Word) => channel.tcnt = value,
            (4, AccessSize::Word) => channel.gr[0] = value,
            (6, AccessSize::Word) => channel.gr[1] = value,
            _ => warn!(target: "guest", "16-bit timer {size:?} write at {offset:#x}"),
        }
    }
}

impl Observable for Timer16 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(ch) = path.strip_prefix("tcnt") {
            let ch: usize = ch.parse().ok()?;
            return self.channels.get(ch).map(|c| Value::U16(c.tcnt));
        }
        Some(match path {
            "tstr" => Value::U8(self.tstr),
            "tisra" => Value::U8(self.tisr[0]),
            "tisrb" => Value::U8(self.tisr[1]),
            "tisrc" => Value::U8(self.tisr[2]),
            "deadline" => Value::U64(self.next_deadline().get()),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "tstr", "tisra", "tisrb", "tisrc", "tcnt0", "tcnt1", "tcnt2", "deadline",
        ]
    }
}
