//! Timer pulse unit (H8S/2674), six channels in three register windows.
//!
//! Channel window, 16 bytes per channel:
//!
//! | Offset | Register | Access     |
//! |--------|----------|------------|
//! | 0      | TCR      | byte       |
//! | 1      | TMDR     | byte       |
//! | 2      | TIORH    | byte/word  |
//! | 3      | TIORL    | byte       |
//! | 4      | TIER     | byte       |
//! | 5      | TSR      | byte       |
//! | 6      | TCNT     | word       |
//! | 8-14   | TGRA-D   | word       |
//!
//! TGRC/TGRD and their flags exist on channels 0 and 3 only. Channels 1
//! and 4 can count the overflows of channels 2 and 5.

use emu_core::{AccessSize, IrqSink, Observable, Ticks, Value};
use tracing::{debug, warn};

use crate::clock::ChannelClock;
use crate::engine::{Counter, OVERFLOW};
use crate::signal::pulse_new_requests;

const CHANNELS: usize = 6;

/// IRQ output lines, numbered from the TGI0A vector.
pub const TPU_LINES: usize = 32;

// TSR flags / TIER enables: TGFA-TGFD 3-0, TCFV 4.
const TCFV: u8 = 0x10;

/// Register window an access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpuWindow {
    /// Channels 0-2.
    Low,
    /// Channels 3-5.
    High,
    /// TSTR at 0, TSYR at 1.
    Common,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Phi(u64),
    External,
    /// Overflow of the next channel.
    Cascade,
}

use Source::{Cascade, External, Phi};

#[rustfmt::skip]
const PRESCALERS: [[Source; 8]; CHANNELS] = [
    [Phi(1), Phi(4), Phi(16), Phi(64), External, External, External, External],
    [Phi(1), Phi(4), Phi(16), Phi(64), External, External, Phi(256), Cascade],
    [Phi(1), Phi(4), Phi(16), Phi(64), External, External, External, Phi(1024)],
    [Phi(1), Phi(4), Phi(16), Phi(64), Phi(256), Phi(1024), External, External],
    [Phi(1), Phi(4), Phi(16), Phi(64), Phi(256), Phi(1024), External, Cascade],
    [Phi(1), Phi(4), Phi(16), Phi(64), External, External, External, External],
];

// Output line per flag bit (A, B, C, D, V), relative to TGI0A.
#[rustfmt::skip]
const LINES: [[Option<usize>; 5]; CHANNELS] = [
    [Some(0), Some(1), Some(2), Some(3), Some(4)],
    [Some(8), Some(9), None, None, Some(10)],
    [Some(12), Some(13), None, None, Some(14)],
    [Some(16), Some(17), Some(18), Some(19), Some(20)],
    [Some(24), Some(25), None, None, Some(26)],
    [Some(28), Some(29), None, None, Some(30)],
];

const fn has_cd(ch: usize) -> bool {
    ch == 0 || ch == 3
}

/// Flag bits that exist on channel `ch`.
const fn flag_mask(ch: usize) -> u8 {
    if has_cd(ch) { 0x1F } else { 0x13 }
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    tcr: u8,
    tmdr: u8,
    tior: u16,
    tier: u8,
    tsr: u8,
    tcnt: u16,
    tgr: [u16; 4],
    clock: ChannelClock,
}

#[derive(Debug, Clone)]
pub struct Tpu {
    tstr: u8,
    tsyr: u8,
    channels: [Channel; CHANNELS],
}

impl Default for Tpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Tpu {
    #[must_use]
    pub fn new() -> Self {
        let mut tpu = Self {
            tstr: 0,
            tsyr: 0,
            channels: [Channel::default(); CHANNELS],
        };
        tpu.reset();
        tpu
    }

    pub fn reset(&mut self) {
        self.tstr = 0;
        self.tsyr = 0;
        self.channels = [Channel {
            tgr: [0xFFFF; 4],
            ..Channel::default()
        }; CHANNELS];
    }

    fn running(&self, ch: usize) -> bool {
        self.tstr & (1 << ch) != 0
    }

    fn source(&self, ch: usize) -> Option<Source> {
        self.running(ch)
            .then(|| PRESCALERS[ch][usize::from(self.channels[ch].tcr & 7)])
    }

    fn divisor(&self, ch: usize) -> Option<u64> {
        match self.source(ch) {
            Some(Phi(divisor)) => Some(divisor),
            _ => None,
        }
    }

    fn counter(&self, ch: usize) -> Counter {
        let channel = &self.channels[ch];
        let clear = match (channel.tcr >> 5) & 7 {
            1 => Some(0),
            2 => Some(1),
            5 if has_cd(ch) => Some(2),
            6 if has_cd(ch) => Some(3),
            _ => None,
        };
        let used = if has_cd(ch) { 4 } else { 2 };
        let compares = channel.tgr.map(u32::from);
        Counter::new(0xFFFF, &compares[..used], clear)
    }

    /// Advance channel `ch` by `counts`; returns the overflow count.
    fn advance(&mut self, ch: usize, counts: u64) -> u64 {
        let counter = self.counter(ch);
        let channel = &mut self.channels[ch];
        let mut value = u32::from(channel.tcnt);
        let events = counter.advance(&mut value, counts);
        channel.tcnt = value as u16;
        channel.tsr |= events.mask() & flag_mask(ch);
        events.overflows
    }

    /// Enabled and flagged events, bit `ch * 8 + flag bit`.
    fn requests(&self) -> u64 {
        self.channels
            .iter()
            .enumerate()
            .fold(0, |acc, (ch, c)| {
                acc | (u64::from(c.tsr & c.tier & flag_mask(ch)) << (ch * 8))
            })
    }

    fn signal(&self, before: u64, irq: &mut impl IrqSink) {
        pulse_new_requests(before, self.requests(), irq, |bit| {
            LINES[bit / 8].get(bit % 8).copied().flatten()
        });
    }

    /// Bring every running channel up to `now`, setting flags and
    /// pulsing IRQs.
    pub fn sync(&mut self, now: Ticks, irq: &mut impl IrqSink) {
        let before = self.requests();
        let mut overflows = [0; CHANNELS];
        for (ch, slot) in overflows.iter_mut().enumerate() {
            let divisor = self.divisor(ch);
            let counts = self.channels[ch].clock.sync(now, divisor);
            *slot = self.advance(ch, counts);
        }
        for ch in [1, 4] {
            if self.source(ch) == Some(Cascade) {
                self.advance(ch, overflows[ch + 1]);
            }
        }
        self.signal(before, irq);
    }

    fn watch(&self, ch: usize) -> u8 {
        let channel = &self.channels[ch];
        let armed = channel.tier & !channel.tsr & flag_mask(ch);
        (armed & 0x0F) | if armed & TCFV != 0 { OVERFLOW } else { 0 }
    }

    /// Earliest time at which an enabled interrupt can fire.
    #[must_use]
    pub fn next_deadline(&self) -> Ticks {
        let mut watch: [u8; CHANNELS] = core::array::from_fn(|ch| self.watch(ch));
        for ch in [1, 4] {
            if self.source(ch) == Some(Cascade) && watch[ch] != 0 {
                watch[ch + 1] |= OVERFLOW;
            }
        }
        (0..CHANNELS)
            .filter_map(|ch| {
                let divisor = self.divisor(ch)?;
                let channel = &self.channels[ch];
                let distance = self
                    .counter(ch)
                    .distance(u32::from(channel.tcnt), watch[ch])?;
                Some(channel.clock.deadline(distance, divisor))
            })
            .min()
            .unwrap_or(Ticks::NEVER)
    }

    pub fn read(
        &mut self,
        window: TpuWindow,
        offset: u32,
        size: AccessSize,
        now: Ticks,
        irq: &mut impl IrqSink,
    ) -> u16 {
        self.sync(now, irq);
        let Some(ch) = Self::channel_of(window, offset) else {
            return self.read_common(offset, size);
        };
        let reg = offset & 0x0F;
        let channel = &self.channels[ch];
        match (reg, size) {
            (0, AccessSize::Byte) => u16::from(channel.tcr),
            (1, AccessSize::Byte) => u16::from(channel.tmdr | 0xC0),
            (2, AccessSize::Word) => channel.tior,
            (2, AccessSize::Byte) => channel.tior >> 8,
            (3, AccessSize::Byte) => channel.tior & 0xFF,
            (4, AccessSize::Byte) => u16::from((channel.tier & (flag_mask(ch) | 0x80)) | 0x40),
            (5, AccessSize::Byte) => u16::from((channel.tsr & flag_mask(ch)) | 0xC0),
            (6, AccessSize::Word) => channel.tcnt,
            (8 | 10, AccessSize::Word) => channel.tgr[((reg - 8) / 2) as usize],
            (12 | 14, AccessSize::Word) if has_cd(ch) => channel.tgr[((reg - 8) / 2) as usize],
            (12 | 14, AccessSize::Word) => 0,
            _ => {
                warn!(target: "guest", "TPU{ch} {size:?} read at {reg:#x}");
                0xFFFF
            }
        }
    }

    fn channel_of(window: TpuWindow, offset: u32) -> Option<usize> {
        let base = match window {
            TpuWindow::Low => 0,
            TpuWindow::High => 3,
            TpuWindow::Common => return None,
        };
        Some(base + ((offset >> 4) as usize).min(2))
    }

    fn read_common(&self, offset: u32, size: AccessSize) -> u16 {
        match (offset, size) {
            (0, AccessSize::Byte) => u16::from(self.tstr),
            (1, AccessSize::Byte) => u16::from(self.tsyr),
            _ => {
                warn!(target: "guest", "TPU common {size:?} read at {offset:#x}");
                0
            }
        }
    }

    pub fn write(
        &mut self,
        window: TpuWindow,
        offset: u32,
        size: AccessSize,
        value: u16,
        now: Ticks,
        irq: &mut impl IrqSink,
    ) {
        self.sync(now, irq);
        let before = self.requests();
        match Self::channel_of(window, offset) {
            Some(ch) => self.write_channel(ch, offset & 0x0F, size, value),
            None => self.write_common(offset, size, value as u8),
        }
        self.signal(before, irq);
    }

    fn write_common(&mut self, offset: u32, size: AccessSize, value: u8) {
        match (offset, size) {
            (0, AccessSize::Byte) => self.tstr = value & 0x3F,
            (1, AccessSize::Byte) => {
                self.tsyr = value & 0x3F;
                if self.tsyr != 0 {
                    warn!(target: "guest", "TPU synchronous operation not supported");
                }
            }
            _ => warn!(target: "guest", "TPU common {size:?} write at {offset:#x}"),
        }
    }

    fn write_channel(&mut self, ch: usize, reg: u32, size: AccessSize, value: u16) {
        let running = self.running(ch);
        let channel = &mut self.channels[ch];
        let byte = value as u8;
        match (reg, size) {
            (0, AccessSize::Byte) => {
                if running {
                    warn!(target: "guest", "TPU{ch} TCR written while running");
                }
                channel.tcr = byte;
                if PRESCALERS[ch][usize::from(byte & 7)] == External {
                    debug!(target: "unimp", "TPU{ch} external clock");
                }
            }
            (1, AccessSize::Byte) => {
                channel.tmdr = byte & 0x3F;
                if channel.tmdr & 0x0F != 0 {
                    warn!(target: "guest", "TPU{ch} supports only normal operation");
                }
            }
            (2, AccessSize::Word) => channel.tior = value,
            (2, AccessSize::Byte) => channel.tior = (channel.tior & 0x00FF) | (u16::from(byte) << 8),
            (3, AccessSize::Byte) => channel.tior = (channel.tior & 0xFF00) | u16::from(byte),
            (4, AccessSize::Byte) => {
                channel.tier = byte;
                if byte & 0x80 != 0 {
                    debug!(target: "unimp", "TPU{ch} A/D conversion trigger");
                }
            }
            (5, AccessSize::Byte) => channel.tsr &= byte | !0x3F,
            (6, AccessSize::Word) => channel.tcnt = value,
            (8 | 10, AccessSize::Word) => channel.tgr[((reg - 8) / 2) as usize] = value,
            (12 | 14, AccessSize::Word) if has_cd(ch) => {
                channel.tgr[((reg - 8) / 2) as usize] = value;
            }
            (12 | 14, AccessSize::Word) => {}
            _ => warn!(target: "guest", "TPU{ch} {size:?} write at {reg:#x}"),
        }
    }
}

impl Observable for Tpu {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(ch) = path.strip_prefix("tcnt") {
            let ch: usize = ch.parse().ok()?;
            return self.channels.get(ch).map(|c| Value::U16(c.tcnt));
        }
        if let Some(ch) = path.strip_prefix("tsr") {
            let ch: usize = ch.parse().ok()?;
            return self.channels.get(ch).map(|c| Value::U8(c.tsr));
        }
        Some(match path {
            "tstr" => Value::U8(self.tstr),
            "deadline" => Value::U64(self.next_deadline().get()),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "tstr", "tcnt0", "tcnt1", "tcnt2", "tcnt3", "tcnt4", "tcnt5", "tsr0", "tsr1", "tsr2",
            "tsr3", "tsr4", "tsr5", "deadline",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::{LineRecorder, NullSink};

    fn byte(tpu: &mut Tpu, window: TpuWindow, offset: u32, value: u8, now: u64) {
        tpu.write(window, offset, AccessSize::Byte, u16::from(value), Ticks::new(now), &mut NullSink);
    }

    fn word(tpu: &mut Tpu, window: TpuWindow, offset: u32, value: u16, now: u64) {
        tpu.write(window, offset, AccessSize::Word, value, Ticks::new(now), &mut NullSink);
    }

    fn read(tpu: &mut Tpu, window: TpuWindow, offset: u32, size: AccessSize, now: u64) -> u16 {
        tpu.read(window, offset, size, Ticks::new(now), &mut NullSink)
    }

    #[test]
    fn reset_reads() {
        let mut tpu = Tpu::new();
        assert_eq!(read(&mut tpu, TpuWindow::Low, 5, AccessSize::Byte, 0), 0xC0);
        assert_eq!(read(&mut tpu, TpuWindow::High, 0x1E, AccessSize::Word, 0), 0);
        assert_eq!(read(&mut tpu, TpuWindow::High, 0x0E, AccessSize::Word, 0), 0xFFFF);
        assert_eq!(read(&mut tpu, TpuWindow::Common, 0, AccessSize::Byte, 0), 0);
    }

    #[test]
    fn tgrc_clear_on_channel_three() {
        let mut tpu = Tpu::new();
        word(&mut tpu, TpuWindow::High, 12, 49, 0);
        byte(&mut tpu, TpuWindow::High, 0, 0xA0 | 0x01, 0); // CCLR=TGRC, φ/4
        byte(&mut tpu, TpuWindow::Common, 0, 1 << 3, 0);
        assert_eq!(read(&mut tpu, TpuWindow::High, 6, AccessSize::Word, 4 * 49), 49);
        assert_eq!(read(&mut tpu, TpuWindow::High, 5, AccessSize::Byte, 4 * 49), 0xC4);
        assert_eq!(read(&mut tpu, TpuWindow::High, 6, AccessSize::Word, 4 * 50), 0);
    }

    #[test]
    fn enabled_flag_pulses_mapped_line() {
        let mut tpu = Tpu::new();
        let mut rec = LineRecorder::new();
        // Channel 4 is the second block of the high window.
        word(&mut tpu, TpuWindow::High, 0x1A, 10, 0);
        byte(&mut tpu, TpuWindow::High, 0x14, 0x02, 0); // TGIEB
        byte(&mut tpu, TpuWindow::Common, 0, 1 << 4, 0);
        assert_eq!(tpu.next_deadline(), Ticks::new(10));
        tpu.sync(Ticks::new(10), &mut rec);
        assert_eq!(rec.rising_edges(25), 1);
    }

    #[test]
    fn tsr_write_zero_clears() {
        let mut tpu = Tpu::new();
        byte(&mut tpu, TpuWindow::Common, 0, 0x01, 0);
        read(&mut tpu, TpuWindow::Low, 6, AccessSize::Word, 0x10000);
        assert_eq!(read(&mut tpu, TpuWindow::Low, 5, AccessSize::Byte, 0x10000), 0xDF);
        byte(&mut tpu, TpuWindow::Low, 5, !TCFV, 0x10000);
        assert_eq!(read(&mut tpu, TpuWindow::Low, 5, AccessSize::Byte, 0x10000), 0xCF);
    }

    #[test]
    fn channel_one_counts_channel_two_overflow() {
        let mut tpu = Tpu::new();
        byte(&mut tpu, TpuWindow::Low, 0x10, 0x07, 0);
        byte(&mut tpu, TpuWindow::Low, 0x20, 0x00, 0);
        byte(&mut tpu, TpuWindow::Common, 0, 0x06, 0);
        assert_eq!(read(&mut tpu, TpuWindow::Low, 0x16, AccessSize::Word, 0x30000), 3);
    }

    #[test]
    fn access_size_is_checked() {
        let mut tpu = Tpu::new();
        word(&mut tpu, TpuWindow::Low, 0, 0x1234, 0);
        assert_eq!(read(&mut tpu, TpuWindow::Low, 0, AccessSize::Byte, 0), 0);
        byte(&mut tpu, TpuWindow::Low, 8, 0x12, 0);
        assert_eq!(read(&mut tpu, TpuWindow::Low, 8, AccessSize::Word, 0), 0xFFFF);
        word(&mut tpu, TpuWindow::Low, 2, 0xABCD, 0);
        assert_eq!(read(&mut tpu, TpuWindow::Low, 3, AccessSize::Byte, 0), 0xCD);
    }
}
