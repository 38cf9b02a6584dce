//! A counter read, one compare interval later, lands exactly on the
//! compare value with the match flag set, and the deadline the timer
//! scheduled is that same instant.

use emu_core::{AccessSize, LineRecorder, NullSink, Ticks};
use renesas_timer::{Timer16, Tmr, TmrModel, Tpu, TpuWindow};

#[test]
fn tmr_compare_interval() {
    let mut tmr = Tmr::new(TmrModel::H8S);
    let start = Ticks::new(1234);
    tmr.write(4, AccessSize::Byte, 200, start, &mut NullSink);
    // CMIEA, φ/64.
    tmr.write(0, AccessSize::Byte, 0x42, start, &mut NullSink);

    let before = tmr.read(8, AccessSize::Byte, start, &mut NullSink);
    assert_eq!(before, 0);
    let deadline = tmr.next_deadline();
    assert_eq!(deadline, start.after(200 * 64));

    let mut rec = LineRecorder::new();
    assert_eq!(tmr.read(8, AccessSize::Byte, deadline, &mut rec), 200);
    assert_eq!(tmr.read(2, AccessSize::Byte, deadline, &mut rec) & 0x40, 0x40);
    assert_eq!(rec.rising_edges(0), 1);
}

#[test]
fn tmr_one_tick_early_has_no_match() {
    let mut tmr = Tmr::new(TmrModel::H8300H);
    tmr.write(4, AccessSize::Byte, 10, Ticks::ZERO, &mut NullSink);
    tmr.write(0, AccessSize::Byte, 0x41, Ticks::ZERO, &mut NullSink);
    let deadline = tmr.next_deadline();
    let early = Ticks::new(deadline.get() - 1);
    assert_eq!(tmr.read(8, AccessSize::Byte, early, &mut NullSink), 9);
    assert_eq!(tmr.read(2, AccessSize::Byte, early, &mut NullSink) & 0x40, 0);
}

#[test]
fn timer16_compare_interval() {
    let mut timer = Timer16::new();
    let start = Ticks::new(77);
    timer.write(8 + 4, AccessSize::Word, 5000, start, &mut NullSink);
    timer.write(8, AccessSize::Byte, 0x01, start, &mut NullSink); // φ/2
    timer.write(4, AccessSize::Byte, 0x10, start, &mut NullSink); // IMIEA0
    timer.write(0, AccessSize::Byte, 0x01, start, &mut NullSink);

    let deadline = timer.next_deadline();
    assert_eq!(deadline, start.after(5000 * 2));
    assert_eq!(timer.read(8 + 2, AccessSize::Word, deadline, &mut NullSink), 5000);
    assert_eq!(timer.read(4, AccessSize::Byte, deadline, &mut NullSink) & 0x01, 0x01);
}

#[test]
fn tpu_compare_interval_with_clear() {
    let mut tpu = Tpu::new();
    let start = Ticks::new(10);
    tpu.write(TpuWindow::Low, 0x28, AccessSize::Word, 300, start, &mut NullSink);
    tpu.write(TpuWindow::Low, 0x20, AccessSize::Byte, 0x20 | 0x03, start, &mut NullSink);
    tpu.write(TpuWindow::Low, 0x24, AccessSize::Byte, 0x01, start, &mut NullSink);
    tpu.write(TpuWindow::Common, 0, AccessSize::Byte, 0x04, start, &mut NullSink);

    let mut rec = LineRecorder::new();
    for period in 1..=3u64 {
        let deadline = tpu.next_deadline();
        // 301 counts per period after the first: 0..=300.
        let counts = if period == 1 { 300 } else { 300 + 301 * (period - 1) };
        assert_eq!(deadline, start.after(counts * 64));
        assert_eq!(tpu.read(TpuWindow::Low, 0x26, AccessSize::Word, deadline, &mut rec), 300);
        // Handler clears TGFA.
        tpu.write(TpuWindow::Low, 0x25, AccessSize::Byte, 0xFE, deadline, &mut rec);
    }
    assert_eq!(rec.rising_edges(12), 3);
}
