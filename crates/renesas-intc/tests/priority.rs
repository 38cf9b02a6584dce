//! Priority resolution and acknowledge behaviour through the register
//! interface, the way guest code programs the controller.

use emu_core::{AccessSize, IrqSink};
use renesas_h8300::IrqRequest;
use renesas_intc::{IntcModel, InterruptController, Region};

const IPRA: u32 = 0;
const IPRB: u32 = 2;
const ISCRL: u32 = 28;
const IER: u32 = 2;

fn h8s_with_irqs_enabled() -> InterruptController {
    let mut intc = InterruptController::new(IntcModel::H8S);
    intc.write(Region::Secondary, IER, AccessSize::Word, 0xFFFF);
    // Falling edge on IRQ0-7.
    intc.write(Region::Primary, ISCRL, AccessSize::Word, 0x5555);
    intc
}

#[test]
fn equal_priority_resolves_to_lowest_irq() {
    let mut intc = h8s_with_irqs_enabled();
    // IRQ3 in IPRA2-0, IRQ5 in IPRB10-8, both level 5.
    intc.write(Region::Primary, IPRA, AccessSize::Word, 0x0005);
    intc.write(Region::Primary, IPRB, AccessSize::Word, 0x0500);

    intc.set_irq(IntcModel::H8S.external_irq(5), false);
    intc.set_irq(IntcModel::H8S.external_irq(3), false);
    assert_eq!(intc.asserted(), Some(19));
    assert_eq!(intc.request(), Some(IrqRequest::new(19, 5)));
}

#[test]
fn enabling_ier_delivers_a_line_already_held_low() {
    let mut intc = InterruptController::new(IntcModel::H8S);
    let irq0 = IntcModel::H8S.external_irq(0);
    // Low-level IRQ0 goes low while IER is still clear.
    intc.set_irq(irq0, false);
    assert_eq!(intc.asserted(), None);

    intc.write(Region::Secondary, IER, AccessSize::Word, 0x0001);
    assert_eq!(intc.asserted(), Some(16));
    assert_eq!(intc.request(), Some(IrqRequest::new(16, 7)));
}

#[test]
fn disabling_ier_withdraws_a_pending_request() {
    let mut intc = h8s_with_irqs_enabled();
    intc.set_irq(IntcModel::H8S.external_irq(0), false);
    assert_eq!(intc.asserted(), Some(16));

    intc.write(Region::Secondary, IER, AccessSize::Word, 0x0000);
    assert_eq!(intc.asserted(), None);
    assert_eq!(intc.request(), None);
    // The flag survives; enabling again brings the request back.
    assert_eq!(intc.read(Region::Secondary, 4, AccessSize::Word), 0x0001);
    intc.write(Region::Secondary, IER, AccessSize::Word, 0x0001);
    assert_eq!(intc.asserted(), Some(16));
}

#[test]
fn ipr_write_promotes_a_waiting_source() {
    let mut intc = h8s_with_irqs_enabled();
    // IRQ2 at 3, IRQ7 at 1.
    intc.write(Region::Primary, IPRA, AccessSize::Word, 0x0030);
    intc.write(Region::Primary, IPRB, AccessSize::Word, 0x0001);
    intc.set_irq(IntcModel::H8S.external_irq(2), false);
    intc.set_irq(IntcModel::H8S.external_irq(7), false);
    assert_eq!(intc.request(), Some(IrqRequest::new(18, 3)));

    // IRQ7 raised to 6 overtakes IRQ2 without any line change.
    intc.write(Region::Primary, IPRB, AccessSize::Word, 0x0006);
    assert_eq!(intc.request(), Some(IrqRequest::new(23, 6)));
}

#[test]
fn equal_priority_on_h8300h() {
    let mut intc = InterruptController::new(IntcModel::H8300H);
    intc.write(Region::Primary, 0, AccessSize::Byte, 0x3F);
    intc.write(Region::Primary, 1, AccessSize::Byte, 0x3F);
    // IPRA5 covers IRQ2/3, IPRA4 covers IRQ4/5.
    intc.write(Region::Primary, 4, AccessSize::Byte, 0x30);

    intc.set_irq(IntcModel::H8300H.external_irq(5), false);
    intc.set_irq(IntcModel::H8300H.external_irq(3), false);
    assert_eq!(intc.asserted(), Some(15));
}

#[test]
fn higher_priority_preempts_then_reverts() {
    let mut intc = h8s_with_irqs_enabled();
    // IRQ2 at 2 (IPRA6-4), IRQ7 at 4 (IPRB2-0).
    intc.write(Region::Primary, IPRA, AccessSize::Word, 0x0020);
    intc.write(Region::Primary, IPRB, AccessSize::Word, 0x0004);

    intc.set_irq(IntcModel::H8S.external_irq(2), false);
    assert_eq!(intc.request(), Some(IrqRequest::new(18, 2)));

    intc.set_irq(IntcModel::H8S.external_irq(7), false);
    assert_eq!(intc.request(), Some(IrqRequest::new(23, 4)));

    intc.acknowledge(23);
    assert_eq!(intc.request(), Some(IrqRequest::new(18, 2)));
    // Edge-triggered: acknowledge also clears the ISR flag.
    assert_eq!(intc.read(Region::Secondary, 4, AccessSize::Word), 0x0004);
}

#[test]
fn acknowledge_walks_down_priorities() {
    let mut intc = InterruptController::new(IntcModel::H8S);
    // TMR0 (72) at 6 and SCI0 (80) at 1 in IPRH, TPU0 (40) at 3 in IPRF.
    intc.write(Region::Primary, 14, AccessSize::Word, 0x6010);
    intc.write(Region::Primary, 10, AccessSize::Word, 0x0030);
    for source in [80, 40, 72] {
        intc.pulse(source);
    }

    let mut order = Vec::new();
    while let Some(source) = intc.asserted() {
        order.push(source);
        intc.acknowledge(source as u8);
    }
    assert_eq!(order, vec![72, 40, 80]);
}

#[test]
fn held_low_level_line_stays_asserted() {
    let mut intc = InterruptController::new(IntcModel::H8S);
    intc.write(Region::Secondary, IER, AccessSize::Word, 0x0001);
    // ISCR 00: IRQ0 is low-level sensitive.
    intc.set_irq(16, false);
    assert_eq!(intc.asserted(), Some(16));

    intc.acknowledge(16);
    assert_eq!(intc.asserted(), Some(16), "line still low");

    intc.set_irq(16, true);
    assert_eq!(intc.asserted(), None);
}
