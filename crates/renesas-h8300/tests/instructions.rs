//! Stepped-execution tests on a flat RAM bus.

use renesas_h8300::{
    Ccr, Cpu, CpuModel, H8Bus, InterruptMode, IrqRequest, StepOutcome, VECTOR_TRACE,
};

/// 64 KiB RAM mirrored across the 24-bit space. Records interrupt acks.
struct RamBus {
    mem: Vec<u8>,
    acks: Vec<u8>,
}

impl RamBus {
    fn new() -> Self {
        Self {
            mem: vec![0; 0x1_0000],
            acks: Vec::new(),
        }
    }

    fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.write_byte(addr + i as u32, b);
        }
    }

    fn set_vector(&mut self, vector: u8, handler: u32) {
        self.write_long(u32::from(vector) * 4, handler);
    }
}

impl H8Bus for RamBus {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.mem[(addr & 0xFFFF) as usize]
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.mem[(addr & 0xFFFF) as usize] = value;
    }

    fn interrupt_ack(&mut self, vector: u8) {
        self.acks.push(vector);
    }
}

/// CPU with PC at 0x100, SP at 0x8000 and interrupts unmasked.
fn setup(model: CpuModel, program: &[u8]) -> (Cpu, RamBus) {
    let mut bus = RamBus::new();
    bus.load(0x100, program);
    let mut cpu = Cpu::new(model);
    cpu.regs.pc = 0x100;
    cpu.regs.set_sp(0x8000);
    cpu.regs.ccr = Ccr::from_byte(0x00);
    (cpu, bus)
}

#[test]
fn mov_byte_immediate_sets_logic_flags() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0xF8, 0x12]);
    cpu.regs.ccr = Ccr::from_byte(0x0F); // N Z V C
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert_eq!(cpu.regs.r8(8), 0x12);
    assert!(!cpu.regs.ccr.z && !cpu.regs.ccr.n && !cpu.regs.ccr.v);
    assert!(cpu.regs.ccr.c, "MOV leaves C");
    assert_eq!(cpu.regs.pc, 0x102);
    assert_eq!(cpu.total_cycles().get(), 2);
}

#[test]
fn long_push_and_pop() {
    // MOV.L ER6,@-ER7; MOV.L @ER7+,ER5
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x01, 0x00, 0x6D, 0xF6, 0x01, 0x00, 0x6D, 0x75]);
    cpu.regs.er[6] = 0x1122_3344;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.sp(), 0x7FFC);
    assert_eq!(&bus.mem[0x7FFC..0x8000], &[0x11, 0x22, 0x33, 0x44]);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.er[5], 0x1122_3344);
    assert_eq!(cpu.regs.sp(), 0x8000);
}

#[test]
fn negative_displacement_and_predecrement_wrap_to_24_bits() {
    // MOV.B R0L,@(-0x20:16,ER2); MOV.W R1,@-ER3
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x6E, 0xA8, 0xFF, 0xE0, 0x6D, 0xB1]);
    cpu.regs.er[0] = 0x5A;
    cpu.regs.er[1] = 0xBEEF;
    cpu.regs.er[2] = 0x10;
    cpu.regs.er[3] = 0;
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0xFFF0], 0x5A);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.er[3], 0xFFFF_FFFE);
    assert_eq!(&bus.mem[0xFFFE..], &[0xBE, 0xEF]);
}

#[test]
fn jsr_and_rts() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x5E, 0x00, 0x02, 0x00]);
    bus.load(0x200, &[0x54, 0x70]);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x200);
    assert_eq!(cpu.regs.sp(), 0x7FFC);
    assert_eq!(bus.read_long(0x7FFC), 0x104);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x104);
    assert_eq!(cpu.regs.sp(), 0x8000);
}

#[test]
fn compare_and_branch() {
    // CMP.B #5,R0L; BEQ .+4
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0xA8, 0x05, 0x47, 0x04]);
    cpu.regs.set_r8(8, 5);
    cpu.step(&mut bus);
    assert!(cpu.regs.ccr.z);
    assert_eq!(cpu.regs.r8(8), 5, "CMP does not write back");
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x108);
}

#[test]
fn multiply_and_divide_register_widths() {
    // MULXU.B R1L,R2; DIVXU.W R1,ER3
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x50, 0x92, 0x53, 0x13]);
    cpu.regs.er[1] = 12;
    cpu.regs.er[2] = 0x0000_FF0A;
    cpu.regs.er[3] = 100_003;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.er[2], 120);
    cpu.regs.er[1] = 10;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.er[3], (3 << 16) | 10_000);
}

#[test]
fn bit_ops_on_register_and_memory() {
    // BSET #3,R0L; BTST #3,@0xFFFF20:8
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x70, 0x38, 0x7E, 0x20, 0x73, 0x30]);
    bus.write_byte(0xFF_FF20, 0x08);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.r8(8), 0x08);
    cpu.regs.ccr.z = true;
    cpu.step(&mut bus);
    assert!(!cpu.regs.ccr.z);
}

#[test]
fn stc_and_ldc_through_stack_step_by_two() {
    // STC CCR,@-ER7; LDC @ER7+,CCR
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x01, 0x40, 0x6D, 0xF0, 0x01, 0x40, 0x6D, 0x70]);
    cpu.regs.ccr = Ccr::from_byte(0x85);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.sp(), 0x7FFE);
    assert_eq!(bus.read_word(0x7FFE), 0x8500);
    cpu.regs.ccr = Ccr::from_byte(0x00);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.ccr.to_byte(), 0x85);
    assert_eq!(cpu.regs.sp(), 0x8000);
}

#[test]
fn shift_by_two_on_h8s() {
    // SHLL.B #2,R0L
    let (mut cpu, mut bus) = setup(CpuModel::H8S, &[0x10, 0x48]);
    cpu.regs.set_r8(8, 0x41);
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert_eq!(cpu.regs.r8(8), 0x04);
    assert!(cpu.regs.ccr.c);

    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x10, 0x48]);
    assert_eq!(
        cpu.step(&mut bus),
        StepOutcome::IllegalInstruction { address: 0x100 }
    );
}

#[test]
fn eepmov_copies_and_clears_count() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x7B, 0x5C, 0x59, 0x8F]);
    bus.load(0x1000, &[1, 2, 3]);
    cpu.regs.set_r8(12, 3);
    cpu.regs.er[5] = 0x1000;
    cpu.regs.er[6] = 0x2000;
    cpu.step(&mut bus);
    assert_eq!(&bus.mem[0x2000..0x2003], &[1, 2, 3]);
    assert_eq!(cpu.regs.er[5], 0x1003);
    assert_eq!(cpu.regs.er[6], 0x2003);
    assert_eq!(cpu.regs.r8(12), 0);
}

#[test]
fn interrupt_accepted_in_ccr_mode() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x00, 0x00]);
    bus.set_vector(20, 0x300);
    cpu.set_irq(Some(IrqRequest::new(20, 0)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Interrupt { vector: 20 });
    assert_eq!(cpu.regs.pc, 0x300);
    assert_eq!(cpu.regs.sp(), 0x7FFC);
    assert_eq!(bus.read_long(0x7FFC), 0x0000_0100);
    assert!(cpu.regs.ccr.i);
    assert_eq!(bus.acks, vec![20]);

    // I now masks every maskable request.
    cpu.set_irq(Some(IrqRequest::new(20, 1)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
}

#[test]
fn nmi_ignores_mask() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x00, 0x00]);
    cpu.regs.ccr = Ccr::from_byte(0xC0);
    bus.set_vector(7, 0x340);
    cpu.set_irq(Some(IrqRequest::nmi()));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Interrupt { vector: 7 });
    assert_eq!(cpu.regs.pc, 0x340);
}

#[test]
fn ccr_ui_mode_uses_two_level_mask() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x00, 0x00]);
    cpu.set_interrupt_mode(InterruptMode::CcrUi);
    cpu.regs.ccr = Ccr::from_byte(0x80);
    bus.set_vector(21, 0x300);
    assert_eq!(cpu.mask_level(), 2);

    cpu.set_irq(Some(IrqRequest::new(20, 0)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);

    cpu.set_irq(Some(IrqRequest::new(21, 1)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Interrupt { vector: 21 });
    assert!(cpu.regs.ccr.ui);
    assert_eq!(cpu.mask_level(), 3);
}

#[test]
fn exr_mode_stacks_exr_and_rte_restores_it() {
    let (mut cpu, mut bus) = setup(CpuModel::H8S, &[0x00, 0x00]);
    cpu.set_interrupt_mode(InterruptMode::Exr);
    cpu.regs.exr.i = 2;
    bus.set_vector(40, 0x300);
    bus.load(0x300, &[0x56, 0x70]);

    cpu.set_irq(Some(IrqRequest::new(40, 2)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed, "equal level is masked");

    cpu.regs.pc = 0x100;
    cpu.set_irq(Some(IrqRequest::new(40, 3)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Interrupt { vector: 40 });
    assert_eq!(cpu.regs.exr.i, 3);
    assert_eq!(cpu.regs.sp(), 0x7FFA);
    assert_eq!(bus.read_word(0x7FFA), 0x7A00);
    assert_eq!(bus.read_long(0x7FFC), 0x0000_0100);

    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert_eq!(cpu.regs.pc, 0x100);
    assert_eq!(cpu.regs.exr.i, 2);
    assert!(!cpu.regs.ccr.i);
    assert_eq!(cpu.regs.sp(), 0x8000);
}

#[test]
fn trapa_vectors_without_ack() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x57, 0x20]);
    bus.set_vector(10, 0x400);
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert_eq!(cpu.regs.pc, 0x400);
    assert_eq!(bus.read_long(0x7FFC), 0x102);
    assert!(bus.acks.is_empty());
}

#[test]
fn trace_exception_after_instruction() {
    let (mut cpu, mut bus) = setup(CpuModel::H8S, &[0x00, 0x00]);
    cpu.set_interrupt_mode(InterruptMode::Exr);
    cpu.regs.exr.t = true;
    bus.set_vector(VECTOR_TRACE, 0x500);
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert_eq!(cpu.regs.pc, 0x500);
    assert!(!cpu.regs.exr.t);
    assert_eq!(bus.read_long(0x7FFC), 0x102);
}

#[test]
fn sleep_waits_for_interrupt() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x01, 0x80]);
    bus.set_vector(20, 0x300);
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert!(cpu.is_sleeping());
    assert_eq!(cpu.step(&mut bus), StepOutcome::Sleeping);

    cpu.set_irq(Some(IrqRequest::new(20, 0)));
    assert_eq!(cpu.step(&mut bus), StepOutcome::Interrupt { vector: 20 });
    assert!(!cpu.is_sleeping());
    assert_eq!(bus.read_long(0x7FFC), 0x102);
}

#[test]
fn illegal_instruction_skips_two_bytes() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x00, 0x01]);
    assert_eq!(
        cpu.step(&mut bus),
        StepOutcome::IllegalInstruction { address: 0x100 }
    );
    assert_eq!(cpu.regs.pc, 0x102);
}

#[test]
fn breakpoint_stops_once_then_executes() {
    let (mut cpu, mut bus) = setup(CpuModel::H8300H, &[0x00, 0x00, 0x00, 0x00]);
    cpu.add_breakpoint(0x100);
    assert_eq!(cpu.step(&mut bus), StepOutcome::Breakpoint { address: 0x100 });
    assert_eq!(cpu.regs.pc, 0x100);
    assert_eq!(cpu.step(&mut bus), StepOutcome::Executed);
    assert_eq!(cpu.regs.pc, 0x102);
    assert!(cpu.remove_breakpoint(0x100));
}
