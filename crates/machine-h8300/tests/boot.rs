//! Whole-machine runs: firmware boot, timer interrupts waking a sleeping
//! CPU, configuration files and the JSON status report.

use emu_core::{Observable, Value};
use machine_h8300::{Board, BoardConfig, Machine, MachineError, StopReason};
use renesas_h8300::{H8Bus, InterruptMode};

const SLEEP: [u8; 2] = [0x01, 0x80];
// BRA .-2 from the instruction after SLEEP.
const BRA_BACK: [u8; 2] = [0x40, 0xFC];
// BRA .
const BRA_BACK_TO_SELF: [u8; 2] = [0x40, 0xFE];

/// Firmware with reset at 0x100 (SLEEP; BRA back) and `vector` pointing
/// at a handler at 0x200 that sleeps.
fn sleeper(vector: usize) -> Vec<u8> {
    let mut image = vec![0; 0x210];
    image[0..4].copy_from_slice(&0x100u32.to_be_bytes());
    image[vector * 4..vector * 4 + 4].copy_from_slice(&0x200u32.to_be_bytes());
    image[0x100..0x102].copy_from_slice(&SLEEP);
    image[0x102..0x104].copy_from_slice(&BRA_BACK);
    image[0x200..0x202].copy_from_slice(&SLEEP);
    image
}

fn query_u8(machine: &Machine, path: &str) -> u8 {
    match machine.query(path) {
        Some(Value::U8(v)) => v,
        other => panic!("{path}: {other:?}"),
    }
}

#[test]
fn tmr_compare_match_wakes_kanebebe() {
    let mut m = Machine::new(Board::Kanebebe, 25_000_000);
    m.load_firmware(&sleeper(36)).unwrap();
    m.cpu_mut().regs.er[7] = 0xFF_FF00;
    m.cpu_mut().regs.ccr.i = false;

    // TCORA0 = 99, TCR0 = CMIEA | φ/64.
    m.bus_mut().write_byte(0xFF_FF84, 99);
    m.bus_mut().write_byte(0xFF_FF80, 0x42);

    assert_eq!(m.run(Some(100)), StopReason::Halted);
    assert_eq!(m.cpu().regs.pc, 0x202);
    assert!(m.cpu().regs.ccr.i);
    assert!(m.now().get() >= 99 * 64);
    assert_eq!(query_u8(&m, "tmr0.tcsr0") & 0x40, 0x40);
    assert_eq!(m.query("intc.asserted"), Some(Value::from(None::<u8>)));
    // Return frame: CCR with I clear, PC just past the first SLEEP.
    assert_eq!(m.bus_mut().read_long(0xFF_FEFC), 0x0000_0102);
}

#[test]
fn tpu_compare_match_wakes_edosk2674_in_exr_mode() {
    let mut m = Machine::new(Board::Edosk2674, 33_333_333);
    m.load_firmware(&sleeper(40)).unwrap();
    m.cpu_mut().regs.er[7] = 0xFF_8000;

    let bus = m.bus_mut();
    // INTCR.INTM = 2
    bus.write_byte(0xFF_FF31, 0x20);
    // TPU0: TGRA = 49, TGIEA, φ/1, start.
    bus.write_word(0xFF_FFD8, 49);
    bus.write_byte(0xFF_FFD4, 0x01);
    bus.write_byte(0xFF_FFD0, 0x00);
    bus.write_byte(0xFF_FFC0, 0x01);
    m.cpu_mut().regs.exr.i = 0;

    assert_eq!(m.run(Some(100)), StopReason::Halted);
    assert_eq!(m.cpu().interrupt_mode(), InterruptMode::Exr);
    assert_eq!(m.cpu().regs.pc, 0x202);
    assert_eq!(m.cpu().regs.exr.i, 7);
    assert_eq!(query_u8(&m, "tpu.tsr0") & 0x01, 0x01);
    assert_eq!(m.status().asserted, None);
}

#[test]
fn masked_timer_interrupt_leaves_cpu_asleep() {
    let mut m = Machine::new(Board::Kanebebe, 25_000_000);
    m.load_firmware(&sleeper(36)).unwrap();
    m.cpu_mut().regs.er[7] = 0xFF_FF00;

    m.bus_mut().write_byte(0xFF_FF84, 9);
    m.bus_mut().write_byte(0xFF_FF80, 0x41);

    // CCR.I is still set from reset.
    assert_eq!(m.run(Some(100)), StopReason::Halted);
    assert_eq!(m.cpu().regs.pc, 0x102);
    assert_eq!(m.status().asserted, Some(36));
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("h8300-run-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn config_file_boots_firmware_and_reports_json() {
    let dir = scratch_dir("config");
    std::fs::write(dir.join("fw.bin"), sleeper(36)).unwrap();
    std::fs::write(
        dir.join("board.toml"),
        "board = \"kanebebe\"\nfirmware = \"fw.bin\"\nclock_hz = 20000000\n",
    )
    .unwrap();

    let config = BoardConfig::load(&dir.join("board.toml")).unwrap();
    let mut m = Machine::from_config(&config).unwrap();
    let stop = m.run(config.max_instructions);
    assert_eq!(stop, StopReason::Halted);

    let status = serde_json::to_value(m.status()).unwrap();
    assert_eq!(status["board"], "kanebebe");
    assert_eq!(status["soc"], "H8/3069");
    assert_eq!(status["clock_hz"], 20_000_000);
    assert_eq!(status["pc"], 0x102);
    assert_eq!(status["sleeping"], true);
    assert_eq!(status["exr"], serde_json::Value::Null);
    assert_eq!(status["interrupt_mode"], "Ccr");
    assert_eq!(status["er"].as_array().map(Vec::len), Some(8));

    let stop = serde_json::to_value(stop).unwrap();
    assert_eq!(stop, serde_json::json!({ "reason": "halted" }));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn kernel_boot_from_config_with_dtb() {
    let dir = scratch_dir("kernel");
    std::fs::write(dir.join("linux.bin"), BRA_BACK_TO_SELF).unwrap();
    std::fs::write(dir.join("board.dtb"), [0xD0, 0x0D, 0xFE, 0xED, 0, 0, 0, 8]).unwrap();
    let mut config = BoardConfig::for_board(Board::Kanebebe);
    config.kernel = Some(dir.join("linux.bin"));
    config.dtb = Some(dir.join("board.dtb"));
    config.max_instructions = Some(10);

    let mut m = Machine::from_config(&config).unwrap();
    assert_eq!(m.cpu().regs.pc, 0x68_0000);
    assert_eq!(m.cpu().regs.er[0], 0x7F_FFF8);
    assert_eq!(m.run(config.max_instructions), StopReason::Budget);
    assert_eq!(m.cpu().regs.pc, 0x68_0000);
    assert_eq!(m.instructions(), 10);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn missing_images_are_errors() {
    let config = BoardConfig::for_board(Board::Edosk2674);
    assert!(matches!(Machine::from_config(&config), Err(MachineError::NoImage)));

    let mut config = BoardConfig::for_board(Board::Edosk2674);
    config.firmware = Some("/nonexistent/h8/firmware.bin".into());
    assert!(matches!(Machine::from_config(&config), Err(MachineError::Io { .. })));
}
