//! Headless H8 machine runner.
//!
//! Boots a firmware or kernel image on one of the boards, runs it until a
//! breakpoint, a dead sleep or the instruction budget, and reports the
//! final state. `RUST_LOG=guest=warn,int=debug,exec=trace` shows guest
//! errors, interrupt acceptance and every instruction.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use emu_core::Observable;
use machine_h8300::{Board, BoardConfig, Machine, StopReason};
use renesas_h8300::debug::register_names;
use renesas_h8300::decode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "h8300-run",
    about = "Run H8/300H and H8S images on the KaneBebe or EDOSK2674 board."
)]
struct Args {
    /// Board configuration (TOML). Flags below override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// kanebebe or edosk2674.
    #[arg(long)]
    board: Option<Board>,

    /// φ frequency in Hz.
    #[arg(long, value_name = "HZ")]
    clock_hz: Option<u64>,

    /// Raw image loaded at address 0.
    #[arg(long, value_name = "PATH")]
    firmware: Option<PathBuf>,

    /// Raw kernel image booted directly.
    #[arg(long, value_name = "PATH")]
    kernel: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    kernel_address: Option<u32>,

    /// Device tree blob passed to the kernel in ER0.
    #[arg(long, value_name = "PATH")]
    dtb: Option<PathBuf>,

    #[arg(long, value_name = "N")]
    max_instructions: Option<u64>,

    /// Stop when PC reaches ADDR. Repeatable.
    #[arg(long = "break", value_name = "ADDR", value_parser = parse_address)]
    breakpoints: Vec<u32>,

    /// Print the registers and the next instruction when the run stops.
    #[arg(long, default_value_t = false)]
    dump: bool,

    /// Print the final machine status as JSON on stdout.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print these observable paths when the run stops.
    #[arg(long, value_name = "PATH")]
    query: Vec<String>,
}

fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("bad address `{text}`: {e}"))
}

impl Args {
    fn board_config(&self) -> Result<BoardConfig> {
        let mut config = match &self.config {
            Some(path) => BoardConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BoardConfig::default(),
        };
        if let Some(board) = self.board {
            config.board = board;
        }
        if self.clock_hz.is_some() {
            config.clock_hz = self.clock_hz;
        }
        if self.firmware.is_some() {
            config.firmware.clone_from(&self.firmware);
        }
        if self.kernel.is_some() {
            config.kernel.clone_from(&self.kernel);
        }
        if self.kernel_address.is_some() {
            config.kernel_address = self.kernel_address;
        }
        if self.dtb.is_some() {
            config.dtb.clone_from(&self.dtb);
        }
        if self.max_instructions.is_some() {
            config.max_instructions = self.max_instructions;
        }
        Ok(config)
    }
}

fn dump_registers(machine: &Machine) {
    let cpu = machine.cpu();
    for (n, name) in register_names(cpu.model()).iter().enumerate() {
        if let Some(value) = cpu.read_debug_register(n) {
            println!("{name:>4} = {value:08x}");
        }
    }
    let pc = cpu.regs.pc;
    match decode(cpu.model(), pc, |addr| machine.bus().peek(addr)) {
        Ok(decoded) => println!("{pc:06x}: {}", decoded.insn),
        Err(err) => println!("{pc:06x}: {err}"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.board_config()?;
    let mut machine = Machine::from_config(&config).context("building the machine")?;
    for &address in &args.breakpoints {
        machine.cpu_mut().add_breakpoint(address);
    }

    info!(
        "{} ({:?}) at {} Hz, PC {:#08x}",
        config.board,
        config.board.soc(),
        config.clock_hz(),
        machine.cpu().regs.pc
    );
    let stop = machine.run(config.max_instructions);
    let status = machine.status();
    match stop {
        StopReason::Budget => info!("instruction budget reached"),
        StopReason::Breakpoint { address } => info!("breakpoint at {address:#08x}"),
        StopReason::Halted => info!("CPU asleep with no wake-up source"),
    }
    info!(
        "{} instructions, {} states, {} µs simulated",
        status.instructions,
        status.cycles,
        status.elapsed_ns / 1000
    );

    if args.dump {
        dump_registers(&machine);
    }
    for path in &args.query {
        match machine.query(path) {
            Some(value) => println!("{path} = {value}"),
            None => println!("{path}: unknown path"),
        }
    }
    if args.json {
        let report = serde_json::json!({ "stop": stop, "status": status });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
