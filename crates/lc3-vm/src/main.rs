//! Command-line runner for LC-3 program images.

mod terminal;

use std::error::Error as _;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use lc3_core::{Fault, FaultClass, LoadError, Machine, MachineConfig, StopReason};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::terminal::{install_interrupt_handler, RawModeGuard, TerminalConsole};

const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_ILLEGAL_INSTRUCTION: u8 = 3;
const EXIT_CONSOLE_FAILURE: u8 = 4;
const EXIT_INTERRUPTED: u8 = 130;

/// Rows of disassembly logged on either side of a faulting instruction.
const FAULT_LISTING_CONTEXT: u16 = 4;

/// Run one or more LC-3 program images.
#[derive(Parser, Debug)]
#[command(name = "lc3-vm", version, about = "Run LC-3 program images", long_about = None)]
struct Cli {
    /// Image files to load, in order; later images overwrite earlier ones.
    #[arg(required = true, num_args = 1.., value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Initial program counter in hex (`3000`, `x3000` or `0x3000`).
    #[arg(long, value_name = "ADDR", value_parser = parse_address, default_value = "0x3000")]
    entry: u16,

    /// Stop after this many retired instructions.
    #[arg(long, value_name = "N")]
    max_instructions: Option<u64>,

    /// Do not print the `Shutdown` banner on HALT.
    #[arg(long)]
    quiet: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    const fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            entry_pc: self.entry,
            instruction_limit: self.max_instructions,
            announce_halt: !self.quiet,
        }
    }
}

fn parse_address(text: &str) -> Result<u16, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('x'))
        .or_else(|| text.strip_prefix('X'))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|error| format!("invalid address `{text}`: {error}"))
}

#[derive(Debug, Error)]
enum HarnessError {
    #[error("failed to load image: {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("cannot prepare terminal: {0}")]
    Terminal(#[from] io::Error),
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl HarnessError {
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Load { .. } => EXIT_LOAD_FAILURE,
            Self::Terminal(_) => EXIT_CONSOLE_FAILURE,
            Self::Fault(fault) => fault_exit_code(fault),
        }
    }
}

const fn fault_exit_code(fault: &Fault) -> u8 {
    if fault.is_interrupt() {
        return EXIT_INTERRUPTED;
    }
    match fault.class() {
        FaultClass::IllegalInstruction => EXIT_ILLEGAL_INSTRUCTION,
        FaultClass::Console => EXIT_CONSOLE_FAILURE,
    }
}

const fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<StopReason, HarnessError> {
    let mut machine = Machine::with_config(cli.machine_config());
    for path in &cli.images {
        let summary = machine
            .load_image_file(path)
            .map_err(|source| HarnessError::Load {
                path: path.clone(),
                source,
            })?;
        tracing::info!(
            path = %path.display(),
            words = summary.words_loaded,
            "loaded image at x{:04X}",
            summary.origin
        );
    }

    install_interrupt_handler()?;
    let _raw_mode = RawModeGuard::enable()?;
    let mut console = TerminalConsole::new();

    match machine.run(&mut console) {
        Ok(outcome) => {
            tracing::info!(steps = outcome.steps, stop = ?outcome.stop, "machine stopped");
            Ok(outcome.stop)
        }
        Err(fault) => {
            for row in machine.disassemble_around_pc(FAULT_LISTING_CONTEXT, FAULT_LISTING_CONTEXT) {
                let marker = if row.addr == fault.pc { '>' } else { ' ' };
                tracing::debug!(
                    "{marker} x{:04X}  x{:04X}  {} {}",
                    row.addr,
                    row.raw_word,
                    row.mnemonic,
                    row.operands
                );
            }
            Err(fault.into())
        }
    }
}

fn report(error: &HarnessError) {
    if let HarnessError::Fault(fault) = error {
        if fault.is_interrupt() {
            println!();
            return;
        }
    }
    eprintln!("{error}");
    if let HarnessError::Load { source, .. } = error {
        if let Some(cause) = source.source() {
            eprintln!("  caused by: {cause}");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::from(error.exit_code())
        }
    }
}

#[cfg(test)]
use tempfile as _;

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use lc3_core::{ConsoleError, Fault, FaultCause, Opcode};

    use super::{fault_exit_code, parse_address, verbosity_filter, Cli, HarnessError};

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn addresses_accept_optional_prefixes() {
        assert_eq!(parse_address("3000"), Ok(0x3000));
        assert_eq!(parse_address("x4000"), Ok(0x4000));
        assert_eq!(parse_address("X4000"), Ok(0x4000));
        assert_eq!(parse_address("0xFFFF"), Ok(0xFFFF));
        assert_eq!(parse_address("0Xfe00"), Ok(0xFE00));
    }

    #[test]
    fn addresses_reject_garbage_and_overflow() {
        assert!(parse_address("").is_err());
        assert!(parse_address("x").is_err());
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("zz").is_err());
    }

    #[test]
    fn arguments_map_onto_machine_config() {
        let cli = Cli::try_parse_from([
            "lc3-vm",
            "--entry",
            "x4000",
            "--max-instructions",
            "25",
            "--quiet",
            "-vv",
            "os.obj",
            "prog.obj",
        ])
        .expect("valid arguments");

        let config = cli.machine_config();
        assert_eq!(config.entry_pc, 0x4000);
        assert_eq!(config.instruction_limit, Some(25));
        assert!(!config.announce_halt);
        assert_eq!(cli.images.len(), 2);
        assert_eq!(verbosity_filter(cli.verbose), "debug");
    }

    #[test]
    fn defaults_start_at_user_space() {
        let cli = Cli::try_parse_from(["lc3-vm", "prog.obj"]).expect("valid arguments");
        let config = cli.machine_config();
        assert_eq!(config.entry_pc, 0x3000);
        assert_eq!(config.instruction_limit, None);
        assert!(config.announce_halt);
        assert_eq!(verbosity_filter(cli.verbose), "warn");
    }

    #[test]
    fn at_least_one_image_is_required() {
        assert!(Cli::try_parse_from(["lc3-vm"]).is_err());
    }

    #[test]
    fn faults_map_to_distinct_exit_codes() {
        let illegal = Fault::new(
            0x3000,
            FaultCause::IllegalOpcode {
                opcode: Opcode::Res,
                word: 0xD000,
            },
        );
        let unknown_trap = Fault::new(0x3000, FaultCause::UnknownTrap { vector: 0x26 });
        let closed = Fault::new(0x3000, ConsoleError::Closed.into());
        let interrupted = Fault::new(0x3000, ConsoleError::Interrupted.into());

        assert_eq!(fault_exit_code(&illegal), 3);
        assert_eq!(fault_exit_code(&unknown_trap), 3);
        assert_eq!(fault_exit_code(&closed), 4);
        assert_eq!(fault_exit_code(&interrupted), 130);
        assert_eq!(HarnessError::Fault(closed).exit_code(), 4);
    }
}
