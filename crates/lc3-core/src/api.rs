//! Public host-facing API for embedding the virtual machine.

use std::io::Read;
use std::path::Path;

use crate::console::Console;
use crate::disasm::{disassemble_window, DisassemblyRow};
use crate::execute::step_one;
use crate::fault::Fault;
use crate::loader::{self, ImageSummary, LoadError};
use crate::memory::{Memory, USER_START};
use crate::state::{RegisterFile, RunState};

/// Default initial program counter: the start of user program space.
pub const DEFAULT_ENTRY_PC: u16 = USER_START;

/// Top-level configuration for a machine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Program counter on construction and after [`Machine::reset`].
    pub entry_pc: u16,
    /// Stop [`Machine::run`] after this many retired instructions.
    pub instruction_limit: Option<u64>,
    /// Write the `Shutdown` banner when `TRAP HALT` executes.
    pub announce_halt: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            entry_pc: DEFAULT_ENTRY_PC,
            instruction_limit: None,
            announce_halt: true,
        }
    }
}

/// Result of a single [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// One instruction retired and the machine is still running.
    Retired,
    /// The machine is halted, either by this instruction or earlier.
    Halted,
}

/// Why [`Machine::run`] returned without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StopReason {
    /// `TRAP HALT` cleared the run-flag.
    Halted,
    /// [`MachineConfig::instruction_limit`] was reached.
    InstructionLimit,
}

/// Summary of a completed [`Machine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Instructions retired during this run.
    pub steps: u64,
    /// Why the run ended.
    pub stop: StopReason,
}

/// Complete machine state: memory, registers, run-flag and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Machine {
    /// The 64 Ki-word address space.
    pub memory: Memory,
    /// General registers, program counter and condition code.
    pub registers: RegisterFile,
    /// Run-flag of the decode-execute loop.
    pub run_state: RunState,
    /// Configuration used by [`Machine::reset`], `HALT` and [`Machine::run`].
    pub config: MachineConfig,
    pub(crate) instructions_retired: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Creates a machine with zeroed memory and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    /// Creates a machine with zeroed memory, PC at `config.entry_pc` and the
    /// condition code set to zero.
    #[must_use]
    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            memory: Memory::new(),
            registers: RegisterFile::with_pc(config.entry_pc),
            run_state: RunState::Running,
            config,
            instructions_retired: 0,
        }
    }

    /// Restores registers, run-flag and instruction counter to their initial
    /// values. Memory, including loaded images, is preserved.
    pub fn reset(&mut self) {
        self.registers = RegisterFile::with_pc(self.config.entry_pc);
        self.run_state = RunState::Running;
        self.instructions_retired = 0;
    }

    /// Total instructions retired since construction or the last reset.
    #[must_use]
    pub const fn instructions_retired(&self) -> u64 {
        self.instructions_retired
    }

    /// Loads an image from `reader` into memory.
    ///
    /// # Errors
    ///
    /// See [`loader::load_image`].
    pub fn load_image<R: Read>(&mut self, reader: R) -> Result<ImageSummary, LoadError> {
        loader::load_image(&mut self.memory, reader)
    }

    /// Loads the image file at `path` into memory.
    ///
    /// # Errors
    ///
    /// See [`loader::load_image_file`].
    pub fn load_image_file(&mut self, path: impl AsRef<Path>) -> Result<ImageSummary, LoadError> {
        loader::load_image_file(&mut self.memory, path)
    }

    /// Executes exactly one instruction.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the instruction cannot retire; registers are
    /// left as they were before the fetch.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<StepOutcome, Fault> {
        step_one(self, console)
    }

    /// Runs until `HALT`, a fault, a console interrupt, or the configured
    /// instruction limit. The limit counts instructions retired by this call.
    ///
    /// # Errors
    ///
    /// Returns the first [`Fault`]. An interrupt reported by
    /// [`Console::check_interrupt`] is returned as a console fault at the
    /// current PC.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<RunOutcome, Fault> {
        tracing::debug!(
            limit = ?self.config.instruction_limit,
            "run started at x{:04X}",
            self.registers.pc()
        );

        let mut steps = 0_u64;
        let stop = loop {
            if !self.run_state.is_running() {
                break StopReason::Halted;
            }
            if self
                .config
                .instruction_limit
                .is_some_and(|limit| steps >= limit)
            {
                break StopReason::InstructionLimit;
            }

            console
                .check_interrupt()
                .map_err(|error| Fault::new(self.registers.pc(), error.into()))?;

            let outcome = self.step(console).inspect_err(|fault| {
                tracing::debug!(steps, "run stopped by fault: {fault}");
            })?;
            steps += 1;
            if outcome == StepOutcome::Halted {
                break StopReason::Halted;
            }
        };

        tracing::debug!(steps, ?stop, "run stopped at x{:04X}", self.registers.pc());
        Ok(RunOutcome { steps, stop })
    }

    /// Disassembles memory around the current program counter.
    #[must_use]
    pub fn disassemble_around_pc(&self, before: u16, after: u16) -> Vec<DisassemblyRow> {
        disassemble_window(self.registers.pc(), before, after, &self.memory)
    }
}
