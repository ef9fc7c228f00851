//! Core engine crate for the LC-3 virtual machine.

/// Word-addressed memory, device shim and address-space map.
pub mod memory;
pub use memory::{
    decode_memory_region, DeviceRegister, Memory, MemoryRegion, DEVICE_END, DEVICE_START,
    INTERRUPT_TABLE_END, INTERRUPT_TABLE_START, KBDR, KBSR, KBSR_READY, MEMORY_WORDS, OS_END,
    OS_START, TRAP_TABLE_END, TRAP_TABLE_START, USER_END, USER_START,
};

/// Architectural register state and run-flag.
pub mod state;
pub use state::{
    ConditionFlag, Register, RegisterFile, RunState, COND_N, COND_P, COND_Z,
    GENERAL_REGISTER_COUNT,
};

/// Console collaborator contract and the scripted in-memory console.
pub mod console;
pub use console::{Console, ConsoleError, ScriptedConsole};

/// Opcode table and instruction field extraction.
pub mod encoding;
pub use encoding::{sign_extend, Opcode, OPCODE_TABLE};

/// Total instruction decoder.
pub mod decoder;
pub use decoder::{Decoder, Instruction, JsrTarget, Operand};

/// Assembly-text rendering of instructions and memory windows.
pub mod disasm;
pub use disasm::{disassemble, disassemble_row, disassemble_window, DisassemblyRow};

/// Fault taxonomy for execution failures.
pub mod fault;
pub use fault::{Fault, FaultCause, FaultClass};

/// Program image loader.
pub mod loader;
pub use loader::{load_image, load_image_bytes, load_image_file, ImageSummary, LoadError};

/// Built-in trap service routines.
pub mod trap;
pub use trap::{dispatch_trap, TrapOutcome, TrapVector, HALT_BANNER, IN_PROMPT};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{execute_instruction, step_one, ExecuteOutcome, FlagsUpdate};

/// Public host-facing API: machine aggregate, configuration and run loop.
pub mod api;
pub use api::{
    Machine, MachineConfig, RunOutcome, StepOutcome, StopReason, DEFAULT_ENTRY_PC,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
