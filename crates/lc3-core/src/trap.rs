//! Built-in trap service routines.

use std::fmt;

use crate::api::Machine;
use crate::console::{Console, ConsoleError};
use crate::fault::FaultCause;
use crate::memory::{Memory, MEMORY_WORDS};
use crate::state::Register;

/// Prompt written by `TRAP IN` before reading.
pub const IN_PROMPT: &str = "Enter a character: ";
/// Banner written by `TRAP HALT` when announcing is enabled.
pub const HALT_BANNER: &str = "Shutdown\n";

/// Trap vectors with a built-in service routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum TrapVector {
    /// Read one character into `R0` without echo.
    Getc = 0x20,
    /// Write the low byte of `R0`.
    Out = 0x21,
    /// Write the zero-terminated word string at `R0`.
    Puts = 0x22,
    /// Prompt, read and echo one character into `R0`.
    In = 0x23,
    /// Write the zero-terminated packed byte string at `R0`.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TrapVector {
    /// Every serviced vector in ascending order.
    pub const ALL: [Self; 6] = [
        Self::Getc,
        Self::Out,
        Self::Puts,
        Self::In,
        Self::Putsp,
        Self::Halt,
    ];

    /// Resolves the 8-bit vector field.
    #[must_use]
    pub const fn from_u8(vector: u8) -> Option<Self> {
        match vector {
            0x20 => Some(Self::Getc),
            0x21 => Some(Self::Out),
            0x22 => Some(Self::Puts),
            0x23 => Some(Self::In),
            0x24 => Some(Self::Putsp),
            0x25 => Some(Self::Halt),
            _ => None,
        }
    }

    /// Assembler alias for this vector.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Getc => "GETC",
            Self::Out => "OUT",
            Self::Puts => "PUTS",
            Self::In => "IN",
            Self::Putsp => "PUTSP",
            Self::Halt => "HALT",
        }
    }
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control-flow result of a serviced trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapOutcome {
    /// Execution continues with the next instruction.
    Continue,
    /// `HALT` was serviced; the run-flag must be cleared.
    Halt,
}

/// Services `TRAP vector` for an instruction whose PC has already advanced.
///
/// Links the return address into `R7`, then runs the service routine.
///
/// # Errors
///
/// Returns [`FaultCause::UnknownTrap`] for vectors without a routine (before
/// any state changes), or [`FaultCause::Console`] when console I/O fails.
pub fn dispatch_trap(
    machine: &mut Machine,
    vector: u8,
    console: &mut dyn Console,
) -> Result<TrapOutcome, FaultCause> {
    let Some(service) = TrapVector::from_u8(vector) else {
        return Err(FaultCause::UnknownTrap { vector });
    };

    let return_pc = machine.registers.pc();
    machine.registers.set(Register::LINK, return_pc);

    match service {
        TrapVector::Getc => {
            let ch = console.read_char()?;
            machine
                .registers
                .set_with_flags(Register::R0, u16::from(ch));
        }
        TrapVector::Out => {
            console.write_bytes(&[low_byte(machine.registers.get(Register::R0))])?;
            console.flush()?;
        }
        TrapVector::Puts => {
            write_word_string(&machine.memory, machine.registers.get(Register::R0), console)?;
            console.flush()?;
        }
        TrapVector::In => {
            console.write_bytes(IN_PROMPT.as_bytes())?;
            console.flush()?;
            let ch = console.read_char()?;
            console.write_bytes(&[ch])?;
            console.flush()?;
            machine
                .registers
                .set_with_flags(Register::R0, u16::from(ch));
        }
        TrapVector::Putsp => {
            write_packed_string(&machine.memory, machine.registers.get(Register::R0), console)?;
            console.flush()?;
        }
        TrapVector::Halt => {
            if machine.config.announce_halt {
                console.write_bytes(HALT_BANNER.as_bytes())?;
                console.flush()?;
            }
            return Ok(TrapOutcome::Halt);
        }
    }

    Ok(TrapOutcome::Continue)
}

#[allow(clippy::cast_possible_truncation)]
const fn low_byte(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

const fn high_byte(word: u16) -> u8 {
    word.to_be_bytes()[0]
}

/// One character per word, stopping at the first zero word. The scan covers at
/// most the whole address space and wraps past `0xFFFF`.
fn write_word_string(
    memory: &Memory,
    start: u16,
    console: &mut dyn Console,
) -> Result<(), ConsoleError> {
    let mut addr = start;
    for _ in 0..MEMORY_WORDS {
        let word = memory.peek(addr);
        if word == 0 {
            break;
        }
        console.write_bytes(&[low_byte(word)])?;
        addr = addr.wrapping_add(1);
    }
    Ok(())
}

/// Two characters per word, low byte first; a zero high byte is skipped.
fn write_packed_string(
    memory: &Memory,
    start: u16,
    console: &mut dyn Console,
) -> Result<(), ConsoleError> {
    let mut addr = start;
    for _ in 0..MEMORY_WORDS {
        let word = memory.peek(addr);
        if word == 0 {
            break;
        }
        console.write_bytes(&[low_byte(word)])?;
        let high = high_byte(word);
        if high != 0 {
            console.write_bytes(&[high])?;
        }
        addr = addr.wrapping_add(1);
    }
    Ok(())
}
