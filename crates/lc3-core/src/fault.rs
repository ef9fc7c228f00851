use thiserror::Error;

use crate::console::ConsoleError;
use crate::encoding::Opcode;

/// Fault classes used by hosts to choose how a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Unimplemented opcode or undefined trap vector.
    IllegalInstruction,
    /// The console collaborator failed, closed, or was interrupted.
    Console,
}

/// Reason an instruction could not retire.
#[derive(Debug, Error)]
pub enum FaultCause {
    /// `RTI` or the reserved opcode was fetched.
    #[error("illegal opcode {opcode} (x{word:04X})")]
    IllegalOpcode {
        /// Decoded opcode.
        opcode: Opcode,
        /// Raw instruction word.
        word: u16,
    },
    /// `TRAP` named a vector with no service routine.
    #[error("undefined trap vector x{vector:02X}")]
    UnknownTrap {
        /// Low byte of the `TRAP` instruction.
        vector: u8,
    },
    /// Console input/output failed during a device poll or trap service.
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

impl FaultCause {
    /// Returns the class of this cause.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::IllegalOpcode { .. } | Self::UnknownTrap { .. } => {
                FaultClass::IllegalInstruction
            }
            Self::Console(_) => FaultClass::Console,
        }
    }
}

/// Unrecoverable execution fault, reported with the address of the faulting
/// instruction.
///
/// Register state is restored to its value before the fetch, so `pc` equals
/// the program counter held by the machine after the fault.
#[derive(Debug, Error)]
#[error("fault at x{pc:04X}: {cause}")]
pub struct Fault {
    /// Address of the faulting instruction.
    pub pc: u16,
    /// What went wrong.
    pub cause: FaultCause,
}

impl Fault {
    /// Creates a fault for the instruction at `pc`.
    #[must_use]
    pub const fn new(pc: u16, cause: FaultCause) -> Self {
        Self { pc, cause }
    }

    /// Returns the class of the underlying cause.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        self.cause.class()
    }

    /// Returns `true` when the run stopped because of an external interrupt.
    #[must_use]
    pub const fn is_interrupt(&self) -> bool {
        matches!(self.cause, FaultCause::Console(ConsoleError::Interrupted))
    }
}
