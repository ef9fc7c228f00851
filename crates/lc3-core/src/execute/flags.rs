//! Condition-code update behaviors for different instruction classes.

use crate::encoding::Opcode;
use crate::state::{Register, RegisterFile};

/// Describes how the condition code is updated when an instruction writes a
/// destination register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// No change to the condition code.
    #[default]
    None,
    /// Derive N/Z/P from the value written.
    FromResult,
}

impl FlagsUpdate {
    /// Update rule applied to the destination write of `opcode`.
    ///
    /// Only the ALU and load-class instructions touch the condition code;
    /// `JSR` and `TRAP` write `R7` without it.
    #[must_use]
    pub const fn for_opcode(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Add
            | Opcode::And
            | Opcode::Not
            | Opcode::Ld
            | Opcode::Ldi
            | Opcode::Ldr
            | Opcode::Lea => Self::FromResult,
            _ => Self::None,
        }
    }

    /// Writes `value` into `dr`, updating the condition code per this rule.
    pub const fn write(self, regs: &mut RegisterFile, dr: Register, value: u16) {
        match self {
            Self::None => regs.set(dr, value),
            Self::FromResult => regs.set_with_flags(dr, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FlagsUpdate;
    use crate::encoding::{Opcode, OPCODE_TABLE};
    use crate::state::{ConditionFlag, Register, RegisterFile};

    #[test]
    fn only_alu_and_loads_update_flags() {
        let updating: Vec<_> = OPCODE_TABLE
            .into_iter()
            .filter(|op| FlagsUpdate::for_opcode(*op) == FlagsUpdate::FromResult)
            .collect();
        assert_eq!(
            updating,
            [
                Opcode::Add,
                Opcode::Ld,
                Opcode::And,
                Opcode::Ldr,
                Opcode::Not,
                Opcode::Ldi,
                Opcode::Lea,
            ]
        );
    }

    #[test]
    fn none_leaves_condition_code_alone() {
        let mut regs = RegisterFile::default();
        regs.set_cond(ConditionFlag::Positive);
        FlagsUpdate::None.write(&mut regs, Register::R7, 0x8000);
        assert_eq!(regs.get(Register::R7), 0x8000);
        assert_eq!(regs.cond(), ConditionFlag::Positive);

        FlagsUpdate::FromResult.write(&mut regs, Register::R1, 0x8000);
        assert_eq!(regs.cond(), ConditionFlag::Negative);
    }
}
