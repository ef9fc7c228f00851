//! Helper functions for instruction execution.

use crate::decoder::Operand;
use crate::state::{Register, RegisterFile};

/// Effective address `PC + offset`, using the already-incremented PC.
#[must_use]
pub const fn pc_relative_address(regs: &RegisterFile, offset: u16) -> u16 {
    regs.pc().wrapping_add(offset)
}

/// Effective address `base + offset` for `LDR`/`STR`.
#[must_use]
pub const fn base_offset_address(regs: &RegisterFile, base: Register, offset: u16) -> u16 {
    regs.get(base).wrapping_add(offset)
}

/// Value of the second `ADD`/`AND` operand.
#[must_use]
pub const fn operand_value(regs: &RegisterFile, operand: Operand) -> u16 {
    match operand {
        Operand::Register(reg) => regs.get(reg),
        Operand::Immediate(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::{base_offset_address, operand_value, pc_relative_address};
    use crate::decoder::Operand;
    use crate::state::{Register, RegisterFile};

    #[test]
    fn addresses_wrap_at_sixteen_bits() {
        let mut regs = RegisterFile::with_pc(0xFFFF);
        assert_eq!(pc_relative_address(&regs, 0x0002), 0x0001);
        assert_eq!(pc_relative_address(&regs, 0xFFFF), 0xFFFE);

        regs.set(Register::R2, 0x0001);
        assert_eq!(base_offset_address(&regs, Register::R2, 0xFFFE), 0xFFFF);
    }

    #[test]
    fn operand_selects_register_or_immediate() {
        let mut regs = RegisterFile::default();
        regs.set(Register::R4, 0x1234);
        assert_eq!(operand_value(&regs, Operand::Register(Register::R4)), 0x1234);
        assert_eq!(operand_value(&regs, Operand::Immediate(0xFFF0)), 0xFFF0);
    }
}
