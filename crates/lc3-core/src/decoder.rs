//! Instruction decoder for the LC-3 ISA.
//!
//! Decoding is total: every 16-bit word maps to exactly one [`Instruction`].
//! The two encodings this machine does not implement (`RTI` and the reserved
//! opcode) decode to their own variants and fault at execution time.

use crate::encoding::{bit, imm5, offset6, pc_offset11, pc_offset9, trap_vector, Opcode};
use crate::state::Register;

/// Second operand of `ADD`/`AND`, selected by bit 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Register form (`SR2` in bits 2..0).
    Register(Register),
    /// Immediate form, already sign-extended from 5 bits.
    Immediate(u16),
}

/// Jump target of `JSR`/`JSRR`, selected by bit 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsrTarget {
    /// `JSR`: PC-relative, sign-extended from 11 bits.
    Offset(u16),
    /// `JSRR`: absolute address held in a base register.
    Register(Register),
}

/// A decoded instruction with typed operand fields.
///
/// All offsets are stored sign-extended to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Instruction {
    /// Conditional branch on the `nzp` mask in bits 11..9.
    Br { mask: u16, offset: u16 },
    Add { dr: Register, sr1: Register, operand: Operand },
    Ld { dr: Register, offset: u16 },
    St { sr: Register, offset: u16 },
    Jsr { target: JsrTarget },
    And { dr: Register, sr1: Register, operand: Operand },
    Ldr { dr: Register, base: Register, offset: u16 },
    Str { sr: Register, base: Register, offset: u16 },
    /// Return from interrupt; not implemented by this machine.
    Rti,
    Not { dr: Register, sr: Register },
    Ldi { dr: Register, offset: u16 },
    Sti { sr: Register, offset: u16 },
    Jmp { base: Register },
    /// Reserved opcode `0xD`.
    Reserved,
    Lea { dr: Register, offset: u16 },
    Trap { vector: u8 },
}

impl Instruction {
    /// Returns the opcode this instruction was decoded from.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Br { .. } => Opcode::Br,
            Self::Add { .. } => Opcode::Add,
            Self::Ld { .. } => Opcode::Ld,
            Self::St { .. } => Opcode::St,
            Self::Jsr { .. } => Opcode::Jsr,
            Self::And { .. } => Opcode::And,
            Self::Ldr { .. } => Opcode::Ldr,
            Self::Str { .. } => Opcode::Str,
            Self::Rti => Opcode::Rti,
            Self::Not { .. } => Opcode::Not,
            Self::Ldi { .. } => Opcode::Ldi,
            Self::Sti { .. } => Opcode::Sti,
            Self::Jmp { .. } => Opcode::Jmp,
            Self::Reserved => Opcode::Res,
            Self::Lea { .. } => Opcode::Lea,
            Self::Trap { .. } => Opcode::Trap,
        }
    }
}

/// Instruction decoder for the LC-3 ISA.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes a 16-bit instruction word.
    #[must_use]
    pub const fn decode(word: u16) -> Instruction {
        let dr = Register::from_field(word, 9);
        let sr1 = Register::from_field(word, 6);

        match Opcode::of_word(word) {
            Opcode::Br => Instruction::Br {
                mask: (word >> 9) & 0x7,
                offset: pc_offset9(word),
            },
            Opcode::Add => Instruction::Add {
                dr,
                sr1,
                operand: alu_operand(word),
            },
            Opcode::Ld => Instruction::Ld {
                dr,
                offset: pc_offset9(word),
            },
            Opcode::St => Instruction::St {
                sr: dr,
                offset: pc_offset9(word),
            },
            Opcode::Jsr => Instruction::Jsr {
                target: if bit(word, 11) {
                    JsrTarget::Offset(pc_offset11(word))
                } else {
                    JsrTarget::Register(sr1)
                },
            },
            Opcode::And => Instruction::And {
                dr,
                sr1,
                operand: alu_operand(word),
            },
            Opcode::Ldr => Instruction::Ldr {
                dr,
                base: sr1,
                offset: offset6(word),
            },
            Opcode::Str => Instruction::Str {
                sr: dr,
                base: sr1,
                offset: offset6(word),
            },
            Opcode::Rti => Instruction::Rti,
            Opcode::Not => Instruction::Not { dr, sr: sr1 },
            Opcode::Ldi => Instruction::Ldi {
                dr,
                offset: pc_offset9(word),
            },
            Opcode::Sti => Instruction::Sti {
                sr: dr,
                offset: pc_offset9(word),
            },
            Opcode::Jmp => Instruction::Jmp { base: sr1 },
            Opcode::Res => Instruction::Reserved,
            Opcode::Lea => Instruction::Lea {
                dr,
                offset: pc_offset9(word),
            },
            Opcode::Trap => Instruction::Trap {
                vector: trap_vector(word),
            },
        }
    }
}

const fn alu_operand(word: u16) -> Operand {
    if bit(word, 5) {
        Operand::Immediate(imm5(word))
    } else {
        Operand::Register(Register::from_field(word, 0))
    }
}
