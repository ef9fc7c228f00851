//! Instruction disassembly for the LC-3 ISA.
//!
//! Used by the engine's trace logging and by hosts that want a listing of
//! memory around the program counter.

use std::fmt;

use crate::decoder::{Decoder, Instruction, JsrTarget, Operand};
use crate::encoding::Opcode;
use crate::memory::{Memory, MEMORY_WORDS};
use crate::state::Register;
use crate::trap::TrapVector;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction word.
    pub addr: u16,
    /// Raw instruction word.
    pub raw_word: u16,
    /// The instruction mnemonic (e.g., "ADD", "BRnz", "HALT").
    pub mnemonic: String,
    /// The formatted operands (e.g., "R0, R1, #-1").
    pub operands: String,
    /// Whether executing this word would raise an illegal-opcode fault.
    pub is_illegal: bool,
}

/// Disassembles `before` words ahead of `center_pc`, the word at `center_pc`,
/// and `after` words following it.
///
/// Every LC-3 instruction is one word, so rows are contiguous. Addresses wrap
/// around the 16-bit address space; the window is clamped to 64 Ki rows.
#[must_use]
pub fn disassemble_window(
    center_pc: u16,
    before: u16,
    after: u16,
    memory: &Memory,
) -> Vec<DisassemblyRow> {
    let total = (usize::from(before) + 1 + usize::from(after)).min(MEMORY_WORDS);
    let mut addr = center_pc.wrapping_sub(before);
    let mut rows = Vec::with_capacity(total);
    for _ in 0..total {
        rows.push(disassemble_row(addr, memory.peek(addr)));
        addr = addr.wrapping_add(1);
    }
    rows
}

/// Disassembles one raw word found at `addr`.
#[must_use]
pub fn disassemble_row(addr: u16, raw_word: u16) -> DisassemblyRow {
    let instr = Decoder::decode(raw_word);
    if instr.opcode().is_unimplemented() {
        return DisassemblyRow {
            addr,
            raw_word,
            mnemonic: ".word".to_string(),
            operands: format!("x{raw_word:04X} ; ILLEGAL"),
            is_illegal: true,
        };
    }

    DisassemblyRow {
        addr,
        raw_word,
        mnemonic: instr.mnemonic(),
        operands: instr.operands(),
        is_illegal: false,
    }
}

/// Formats a raw word as a single line of assembly.
#[must_use]
pub fn disassemble(word: u16) -> String {
    Decoder::decode(word).to_string()
}

impl Instruction {
    /// Assembler mnemonic, using `RET`, `JSRR` and the trap aliases where they apply.
    #[must_use]
    pub fn mnemonic(&self) -> String {
        match *self {
            Self::Br { mask: 0, .. } => "NOP".to_string(),
            Self::Br { mask, .. } => {
                let mut name = String::from("BR");
                for (bit, letter) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if mask & bit != 0 {
                        name.push(letter);
                    }
                }
                name
            }
            Self::Jmp { base: Register::R7 } => "RET".to_string(),
            Self::Jsr {
                target: JsrTarget::Register(_),
            } => "JSRR".to_string(),
            Self::Trap { vector } => TrapVector::from_u8(vector)
                .map_or(Opcode::Trap.mnemonic(), TrapVector::name)
                .to_string(),
            _ => self.opcode().mnemonic().to_string(),
        }
    }

    /// Operand list in assembler order, empty when there is none.
    #[must_use]
    pub fn operands(&self) -> String {
        match *self {
            Self::Br { mask: 0, .. }
            | Self::Rti
            | Self::Reserved
            | Self::Jmp { base: Register::R7 } => String::new(),
            Self::Br { offset, .. }
            | Self::Jsr {
                target: JsrTarget::Offset(offset),
            } => format_offset(offset),
            Self::Add { dr, sr1, operand } | Self::And { dr, sr1, operand } => {
                format!("{dr}, {sr1}, {}", format_operand(operand))
            }
            Self::Ld { dr, offset } | Self::Ldi { dr, offset } | Self::Lea { dr, offset } => {
                format!("{dr}, {}", format_offset(offset))
            }
            Self::St { sr, offset } | Self::Sti { sr, offset } => {
                format!("{sr}, {}", format_offset(offset))
            }
            Self::Jsr {
                target: JsrTarget::Register(base),
            }
            | Self::Jmp { base } => base.to_string(),
            Self::Ldr { dr, base, offset } => format!("{dr}, {base}, {}", format_offset(offset)),
            Self::Str { sr, base, offset } => format!("{sr}, {base}, {}", format_offset(offset)),
            Self::Not { dr, sr } => format!("{dr}, {sr}"),
            Self::Trap { vector } => {
                if TrapVector::from_u8(vector).is_some() {
                    String::new()
                } else {
                    format!("x{vector:02X}")
                }
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = self.operands();
        if operands.is_empty() {
            f.write_str(&self.mnemonic())
        } else {
            write!(f, "{} {operands}", self.mnemonic())
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

fn format_operand(operand: Operand) -> String {
    match operand {
        Operand::Register(reg) => reg.to_string(),
        Operand::Immediate(value) => format_offset(value),
    }
}

fn format_offset(value: u16) -> String {
    format!("#{}", i16::from_ne_bytes(value.to_ne_bytes()))
}

#[cfg(test)]
mod tests {
    use super::{disassemble, disassemble_row, disassemble_window};
    use crate::encoding::Opcode;
    use crate::memory::Memory;
    use rstest::rstest;

    #[rstest]
    #[case(0x1261, "ADD R1, R1, #1")]
    #[case(0x103F, "ADD R0, R0, #-1")]
    #[case(0x1401, "ADD R2, R0, R1")]
    #[case(0x5020, "AND R0, R0, #0")]
    #[case(0x0FFE, "BRnzp #-2")]
    #[case(0x0A03, "BRnp #3")]
    #[case(0x0000, "NOP")]
    #[case(0xC1C0, "RET")]
    #[case(0xC080, "JMP R2")]
    #[case(0x4802, "JSR #2")]
    #[case(0x4080, "JSRR R2")]
    #[case(0x2202, "LD R1, #2")]
    #[case(0xA801, "LDI R4, #1")]
    #[case(0x6283, "LDR R1, R2, #3")]
    #[case(0x72BF, "STR R1, R2, #-1")]
    #[case(0x37FF, "ST R3, #-1")]
    #[case(0xB005, "STI R0, #5")]
    #[case(0x967F, "NOT R3, R1")]
    #[case(0xE002, "LEA R0, #2")]
    #[case(0xF025, "HALT")]
    #[case(0xF022, "PUTS")]
    #[case(0xF026, "TRAP x26")]
    #[case(0x8000, "RTI")]
    #[case(0xD123, "RES")]
    fn formats_single_words(#[case] word: u16, #[case] expected: &str) {
        assert_eq!(disassemble(word), expected);
    }

    #[test]
    fn opcode_display_is_mnemonic() {
        assert_eq!(Opcode::Ldi.to_string(), "LDI");
        assert_eq!(Opcode::Res.to_string(), "RES");
    }

    #[test]
    fn unimplemented_words_render_as_data() {
        let row = disassemble_row(0x3004, 0xD123);
        assert_eq!(row.mnemonic, ".word");
        assert_eq!(row.operands, "xD123 ; ILLEGAL");
        assert!(row.is_illegal);

        let rti = disassemble_row(0x3005, 0x8000);
        assert!(rti.is_illegal);
    }

    #[test]
    fn hello_program_listing() {
        let mut memory = Memory::new();
        let program = [0xE002, 0xF022, 0xF025, 0x0048, 0x0049, 0x0000];
        for (addr, word) in (0x3000_u16..).zip(program) {
            memory.write(addr, word);
        }

        let rows = disassemble_window(0x3001, 1, 1, &memory);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].addr, 0x3000);
        assert_eq!(rows[0].mnemonic, "LEA");
        assert_eq!(rows[0].operands, "R0, #2");
        assert_eq!(rows[1].addr, 0x3001);
        assert_eq!(rows[1].mnemonic, "PUTS");
        assert_eq!(rows[1].operands, "");
        assert_eq!(rows[2].addr, 0x3002);
        assert_eq!(rows[2].mnemonic, "HALT");
        assert!(rows.iter().all(|row| !row.is_illegal));
    }

    #[test]
    fn window_wraps_around_address_space() {
        let memory = Memory::new();
        let rows = disassemble_window(0x0000, 2, 1, &memory);
        let addrs: Vec<_> = rows.iter().map(|row| row.addr).collect();
        assert_eq!(addrs, [0xFFFE, 0xFFFF, 0x0000, 0x0001]);
    }
}
