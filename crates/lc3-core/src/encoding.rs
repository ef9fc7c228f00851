//! Opcode table and instruction bit-field helpers.

/// Primary opcodes (`OP` field, bits 15..12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    /// Converts a 4-bit opcode value. Every nibble is assigned.
    #[must_use]
    pub const fn from_u4(op: u8) -> Option<Self> {
        match op {
            0x0 => Some(Self::Br),
            0x1 => Some(Self::Add),
            0x2 => Some(Self::Ld),
            0x3 => Some(Self::St),
            0x4 => Some(Self::Jsr),
            0x5 => Some(Self::And),
            0x6 => Some(Self::Ldr),
            0x7 => Some(Self::Str),
            0x8 => Some(Self::Rti),
            0x9 => Some(Self::Not),
            0xA => Some(Self::Ldi),
            0xB => Some(Self::Sti),
            0xC => Some(Self::Jmp),
            0xD => Some(Self::Res),
            0xE => Some(Self::Lea),
            0xF => Some(Self::Trap),
            _ => None,
        }
    }

    /// Extracts the opcode from the top nibble of an instruction word.
    #[must_use]
    pub const fn of_word(word: u16) -> Self {
        match word >> 12 {
            0x0 => Self::Br,
            0x1 => Self::Add,
            0x2 => Self::Ld,
            0x3 => Self::St,
            0x4 => Self::Jsr,
            0x5 => Self::And,
            0x6 => Self::Ldr,
            0x7 => Self::Str,
            0x8 => Self::Rti,
            0x9 => Self::Not,
            0xA => Self::Ldi,
            0xB => Self::Sti,
            0xC => Self::Jmp,
            0xD => Self::Res,
            0xE => Self::Lea,
            _ => Self::Trap,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Br => "BR",
            Self::Add => "ADD",
            Self::Ld => "LD",
            Self::St => "ST",
            Self::Jsr => "JSR",
            Self::And => "AND",
            Self::Ldr => "LDR",
            Self::Str => "STR",
            Self::Rti => "RTI",
            Self::Not => "NOT",
            Self::Ldi => "LDI",
            Self::Sti => "STI",
            Self::Jmp => "JMP",
            Self::Res => "RES",
            Self::Lea => "LEA",
            Self::Trap => "TRAP",
        }
    }

    /// Opcodes this machine does not implement; executing one is a fault.
    #[must_use]
    pub const fn is_unimplemented(self) -> bool {
        matches!(self, Self::Rti | Self::Res)
    }
}

/// Canonical opcode table in encoding order.
pub const OPCODE_TABLE: [Opcode; 16] = [
    Opcode::Br,
    Opcode::Add,
    Opcode::Ld,
    Opcode::St,
    Opcode::Jsr,
    Opcode::And,
    Opcode::Ldr,
    Opcode::Str,
    Opcode::Rti,
    Opcode::Not,
    Opcode::Ldi,
    Opcode::Sti,
    Opcode::Jmp,
    Opcode::Res,
    Opcode::Lea,
    Opcode::Trap,
];

/// Sign-extends the low `bit_count` bits of `value` to a full word.
///
/// `bit_count` must be in `1..=16`.
#[must_use]
pub const fn sign_extend(value: u16, bit_count: u32) -> u16 {
    if bit_count >= 16 {
        return value;
    }
    let mask = (1_u16 << bit_count) - 1;
    let field = value & mask;
    if (field >> (bit_count - 1)) & 1 == 1 {
        field | !mask
    } else {
        field
    }
}

/// Sign-extended 5-bit immediate (bits 4..0).
#[must_use]
pub const fn imm5(word: u16) -> u16 {
    sign_extend(word, 5)
}

/// Sign-extended 6-bit base offset (bits 5..0).
#[must_use]
pub const fn offset6(word: u16) -> u16 {
    sign_extend(word, 6)
}

/// Sign-extended 9-bit PC offset (bits 8..0).
#[must_use]
pub const fn pc_offset9(word: u16) -> u16 {
    sign_extend(word, 9)
}

/// Sign-extended 11-bit PC offset (bits 10..0).
#[must_use]
pub const fn pc_offset11(word: u16) -> u16 {
    sign_extend(word, 11)
}

/// Tests a single bit of an instruction word.
#[must_use]
pub const fn bit(word: u16, index: u32) -> bool {
    (word >> index) & 1 == 1
}

/// Low byte of an instruction word (trap vector field).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn trap_vector(word: u16) -> u8 {
    (word & 0x00FF) as u8
}
