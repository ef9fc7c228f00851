/// Number of general-purpose registers (`R0..R7`).
pub const GENERAL_REGISTER_COUNT: usize = 8;
/// Condition-code bit for a positive result.
pub const COND_P: u16 = 1 << 0;
/// Condition-code bit for a zero result.
pub const COND_Z: u16 = 1 << 1;
/// Condition-code bit for a negative result.
pub const COND_N: u16 = 1 << 2;

/// General-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl Register {
    /// Ordered list of all general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    /// Subroutine-linkage register by convention.
    pub const LINK: Self = Self::R7;

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a 3-bit register field into a register.
    #[must_use]
    pub const fn from_u3(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            7 => Some(Self::R7),
            _ => None,
        }
    }

    /// Extracts the 3-bit register field starting at bit `shift` of `word`.
    #[must_use]
    pub const fn from_field(word: u16, shift: u32) -> Self {
        match (word >> shift) & 0x7 {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            3 => Self::R3,
            4 => Self::R4,
            5 => Self::R5,
            6 => Self::R6,
            _ => Self::R7,
        }
    }
}

/// The single active condition code.
///
/// Being an enum, exactly one of N/Z/P is set at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConditionFlag {
    /// Last written value was negative (bit 15 set).
    Negative,
    /// Last written value was zero.
    #[default]
    Zero,
    /// Last written value was positive.
    Positive,
}

impl ConditionFlag {
    /// Classifies a word by its two's-complement sign.
    #[must_use]
    pub const fn from_value(value: u16) -> Self {
        if value == 0 {
            Self::Zero
        } else if value >> 15 == 1 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    /// Returns the N/Z/P bit for this flag.
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::Negative => COND_N,
            Self::Zero => COND_Z,
            Self::Positive => COND_P,
        }
    }

    /// Returns `true` when this flag is selected by a 3-bit `nzp` mask.
    #[must_use]
    pub const fn matches(self, mask: u16) -> bool {
        (self.bits() & mask) != 0
    }
}

/// General registers, program counter and condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u16; GENERAL_REGISTER_COUNT],
    pc: u16,
    cond: ConditionFlag,
}

impl RegisterFile {
    /// Creates a zeroed register file with the given program counter.
    #[must_use]
    pub fn with_pc(pc: u16) -> Self {
        Self {
            pc,
            ..Self::default()
        }
    }

    /// Reads a general-purpose register.
    #[must_use]
    pub const fn get(&self, reg: Register) -> u16 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register without touching the condition code.
    pub const fn set(&mut self, reg: Register, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Writes a register and derives the condition code from the value.
    pub const fn set_with_flags(&mut self, reg: Register, value: u16) {
        self.set(reg, value);
        self.cond = ConditionFlag::from_value(value);
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Reads the condition code.
    #[must_use]
    pub const fn cond(&self) -> ConditionFlag {
        self.cond
    }

    /// Overrides the condition code.
    pub const fn set_cond(&mut self, flag: ConditionFlag) {
        self.cond = flag;
    }
}
