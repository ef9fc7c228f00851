//! Conventional LC-3 address-space layout and device-register decoding.

/// Inclusive start address of the trap vector table.
pub const TRAP_TABLE_START: u16 = 0x0000;
/// Inclusive end address of the trap vector table.
pub const TRAP_TABLE_END: u16 = 0x00FF;
/// Inclusive start address of the interrupt vector table.
pub const INTERRUPT_TABLE_START: u16 = 0x0100;
/// Inclusive end address of the interrupt vector table.
pub const INTERRUPT_TABLE_END: u16 = 0x01FF;
/// Inclusive start address of operating-system space.
pub const OS_START: u16 = 0x0200;
/// Inclusive end address of operating-system space.
pub const OS_END: u16 = 0x2FFF;
/// Inclusive start address of user program space.
pub const USER_START: u16 = 0x3000;
/// Inclusive end address of user program space.
pub const USER_END: u16 = 0xFDFF;
/// Inclusive start address of the device-register page.
pub const DEVICE_START: u16 = 0xFE00;
/// Inclusive end address of the device-register page.
pub const DEVICE_END: u16 = 0xFFFF;

/// Keyboard status register address.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register address.
pub const KBDR: u16 = 0xFE02;

/// Bit set in `KBSR` when a character is waiting in `KBDR`.
pub const KBSR_READY: u16 = 1 << 15;

/// Conventional region classification for LC-3 addresses.
///
/// Only used for diagnostics; the engine does not enforce region policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Trap vector table (`0x0000..=0x00FF`).
    TrapTable,
    /// Interrupt vector table (`0x0100..=0x01FF`).
    InterruptTable,
    /// Operating-system code and data (`0x0200..=0x2FFF`).
    OperatingSystem,
    /// User program space (`0x3000..=0xFDFF`).
    User,
    /// Memory-mapped device registers (`0xFE00..=0xFFFF`).
    Devices,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for this region.
    #[must_use]
    pub const fn bounds(self) -> (u16, u16) {
        match self {
            Self::TrapTable => (TRAP_TABLE_START, TRAP_TABLE_END),
            Self::InterruptTable => (INTERRUPT_TABLE_START, INTERRUPT_TABLE_END),
            Self::OperatingSystem => (OS_START, OS_END),
            Self::User => (USER_START, USER_END),
            Self::Devices => (DEVICE_START, DEVICE_END),
        }
    }

    /// Returns `true` when `addr` belongs to this region.
    #[must_use]
    pub const fn contains(self, addr: u16) -> bool {
        let (start, end) = self.bounds();
        addr >= start && addr <= end
    }
}

/// Decodes an address into its conventional region.
#[must_use]
pub const fn decode_memory_region(addr: u16) -> MemoryRegion {
    match addr {
        TRAP_TABLE_START..=TRAP_TABLE_END => MemoryRegion::TrapTable,
        INTERRUPT_TABLE_START..=INTERRUPT_TABLE_END => MemoryRegion::InterruptTable,
        OS_START..=OS_END => MemoryRegion::OperatingSystem,
        USER_START..=USER_END => MemoryRegion::User,
        DEVICE_START..=DEVICE_END => MemoryRegion::Devices,
    }
}

/// Memory-mapped registers emulated by the device shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRegister {
    /// Keyboard status (`0xFE00`); every read polls the console.
    KeyboardStatus,
    /// Keyboard data (`0xFE02`); holds the last polled character.
    KeyboardData,
}

impl DeviceRegister {
    /// Returns the device register aliased at `addr`, if any.
    #[must_use]
    pub const fn from_address(addr: u16) -> Option<Self> {
        match addr {
            KBSR => Some(Self::KeyboardStatus),
            KBDR => Some(Self::KeyboardData),
            _ => None,
        }
    }

    /// Returns the fixed address of this register.
    #[must_use]
    pub const fn address(self) -> u16 {
        match self {
            Self::KeyboardStatus => KBSR,
            Self::KeyboardData => KBDR,
        }
    }
}
