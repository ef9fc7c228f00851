//! Word-addressed memory with the keyboard device shim.

/// Conventional address-space layout and device-register decoding.
pub mod map;

use std::fmt;

pub use map::{
    decode_memory_region, DeviceRegister, MemoryRegion, DEVICE_END, DEVICE_START,
    INTERRUPT_TABLE_END, INTERRUPT_TABLE_START, KBDR, KBSR, KBSR_READY, OS_END, OS_START,
    TRAP_TABLE_END, TRAP_TABLE_START, USER_END, USER_START,
};

use crate::console::{Console, ConsoleError};

/// Number of addressable words (64 Ki).
pub const MEMORY_WORDS: usize = u16::MAX as usize + 1;

/// The full 16-bit word address space.
///
/// Reads through [`Memory::read`] emulate the keyboard device registers;
/// [`Memory::peek`] and [`Memory::write`] are plain storage accesses.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    cells: Box<[u16]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let populated = self.cells.iter().filter(|word| **word != 0).count();
        f.debug_struct("Memory")
            .field("words", &self.cells.len())
            .field("populated", &populated)
            .finish()
    }
}

impl Memory {
    /// Allocates a zeroed address space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_WORDS].into_boxed_slice(),
        }
    }

    /// Device-aware read used by instruction execution.
    ///
    /// Reading `KBSR` polls the console: when a character is pending it is
    /// latched into `KBDR` and the ready bit is set, otherwise `KBSR` is
    /// cleared. Reading `KBDR` returns the latched character without
    /// consuming input.
    ///
    /// # Errors
    ///
    /// Propagates the console failure when the status poll fails.
    pub fn read(&mut self, addr: u16, console: &mut dyn Console) -> Result<u16, ConsoleError> {
        match DeviceRegister::from_address(addr) {
            Some(DeviceRegister::KeyboardStatus) => self.poll_keyboard(console)?,
            Some(DeviceRegister::KeyboardData) | None => {}
        }
        Ok(self.peek(addr))
    }

    /// Plain read with no device side effects.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[usize::from(addr)]
    }

    /// Plain store. Device addresses are not write-protected.
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[usize::from(addr)] = value;
    }

    /// Full backing store in address order.
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.cells
    }

    fn poll_keyboard(&mut self, console: &mut dyn Console) -> Result<(), ConsoleError> {
        if let Some(ch) = console.poll_char()? {
            tracing::trace!(ch, "keyboard poll latched input");
            self.write(KBSR, KBSR_READY);
            self.write(KBDR, u16::from(ch));
        } else {
            self.write(KBSR, 0);
        }
        Ok(())
    }
}
