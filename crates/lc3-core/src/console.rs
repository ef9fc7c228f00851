//! Console collaborator contract consumed by the device shim and trap services.

use std::collections::VecDeque;
use std::io;

use thiserror::Error;

/// Failure reported by a console collaborator.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Input stream reached end-of-file while the machine wanted a character.
    #[error("console input closed")]
    Closed,
    /// An external interrupt was requested (for example `SIGINT`).
    #[error("interrupted")]
    Interrupted,
    /// Underlying transport failure.
    #[error("console i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// Character-level console consumed by the engine.
///
/// The engine is single-threaded; a console is borrowed mutably for the
/// duration of each step and never shared.
pub trait Console {
    /// Non-blocking check for pending input.
    ///
    /// Returns the next character when one is available, consuming it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsoleError`] when the underlying input cannot be polled.
    fn poll_char(&mut self) -> Result<Option<u8>, ConsoleError>;

    /// Blocks until one character of input is available and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Closed`] at end of input, or another
    /// [`ConsoleError`] when reading fails.
    fn read_char(&mut self) -> Result<u8, ConsoleError>;

    /// Writes raw bytes to console output.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsoleError`] when the output cannot be written.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConsoleError>;

    /// Flushes buffered console output.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsoleError`] when the output cannot be flushed.
    fn flush(&mut self) -> Result<(), ConsoleError>;

    /// Reports a pending external interrupt, checked once per run-loop step.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Interrupted`] when the run should stop.
    fn check_interrupt(&mut self) -> Result<(), ConsoleError> {
        Ok(())
    }
}

/// In-memory console with pre-scripted input and captured output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    interrupt_pending: bool,
    flushes: usize,
}

impl ScriptedConsole {
    /// Creates a console whose input yields `input` byte by byte.
    #[must_use]
    pub fn new(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Appends more input after whatever is still pending.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref().iter().copied());
    }

    /// Number of input bytes not yet consumed.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as UTF-8.
    #[must_use]
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Number of times [`Console::flush`] was called.
    #[must_use]
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Makes the next [`Console::check_interrupt`] report an interrupt.
    pub fn raise_interrupt(&mut self) {
        self.interrupt_pending = true;
    }
}

impl Console for ScriptedConsole {
    fn poll_char(&mut self) -> Result<Option<u8>, ConsoleError> {
        Ok(self.input.pop_front())
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        self.input.pop_front().ok_or(ConsoleError::Closed)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConsoleError> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.flushes += 1;
        Ok(())
    }

    fn check_interrupt(&mut self) -> Result<(), ConsoleError> {
        if std::mem::take(&mut self.interrupt_pending) {
            Err(ConsoleError::Interrupted)
        } else {
            Ok(())
        }
    }
}
