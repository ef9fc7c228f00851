//! Host terminal plumbing: raw-mode guard, `SIGINT` flag and the stdin/stdout
//! console handed to the machine.

#![allow(unsafe_code)]

use std::io::{self, BufWriter, Stdout, Write};
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use lc3_core::{Console, ConsoleError};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Returns `true` once `SIGINT` has been received.
pub fn interrupt_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Routes `SIGINT` to the interrupt flag.
///
/// `SA_RESTART` is left clear so a blocking console read returns `EINTR`
/// and the run loop can unwind.
///
/// # Errors
///
/// Returns the OS error when the handler cannot be installed.
pub fn install_interrupt_handler() -> io::Result<()> {
    // SAFETY: an all-zero `sigaction` is a valid empty action on every libc target.
    let mut action: libc::sigaction = unsafe { MaybeUninit::zeroed().assume_init() };
    action.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    action.sa_flags = 0;

    // SAFETY: `action` is initialised and outlives both calls; the handler only
    // touches an atomic, which is async-signal-safe.
    let rc = unsafe {
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, ptr::null_mut())
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Disables canonical line buffering and local echo on stdin while alive.
///
/// The saved settings are restored in `Drop`, which also runs while a panic
/// unwinds. Nothing is changed when stdin is not a terminal.
#[derive(Debug)]
pub struct RawModeGuard {
    saved: Option<libc::termios>,
}

impl RawModeGuard {
    /// Switches stdin to raw character mode.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the terminal settings cannot be read or written.
    pub fn enable() -> io::Result<Self> {
        // SAFETY: `isatty` only inspects the descriptor.
        if unsafe { libc::isatty(libc::STDIN_FILENO) } != 1 {
            tracing::debug!("stdin is not a terminal; leaving its mode alone");
            return Ok(Self { saved: None });
        }

        let mut current = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: `tcgetattr` fills the whole struct on success.
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, current.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: checked for success above.
        let saved = unsafe { current.assume_init() };

        let mut raw = saved;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        // SAFETY: `raw` is a fully initialised copy of the current settings.
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        tracing::debug!("terminal switched to raw mode");
        Ok(Self { saved: Some(saved) })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(saved) = &self.saved {
            // SAFETY: `saved` came from a successful `tcgetattr` on the same descriptor.
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, saved) } != 0 {
                tracing::warn!(
                    "failed to restore terminal settings: {}",
                    io::Error::last_os_error()
                );
            }
        }
    }
}

/// Console backed by the process's stdin and stdout.
///
/// Reads go straight to the descriptor so `SIGINT` can interrupt a blocking
/// read instead of being retried.
#[derive(Debug)]
pub struct TerminalConsole {
    stdout: BufWriter<Stdout>,
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConsole {
    /// Creates a console over stdin and a buffered stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: BufWriter::new(io::stdout()),
        }
    }

    fn interrupted_or(error: io::Error) -> ConsoleError {
        if error.kind() == io::ErrorKind::Interrupted && interrupt_requested() {
            ConsoleError::Interrupted
        } else {
            ConsoleError::Io(error)
        }
    }
}

impl Console for TerminalConsole {
    fn poll_char(&mut self) -> Result<Option<u8>, ConsoleError> {
        let mut readable = MaybeUninit::<libc::fd_set>::uninit();
        let mut timeout = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };

        // SAFETY: `FD_ZERO` initialises the set before `FD_SET` and `select`
        // use it; the zero timeout makes `select` return immediately.
        let ready = unsafe {
            libc::FD_ZERO(readable.as_mut_ptr());
            libc::FD_SET(libc::STDIN_FILENO, readable.as_mut_ptr());
            libc::select(
                libc::STDIN_FILENO + 1,
                readable.as_mut_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut timeout,
            )
        };

        match ready {
            0 => Ok(None),
            n if n > 0 => self.read_char().map(Some),
            _ => {
                let error = io::Error::last_os_error();
                if error.kind() == io::ErrorKind::Interrupted && !interrupt_requested() {
                    Ok(None)
                } else {
                    Err(Self::interrupted_or(error))
                }
            }
        }
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        loop {
            let mut byte = 0_u8;
            // SAFETY: reads at most one byte into a live local.
            let count = unsafe {
                libc::read(
                    libc::STDIN_FILENO,
                    ptr::addr_of_mut!(byte).cast::<libc::c_void>(),
                    1,
                )
            };

            match count {
                1 => return Ok(byte),
                0 => return Err(ConsoleError::Closed),
                _ => {
                    let error = io::Error::last_os_error();
                    if error.kind() == io::ErrorKind::Interrupted && !interrupt_requested() {
                        continue;
                    }
                    return Err(Self::interrupted_or(error));
                }
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConsoleError> {
        self.stdout.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.stdout.flush()?;
        Ok(())
    }

    fn check_interrupt(&mut self) -> Result<(), ConsoleError> {
        if interrupt_requested() {
            Err(ConsoleError::Interrupted)
        } else {
            Ok(())
        }
    }
}
