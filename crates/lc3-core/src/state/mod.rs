//! Machine register state and run-flag.

/// Register file types and storage model.
pub mod registers;

pub use registers::{
    ConditionFlag, Register, RegisterFile, COND_N, COND_P, COND_Z, GENERAL_REGISTER_COUNT,
};

/// Run-flag of the decode-execute loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// `TRAP HALT` retired; no further instructions execute.
    Halted,
}

impl RunState {
    /// Returns `true` while the loop may fetch another instruction.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::RunState;

    #[test]
    fn run_state_default_is_running() {
        assert_eq!(RunState::default(), RunState::Running);
        assert!(RunState::Running.is_running());
        assert!(!RunState::Halted.is_running());
    }
}
