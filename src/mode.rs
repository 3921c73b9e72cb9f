//! Execution mode for training-loop phases
//!
//! The mode is passed explicitly into every step function rather than held
//! in process-wide state, so tests never need to reset a global flag.

/// Phase of the training loop a step call runs under.
///
/// `Initializing` steps execute the full pipeline (so shapes and log
/// structure can be discovered) but must not commit parameter updates or
/// persist optimizer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Initializing,
    Training,
    Evaluating,
}

impl ExecutionMode {
    /// Whether modules should run their training-time behavior.
    pub fn is_training(self) -> bool {
        matches!(self, ExecutionMode::Training)
    }

    /// Whether state commits must be skipped.
    pub fn is_initializing(self) -> bool {
        matches!(self, ExecutionMode::Initializing)
    }

    pub fn is_evaluating(self) -> bool {
        matches!(self, ExecutionMode::Evaluating)
    }
}
