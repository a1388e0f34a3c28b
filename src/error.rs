// Typed errors with thiserror. Surface meaningful messages to JS.
// Insufficient data is never an error: statistics return Option::None instead.

use thiserror::Error;

use crate::types::SolveId;

/// Engine error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid scramble length: {0} (must be at least 1)")]
    InvalidScrambleLength(usize),

    #[error("Invalid average window: {0} (must be at least 1)")]
    InvalidAverageWindow(usize),

    #[error("Unsupported average window: {0} (only 5 and 12 are defined)")]
    UnsupportedAverageWindow(usize),

    #[error("Solve not found: {0}")]
    SolveNotFound(SolveId),

    #[error("Duplicate solve id: {0}")]
    DuplicateSolveId(SolveId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid move notation: {0:?}")]
    InvalidNotation(String),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::InvalidScrambleLength(0);
        assert!(err.to_string().contains("at least 1"));

        let err = CoreError::SolveNotFound(SolveId::new(7));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn serde_error_converts() {
        let err: CoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
