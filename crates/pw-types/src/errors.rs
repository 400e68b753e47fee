use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic snapshot of one constraint state, attached to
/// [`PwError::NoActiveConstraints`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintStateSnapshot {
    pub name: String,
    pub group_id: usize,
    pub active: bool,
    pub succeeded: bool,
    pub failed: bool,
}

/// Main error type for the Pathwise system
#[derive(Error, Debug)]
pub enum PwError {
    #[error("Task failure: {0}")]
    TaskFailure(String),

    #[error("Critical ranking failure with robustness {0}")]
    CriticalRankingFailure(f64),

    #[error("No more active constraints are present ({} states)", .0.len())]
    NoActiveConstraints(Vec<ConstraintStateSnapshot>),

    #[error("Invalid concurrency {requested}: must lie within [1, {cap}]")]
    InvalidConcurrency { requested: usize, cap: usize },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Pathwise operations
pub type PwResult<T> = Result<T, PwError>;

/// Macro for creating precondition-violation errors
#[macro_export]
macro_rules! precondition_error {
    ($($arg:tt)*) => {
        $crate::PwError::PreconditionViolation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PwError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = PwError::InvalidConcurrency {
            requested: 0,
            cap: 8,
        };
        assert!(error.to_string().contains("Invalid concurrency 0"));
        assert!(error.to_string().contains("[1, 8]"));
    }

    #[test]
    fn no_active_constraints_carries_snapshot() {
        let snapshot = vec![ConstraintStateSnapshot {
            name: "depth".into(),
            group_id: 3,
            active: false,
            succeeded: true,
            failed: false,
        }];
        let error = PwError::NoActiveConstraints(snapshot.clone());
        match error {
            PwError::NoActiveConstraints(states) => assert_eq!(states, snapshot),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn critical_failure_carries_robustness() {
        let error = PwError::CriticalRankingFailure(-0.5);
        assert!(error.to_string().contains("-0.5"));
    }

    #[test]
    fn macros() {
        let _pre = precondition_error!("pull before push on task {}", "step");
        let _cfg = config_error!("missing property: {}", "maximum_order");
    }
}
