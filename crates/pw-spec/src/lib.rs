//! # pw-spec
//!
//! Constraining specifications for Pathwise: stateful constraints with a
//! group-linked lifecycle, robustness controllers, and lexicographic score
//! evaluation.

pub mod constraint;
pub mod controller;
pub mod specification;

pub use constraint::{
    Constraint, ConstraintFn, ConstraintSeverity, FailureKind, ObjectiveImpact, RankingCriterion,
    SuccessAction,
};
pub use controller::{IdentityController, RobustnessController, TimeProgressLinearController};
pub use specification::{ConstrainingSpecification, ConstraintState, UpdateOutcome};
