//! Constraints over the input and output of a task.
//!
//! A constraint is expressed as a robustness function `f(input, output)`;
//! it is satisfied when the robustness is non-negative, with the magnitude
//! expressing the margin.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::controller::{IdentityController, RobustnessController};

/// What a success does to the constraint's group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuccessAction {
    #[default]
    None,
    /// Deactivate every constraint sharing the group id.
    Deactivate,
}

/// How a negative robustness is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureKind {
    #[default]
    None,
    /// Counts against the score but never deactivates.
    Soft,
    /// Marks the constraint failed and deactivates its group.
    Hard,
}

/// How a robustness value contributes to the objective sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveImpact {
    #[default]
    None,
    /// The raw signed robustness is added.
    Signed,
    /// The absolute robustness is added.
    Unsigned,
}

/// Severity of satisfying the constraint.
///
/// `Permissive`: satisfaction is only desired. `Critical`: satisfaction is
/// mandatory; a cycle whose winner lands on the wrong side aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstraintSeverity {
    #[default]
    Permissive,
    Critical,
}

/// The direction of preference used for critical-violation detection.
///
/// `Maximise`: the highest values are preferred, negative robustness is the
/// wrong side. `MinimisePositive`: small positive values are preferred,
/// positive robustness is the wrong side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankingCriterion {
    #[default]
    Maximise,
    MinimisePositive,
}

/// The robustness function of a constraint.
pub type ConstraintFn<I, O> = Arc<dyn Fn(&I, &O) -> f64 + Send + Sync>;

/// A constraint on the input and output objects of a task, immutable once
/// built.
pub struct Constraint<I, O> {
    name: String,
    group_id: usize,
    success_action: SuccessAction,
    failure_kind: FailureKind,
    objective_impact: ObjectiveImpact,
    severity: ConstraintSeverity,
    criterion: RankingCriterion,
    func: ConstraintFn<I, O>,
    controller: Box<dyn RobustnessController<I, O>>,
}

impl<I, O> Constraint<I, O> {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&I, &O) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            group_id: 0,
            success_action: SuccessAction::None,
            failure_kind: FailureKind::None,
            objective_impact: ObjectiveImpact::None,
            severity: ConstraintSeverity::Permissive,
            criterion: RankingCriterion::Maximise,
            func: Arc::new(func),
            controller: Box::new(IdentityController),
        }
    }

    pub fn with_group(mut self, group_id: usize) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_success_action(mut self, action: SuccessAction) -> Self {
        self.success_action = action;
        self
    }

    pub fn with_failure_kind(mut self, kind: FailureKind) -> Self {
        self.failure_kind = kind;
        self
    }

    pub fn with_objective_impact(mut self, impact: ObjectiveImpact) -> Self {
        self.objective_impact = impact;
        self
    }

    pub fn with_severity(mut self, severity: ConstraintSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_criterion(mut self, criterion: RankingCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_controller(
        mut self,
        controller: Box<dyn RobustnessController<I, O>>,
    ) -> Self {
        self.controller = controller;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_id(&self) -> usize {
        self.group_id
    }

    pub fn success_action(&self) -> SuccessAction {
        self.success_action
    }

    pub fn failure_kind(&self) -> FailureKind {
        self.failure_kind
    }

    pub fn objective_impact(&self) -> ObjectiveImpact {
        self.objective_impact
    }

    pub fn severity(&self) -> ConstraintSeverity {
        self.severity
    }

    pub fn criterion(&self) -> RankingCriterion {
        self.criterion
    }

    /// The degree of satisfaction of the constraint, before any controller
    /// rewrite.
    pub fn robustness(&self, input: &I, output: &O) -> f64 {
        (self.func)(input, output)
    }

    /// Raw robustness rewritten by the controller, read-only.
    pub(crate) fn controlled_robustness(&self, input: &I, output: &O) -> f64 {
        self.controller
            .apply(self.robustness(input, output), input, output)
    }

    /// Raw robustness rewritten by the controller, advancing its state.
    pub(crate) fn controlled_robustness_mut(&mut self, input: &I, output: &O) -> f64 {
        let raw = (self.func)(input, output);
        self.controller.apply_and_update(raw, input, output)
    }
}

impl<I, O> Clone for Constraint<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            group_id: self.group_id,
            success_action: self.success_action,
            failure_kind: self.failure_kind,
            objective_impact: self.objective_impact,
            severity: self.severity,
            criterion: self.criterion,
            func: Arc::clone(&self.func),
            controller: self.controller.clone_box(),
        }
    }
}

impl<I, O> fmt::Debug for Constraint<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("group_id", &self.group_id)
            .field("success_action", &self.success_action)
            .field("failure_kind", &self.failure_kind)
            .field("objective_impact", &self.objective_impact)
            .field("severity", &self.severity)
            .field("criterion", &self.criterion)
            .finish_non_exhaustive()
    }
}
