//! The constraining specification: an ordered collection of stateful
//! constraints with a group-linked lifecycle.

use std::collections::BTreeSet;
use tracing::debug;

use pw_space::{Point, PointScore};
use pw_types::{precondition_error, ConstraintStateSnapshot, PwError, PwResult, Score};

use crate::constraint::{
    Constraint, ConstraintSeverity, FailureKind, ObjectiveImpact, RankingCriterion, SuccessAction,
};

/// A constraint together with its lifecycle flags.
///
/// A state may transition once from active to succeeded or failed, and
/// independently from active to inactive; once inactive it is never
/// revisited. Succeeded and failed are mutually exclusive.
pub struct ConstraintState<I, O> {
    constraint: Constraint<I, O>,
    active: bool,
    succeeded: bool,
    failed: bool,
}

impl<I, O> ConstraintState<I, O> {
    fn new(constraint: Constraint<I, O>) -> Self {
        Self {
            constraint,
            active: true,
            succeeded: false,
            failed: false,
        }
    }

    pub fn constraint(&self) -> &Constraint<I, O> {
        &self.constraint
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Still evaluated: active and not yet settled either way.
    fn is_eligible(&self) -> bool {
        self.active && !self.succeeded && !self.failed
    }

    fn set_success(&mut self) -> PwResult<()> {
        if self.failed {
            return Err(precondition_error!(
                "constraint '{}' cannot succeed after failing",
                self.constraint.name()
            ));
        }
        self.succeeded = true;
        Ok(())
    }

    fn set_failure(&mut self) -> PwResult<()> {
        if self.succeeded {
            return Err(precondition_error!(
                "constraint '{}' cannot fail after succeeding",
                self.constraint.name()
            ));
        }
        self.failed = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn snapshot(&self) -> ConstraintStateSnapshot {
        ConstraintStateSnapshot {
            name: self.constraint.name().to_string(),
            group_id: self.constraint.group_id(),
            active: self.active,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

/// The result of a lifecycle update: the score the winner produced, plus
/// the first critical robustness found on the wrong side of its criterion.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub score: Score,
    pub critical_violation: Option<f64>,
}

#[derive(Default)]
struct ScoreAccumulator {
    successes: BTreeSet<usize>,
    hard_failures: BTreeSet<usize>,
    soft_failures: BTreeSet<usize>,
    objective: f64,
}

impl ScoreAccumulator {
    fn record<I, O>(&mut self, index: usize, constraint: &Constraint<I, O>, robustness: f64) {
        match constraint.objective_impact() {
            ObjectiveImpact::Unsigned => self.objective += robustness.abs(),
            ObjectiveImpact::Signed => self.objective += robustness,
            ObjectiveImpact::None => {}
        }
        if robustness < 0.0 {
            match constraint.failure_kind() {
                FailureKind::Hard => {
                    self.hard_failures.insert(index);
                }
                FailureKind::Soft => {
                    self.soft_failures.insert(index);
                }
                FailureKind::None => {}
            }
        } else {
            self.successes.insert(index);
        }
    }

    fn into_score(self) -> Score {
        Score::new(
            self.successes,
            self.hard_failures,
            self.soft_failures,
            self.objective,
        )
    }
}

fn on_wrong_side(criterion: RankingCriterion, robustness: f64) -> bool {
    match criterion {
        RankingCriterion::Maximise => robustness < 0.0,
        RankingCriterion::MinimisePositive => robustness > 0.0,
    }
}

/// An ordered sequence of constraint states evaluated against each
/// `(input, output)` pair.
///
/// Indices into the sequence are stable identifiers, used in the index
/// sets of every [`Score`] this specification produces.
pub struct ConstrainingSpecification<I, O> {
    states: Vec<ConstraintState<I, O>>,
    active_count: usize,
}

impl<I, O> ConstrainingSpecification<I, O> {
    pub fn new(constraints: Vec<Constraint<I, O>>) -> Self {
        let active_count = constraints.len();
        Self {
            states: constraints.into_iter().map(ConstraintState::new).collect(),
            active_count,
        }
    }

    pub fn states(&self) -> &[ConstraintState<I, O>] {
        &self.states
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_inactive(&self) -> bool {
        self.active_count == 0
    }

    pub fn has_critical_constraints(&self) -> bool {
        self.states
            .iter()
            .any(|s| s.constraint.severity() == ConstraintSeverity::Critical)
    }

    pub fn snapshot(&self) -> Vec<ConstraintStateSnapshot> {
        self.states.iter().map(|s| s.snapshot()).collect()
    }

    /// Score an `(input, output)` pair without touching any state.
    ///
    /// Controllers are applied read-only; calling this from worker threads
    /// is safe and repeatable.
    pub fn evaluate(&self, input: &I, output: &O) -> PwResult<Score> {
        if self.is_inactive() {
            return Err(PwError::NoActiveConstraints(self.snapshot()));
        }
        let mut acc = ScoreAccumulator::default();
        for (i, state) in self.states.iter().enumerate() {
            if state.is_eligible() {
                let robustness = state.constraint.controlled_robustness(input, output);
                acc.record(i, &state.constraint, robustness);
            }
        }
        Ok(acc.into_score())
    }

    /// Score an `(input, output)` pair on behalf of `point`.
    pub fn evaluate_point(&self, point: Point, input: &I, output: &O) -> PwResult<PointScore> {
        Ok(PointScore::new(point, self.evaluate(input, output)?))
    }

    /// Advance the lifecycle from the winner's `(input, output)` pair.
    ///
    /// Controllers are advanced, successes and hard failures settle their
    /// states, and group-linked deactivation is applied in a second pass
    /// so the outcome does not depend on constraint order. Soft failures
    /// never deactivate.
    pub fn update_from(&mut self, input: &I, output: &O) -> PwResult<UpdateOutcome> {
        if self.is_inactive() {
            return Err(PwError::NoActiveConstraints(self.snapshot()));
        }

        let mut acc = ScoreAccumulator::default();
        let mut critical_violation: Option<f64> = None;
        for (i, state) in self.states.iter_mut().enumerate() {
            if !state.is_eligible() {
                continue;
            }
            let robustness = state.constraint.controlled_robustness_mut(input, output);
            acc.record(i, &state.constraint, robustness);
            if critical_violation.is_none()
                && state.constraint.severity() == ConstraintSeverity::Critical
                && on_wrong_side(state.constraint.criterion(), robustness)
            {
                critical_violation = Some(robustness);
            }
        }
        let score = acc.into_score();

        // First pass: settle individual states and collect the groups to
        // deactivate.
        let mut groups_to_deactivate: BTreeSet<usize> = BTreeSet::new();
        for (i, state) in self.states.iter_mut().enumerate() {
            if score.successes().contains(&i) {
                state.set_success()?;
                if state.constraint.success_action() == SuccessAction::Deactivate {
                    groups_to_deactivate.insert(state.constraint.group_id());
                }
            }
            if score.hard_failures().contains(&i) {
                state.set_failure()?;
                groups_to_deactivate.insert(state.constraint.group_id());
            }
        }

        // Second pass: deactivation is monotonic and group-linked.
        for state in &mut self.states {
            if state.active && groups_to_deactivate.contains(&state.constraint.group_id()) {
                state.deactivate();
                self.active_count -= 1;
                debug!(
                    constraint = state.constraint.name(),
                    group = state.constraint.group_id(),
                    "constraint deactivated"
                );
            }
        }

        Ok(UpdateOutcome {
            score,
            critical_violation,
        })
    }
}
