//! Lexicographic multi-criterion score for a constraining specification.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// The score of one `(input, output)` pair against a constraining
/// specification.
///
/// The three index sets refer to constraint positions within the
/// specification that produced the score. Ordering is lexicographic:
/// `hard_failures`, then `soft_failures`, then `objective`, smaller being
/// better on every criterion. `successes` is diagnostic metadata and does
/// not participate in ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    successes: BTreeSet<usize>,
    hard_failures: BTreeSet<usize>,
    soft_failures: BTreeSet<usize>,
    objective: f64,
}

impl Score {
    pub fn new(
        successes: BTreeSet<usize>,
        hard_failures: BTreeSet<usize>,
        soft_failures: BTreeSet<usize>,
        objective: f64,
    ) -> Self {
        Self {
            successes,
            hard_failures,
            soft_failures,
            objective,
        }
    }

    pub fn successes(&self) -> &BTreeSet<usize> {
        &self.successes
    }

    pub fn hard_failures(&self) -> &BTreeSet<usize> {
        &self.hard_failures
    }

    pub fn soft_failures(&self) -> &BTreeSet<usize> {
        &self.soft_failures
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// True when no constraint failed, hard or soft.
    pub fn is_clean(&self) -> bool {
        self.hard_failures.is_empty() && self.soft_failures.is_empty()
    }

    fn objective_cmp(&self, other: &Self) -> Ordering {
        // Two NaN objectives compare equal so the order stays total.
        if self.objective.is_nan() && other.objective.is_nan() {
            Ordering::Equal
        } else {
            self.objective.total_cmp(&other.objective)
        }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.hard_failures == other.hard_failures
            && self.soft_failures == other.soft_failures
            && self.successes == other.successes
            && self.objective_cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        // Successes only break a full tie on the ordering criteria; this
        // keeps the order total and consistent with structural equality.
        self.hard_failures
            .cmp(&other.hard_failures)
            .then_with(|| self.soft_failures.cmp(&other.soft_failures))
            .then_with(|| self.objective_cmp(other))
            .then_with(|| self.successes.cmp(&other.successes))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{successes {:?}, hard_failures {:?}, soft_failures {:?}, objective {}}}",
            self.successes, self.hard_failures, self.soft_failures, self.objective
        )
    }
}
