//! The runner interface shared by all execution modes.

use parking_lot::RwLock;
use std::sync::Arc;

use pw_spec::ConstrainingSpecification;
use pw_types::{PwError, PwResult};

/// A runner handle: feed inputs with `push`, harvest the winning output
/// with `pull`.
///
/// Pushes are processed strictly in call order. `pull` is the single
/// propagation point for cycle-level errors.
pub trait Runner<I, O>: Send {
    fn push(&mut self, input: I) -> PwResult<()>;
    fn pull(&mut self) -> PwResult<O>;
}

/// Advance the constraint lifecycle from the winner's pair and apply the
/// post-cycle checks shared by every runner.
///
/// A critical robustness on the wrong side of its criterion outranks the
/// inactive check: a hard-failed critical constraint may deactivate the
/// whole specification in the same cycle it must be reported for.
pub(crate) fn settle_cycle<I, O>(
    specification: &Arc<RwLock<ConstrainingSpecification<I, O>>>,
    input: &I,
    output: &O,
) -> PwResult<()> {
    let mut spec = specification.write();
    let outcome = spec.update_from(input, output)?;
    if let Some(robustness) = outcome.critical_violation {
        return Err(PwError::CriticalRankingFailure(robustness));
    }
    if spec.is_inactive() {
        return Err(PwError::NoActiveConstraints(spec.snapshot()));
    }
    Ok(())
}
