//! Controllers that rewrite the raw robustness of a constraint.

use std::sync::Arc;

/// Rewrites raw robustness values before they enter a score.
///
/// Scoring on worker threads uses the read-only [`apply`]; only the
/// winner-driven lifecycle update advances controller state through
/// [`apply_and_update`].
///
/// [`apply`]: RobustnessController::apply
/// [`apply_and_update`]: RobustnessController::apply_and_update
pub trait RobustnessController<I, O>: Send + Sync {
    /// Rewrite `robustness` without changing the controller state.
    fn apply(&self, robustness: f64, input: &I, output: &O) -> f64;

    /// Rewrite `robustness` and advance the controller state.
    fn apply_and_update(&mut self, robustness: f64, input: &I, output: &O) -> f64 {
        self.apply(robustness, input, output)
    }

    fn clone_box(&self) -> Box<dyn RobustnessController<I, O>>;
}

/// Returns the original robustness.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityController;

impl<I, O> RobustnessController<I, O> for IdentityController {
    fn apply(&self, robustness: f64, _input: &I, _output: &O) -> f64 {
        robustness
    }

    fn clone_box(&self) -> Box<dyn RobustnessController<I, O>> {
        Box::new(*self)
    }
}

/// The time extractor used by [`TimeProgressLinearController`].
pub type TimeFn<I, O> = Arc<dyn Fn(&I, &O) -> f64 + Send + Sync>;

/// Spreads the accumulated error linearly over the time still to progress.
///
/// At time `t` the rewritten value is `r − (t − t_prev) · acc`; the
/// accumulator then grows by `result / (t_final − t)`, amortising the error
/// against the remaining time fraction.
pub struct TimeProgressLinearController<I, O> {
    time_fn: TimeFn<I, O>,
    final_time: f64,
    previous_time: f64,
    accumulated: f64,
}

impl<I, O> TimeProgressLinearController<I, O> {
    pub fn new(
        time_fn: impl Fn(&I, &O) -> f64 + Send + Sync + 'static,
        final_time: f64,
    ) -> Self {
        Self {
            time_fn: Arc::new(time_fn),
            final_time,
            previous_time: 0.0,
            accumulated: 0.0,
        }
    }

    fn rewritten(&self, robustness: f64, current_time: f64) -> f64 {
        robustness - (current_time - self.previous_time) * self.accumulated
    }
}

impl<I: 'static, O: 'static> RobustnessController<I, O> for TimeProgressLinearController<I, O> {
    fn apply(&self, robustness: f64, input: &I, output: &O) -> f64 {
        self.rewritten(robustness, (self.time_fn)(input, output))
    }

    fn apply_and_update(&mut self, robustness: f64, input: &I, output: &O) -> f64 {
        let current_time = (self.time_fn)(input, output);
        let result = self.rewritten(robustness, current_time);
        self.previous_time = current_time;
        let remaining = self.final_time - current_time;
        if remaining > 0.0 {
            self.accumulated += result / remaining;
        }
        result
    }

    fn clone_box(&self) -> Box<dyn RobustnessController<I, O>> {
        // A fresh clone restarts the amortisation, as specifications own
        // their controller state individually.
        Box::new(Self {
            time_fn: Arc::clone(&self.time_fn),
            final_time: self.final_time,
            previous_time: 0.0,
            accumulated: 0.0,
        })
    }
}
