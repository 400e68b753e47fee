//! Sequential runner: the single-threaded degenerate case.

use pw_space::Configuration;
use pw_types::{precondition_error, PwResult};

use crate::runner::{settle_cycle, Runner};
use crate::task::Task;

/// Runs a task in the calling thread on a fixed singleton configuration.
///
/// Used when the configuration leaves nothing to explore, or when the
/// manager's concurrency is 1.
pub struct SequentialRunner<I, O> {
    task: Task<I, O>,
    configuration: Configuration,
    last_output: Option<O>,
}

impl<I, O> SequentialRunner<I, O> {
    pub fn new(task: Task<I, O>, configuration: Configuration) -> Self {
        Self {
            task,
            configuration,
            last_output: None,
        }
    }
}

impl<I, O> Runner<I, O> for SequentialRunner<I, O>
where
    I: Send,
    O: Send,
{
    fn push(&mut self, input: I) -> PwResult<()> {
        let output = self.task.run(&input, &self.configuration)?;
        settle_cycle(self.task.specification(), &input, &output)?;
        self.last_output = Some(output);
        Ok(())
    }

    fn pull(&mut self) -> PwResult<O> {
        self.last_output
            .take()
            .ok_or_else(|| precondition_error!("pull called before a successful push"))
    }
}
