//! Parameter-search runner: the concurrent exploration core.
//!
//! One `push` fans an input out across `concurrency` perturbed
//! configuration points; `pull` collects the scored outputs, ranks them,
//! advances the exploration and the constraint lifecycle, and returns the
//! winning output.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use pw_space::{extend_set_by_shifting, Configuration, Point, PointScore};
use pw_spec::ConstrainingSpecification;
use pw_types::{precondition_error, PwError, PwResult};

use crate::exploration::ExplorationStrategy;
use crate::manager::TaskManager;
use crate::runner::{settle_cycle, Runner};
use crate::task::{Task, TaskBody};

/// What one worker hands back for one candidate.
enum WorkerReport<O> {
    Completed { output: O, point_score: PointScore },
    Failed,
}

/// Runs a task by detached concurrent search into the parameter space.
///
/// The pool is statically sized at construction. Both channels are bounded
/// to `concurrency`: a `push` waits if the workers have not drained the
/// previous batch.
pub struct ParameterSearchRunner<I, O> {
    task: Task<I, O>,
    concurrency: usize,
    exploration: Arc<dyn ExplorationStrategy>,
    initial_point: Point,
    pending_points: VecDeque<Point>,
    last_input: Option<I>,
    input_tx: Option<Sender<(I, Point)>>,
    output_rx: Receiver<WorkerReport<O>>,
    failures: Arc<AtomicUsize>,
    active: bool,
    workers: Vec<JoinHandle<()>>,
}

impl<I, O> ParameterSearchRunner<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    pub fn new(
        task: Task<I, O>,
        configuration: Configuration,
        exploration: Arc<dyn ExplorationStrategy>,
        initial_point: Point,
        concurrency: usize,
    ) -> PwResult<Self> {
        if concurrency == 0 {
            return Err(precondition_error!(
                "a parameter search runner needs at least one worker"
            ));
        }
        if task.constraint_count() == 0 {
            return Err(precondition_error!(
                "task '{}' has no constraints to steer the search",
                task.name()
            ));
        }

        let (input_tx, input_rx) = bounded::<(I, Point)>(concurrency);
        let (output_tx, output_rx) = bounded::<WorkerReport<O>>(concurrency);
        let failures = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(concurrency);
        for i in 0..concurrency {
            let name = if concurrency >= 10 {
                format!("{}-{:02}", task.name(), i)
            } else {
                format!("{}-{}", task.name(), i)
            };
            let handle = thread::Builder::new().name(name).spawn({
                let input_rx = input_rx.clone();
                let output_tx = output_tx.clone();
                let body = Arc::clone(task.body());
                let specification = Arc::clone(task.specification());
                let base = configuration.clone();
                let failures = Arc::clone(&failures);
                move || worker_loop(input_rx, output_tx, body, specification, base, failures)
            })?;
            workers.push(handle);
        }

        Ok(Self {
            task,
            concurrency,
            exploration,
            initial_point,
            pending_points: VecDeque::with_capacity(concurrency),
            last_input: None,
            input_tx: Some(input_tx),
            output_rx,
            failures,
            active: false,
            workers,
        })
    }
}

fn worker_loop<I, O>(
    input_rx: Receiver<(I, Point)>,
    output_tx: Sender<WorkerReport<O>>,
    body: TaskBody<I, O>,
    specification: Arc<RwLock<ConstrainingSpecification<I, O>>>,
    base: Configuration,
    failures: Arc<AtomicUsize>,
) {
    // Channel disconnection is the termination signal.
    while let Ok((input, point)) = input_rx.recv() {
        let report = match run_candidate(&body, &specification, &base, &input, &point) {
            Ok((output, point_score)) => WorkerReport::Completed {
                output,
                point_score,
            },
            Err(error) => {
                failures.fetch_add(1, Ordering::SeqCst);
                warn!(%error, point = %point, "task failed");
                WorkerReport::Failed
            }
        };
        if output_tx.send(report).is_err() {
            break;
        }
    }
}

fn run_candidate<I, O>(
    body: &TaskBody<I, O>,
    specification: &Arc<RwLock<ConstrainingSpecification<I, O>>>,
    base: &Configuration,
    input: &I,
    point: &Point,
) -> PwResult<(O, PointScore)> {
    let configuration = base.project(point)?;
    let output = body(input, &configuration)?;
    // Scoring is read-only: lifecycle mutation belongs to the pull thread.
    let point_score = specification
        .read()
        .evaluate_point(point.clone(), input, &output)?;
    Ok((output, point_score))
}

impl<I, O> Runner<I, O> for ParameterSearchRunner<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    fn push(&mut self, input: I) -> PwResult<()> {
        if !self.active {
            self.active = true;
            let seeded = self.initial_point.make_random_shifted(self.concurrency)?;
            debug!(
                task = self.task.name(),
                points = seeded.len(),
                "seeded initial generation"
            );
            self.pending_points.extend(seeded);
        }
        let input_tx = self
            .input_tx
            .as_ref()
            .ok_or_else(|| precondition_error!("runner has been shut down"))?;
        for _ in 0..self.concurrency {
            let point = self.pending_points.pop_front().ok_or_else(|| {
                precondition_error!("point pool exhausted: pull the previous cycle first")
            })?;
            input_tx
                .send((input.clone(), point))
                .map_err(|_| PwError::TaskFailure("worker pool disconnected".into()))?;
        }
        self.last_input = Some(input);
        Ok(())
    }

    fn pull(&mut self) -> PwResult<O> {
        let input = self
            .last_input
            .clone()
            .ok_or_else(|| precondition_error!("pull called before any push"))?;

        let mut completed: Vec<(O, PointScore)> = Vec::with_capacity(self.concurrency);
        let mut failed = 0usize;
        for _ in 0..self.concurrency {
            match self.output_rx.recv() {
                Ok(WorkerReport::Completed {
                    output,
                    point_score,
                }) => completed.push((output, point_score)),
                Ok(WorkerReport::Failed) => failed += 1,
                Err(_) => {
                    return Err(PwError::TaskFailure(
                        "worker pool disconnected before the cycle completed".into(),
                    ))
                }
            }
        }
        self.failures.store(0, Ordering::SeqCst);
        info!(
            task = self.task.name(),
            completed = completed.len(),
            failed,
            "cycle collected"
        );
        if completed.is_empty() {
            return Err(PwError::TaskFailure(format!(
                "all {} candidates failed in this cycle",
                self.concurrency
            )));
        }

        let ranking: BTreeSet<PointScore> =
            completed.iter().map(|(_, ps)| ps.clone()).collect();
        let distinct_points: BTreeSet<&Point> =
            completed.iter().map(|(_, ps)| ps.point()).collect();
        if ranking.len() != completed.len() || distinct_points.len() != completed.len() {
            return Err(precondition_error!(
                "duplicate points in the cycle ranking"
            ));
        }

        let mut next_points = self.exploration.next_points_from(&ranking)?;
        if next_points.len() < self.concurrency {
            // Failed candidates shrank the ranking; top the generation
            // back up so the pool keeps its size.
            next_points = extend_set_by_shifting(&next_points, self.concurrency)?;
        }
        self.pending_points.extend(next_points);
        debug_assert_eq!(self.pending_points.len(), self.concurrency);

        let Some((best_output, best_point_score)) =
            completed.into_iter().min_by(|a, b| a.1.cmp(&b.1))
        else {
            return Err(precondition_error!("empty cycle after collection"));
        };
        debug!(
            winner = %best_point_score,
            clean = best_point_score.score().is_clean(),
            "winner selected"
        );

        // Only the winner's pair advances the constraint lifecycle.
        settle_cycle(self.task.specification(), &input, &best_output)?;

        TaskManager::instance().append_scores(ranking);

        Ok(best_output)
    }
}

impl<I, O> Drop for ParameterSearchRunner<I, O> {
    fn drop(&mut self) {
        // Dropping the sender wakes every worker into disconnection.
        self.input_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
