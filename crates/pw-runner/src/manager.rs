//! Process-wide task manager: concurrency policy, the default exploration
//! strategy, the best-score log and its diagnostics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::{debug, info};

use pw_space::{Configuration, Point, PointScore};
use pw_types::{precondition_error, PwError, PwResult};

use crate::exploration::{ExplorationStrategy, ShiftAndKeepBestHalf};
use crate::runner::Runner;
use crate::search::ParameterSearchRunner;
use crate::sequential::SequentialRunner;
use crate::task::Task;

/// One entry of the score log: the full ranking of a pull cycle.
#[derive(Clone)]
pub struct ScoreLogEntry {
    pub recorded_at: DateTime<Utc>,
    pub scores: BTreeSet<PointScore>,
}

/// Manages concurrency and runner selection across the process.
///
/// A single instance exists per process; construction is deferred to the
/// first use and never spawns threads itself.
pub struct TaskManager {
    concurrency: Mutex<usize>,
    exploration: Mutex<Arc<dyn ExplorationStrategy>>,
    scores: Mutex<Vec<ScoreLogEntry>>,
}

impl TaskManager {
    /// The process-wide instance.
    pub fn instance() -> &'static TaskManager {
        static INSTANCE: OnceLock<TaskManager> = OnceLock::new();
        INSTANCE.get_or_init(TaskManager::new)
    }

    fn new() -> Self {
        Self {
            concurrency: Mutex::new(Self::maximum_concurrency()),
            exploration: Mutex::new(Arc::new(ShiftAndKeepBestHalf)),
            scores: Mutex::new(Vec::new()),
        }
    }

    /// The hardware concurrency cap.
    pub fn maximum_concurrency() -> usize {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn concurrency(&self) -> usize {
        *self.concurrency.lock()
    }

    /// Set the concurrency used for future runner selection; must lie in
    /// `[1, maximum_concurrency()]`.
    pub fn set_concurrency(&self, concurrency: usize) -> PwResult<()> {
        let cap = Self::maximum_concurrency();
        if concurrency == 0 || concurrency > cap {
            return Err(PwError::InvalidConcurrency {
                requested: concurrency,
                cap,
            });
        }
        *self.concurrency.lock() = concurrency;
        Ok(())
    }

    pub fn exploration(&self) -> Arc<dyn ExplorationStrategy> {
        Arc::clone(&self.exploration.lock())
    }

    /// Replace the default exploration strategy handed to new runners.
    pub fn set_exploration(&self, strategy: Arc<dyn ExplorationStrategy>) {
        info!(strategy = strategy.name(), "exploration strategy replaced");
        *self.exploration.lock() = strategy;
    }

    /// Append one cycle's ranking to the score log.
    pub fn append_scores(&self, scores: BTreeSet<PointScore>) {
        debug!(size = scores.len(), "cycle scores appended");
        self.scores.lock().push(ScoreLogEntry {
            recorded_at: Utc::now(),
            scores,
        });
    }

    pub fn scores(&self) -> Vec<ScoreLogEntry> {
        self.scores.lock().clone()
    }

    /// The minimum point score of every logged cycle, in cycle order.
    pub fn best_scores(&self) -> Vec<PointScore> {
        self.scores
            .lock()
            .iter()
            .filter_map(|entry| entry.scores.iter().next().cloned())
            .collect()
    }

    pub fn clear_scores(&self) {
        self.scores.lock().clear();
    }

    /// The most representative point across the best scores: the
    /// per-coordinate arithmetic mean, rounded to the nearest integer.
    /// Empty when nothing has been logged.
    pub fn optimal_point(&self) -> Vec<i64> {
        let best = self.best_scores();
        let Some(first) = best.first() else {
            return Vec::new();
        };
        let dimension = first.point().coordinates().len();
        let mut sums = vec![0.0f64; dimension];
        for point_score in &best {
            for (i, &coordinate) in point_score.point().coordinates().iter().enumerate() {
                sums[i] += coordinate as f64;
            }
        }
        sums.into_iter()
            .map(|sum| (sum / best.len() as f64).round() as i64)
            .collect()
    }

    /// Write the best-score trace as an Octave/Matlab plotting script.
    pub fn write_best_scores_plot(&self, path: impl AsRef<Path>) -> PwResult<()> {
        let best = self.best_scores();
        let Some(first) = best.first() else {
            return Ok(());
        };
        let space = Arc::clone(first.point().space());

        let mut file = std::fs::File::create(path)?;
        writeln!(file, "x = [1:{}];", best.len())?;
        writeln!(file, "figure(1);")?;
        writeln!(file, "hold on;")?;
        for (i, parameter) in space.parameters().iter().enumerate() {
            let values: Vec<String> = best
                .iter()
                .map(|ps| ps.point().coordinates()[i].to_string())
                .collect();
            writeln!(file, "y{} = [{}];", i, values.join(", "))?;
            let display_name = parameter.name.replace('_', " ");
            writeln!(file, "plot(x,y{i},'DisplayName','{display_name}');")?;
        }
        writeln!(file, "legend;")?;
        writeln!(file, "hold off;")?;
        Ok(())
    }

    /// Emit the plotting script to `points.m` in the working directory.
    pub fn print_best_scores(&self) -> PwResult<()> {
        self.write_best_scores_plot("points.m")
    }

    /// Select the proper runner for a task and configuration.
    ///
    /// A singleton configuration needs no search; concurrency 1 runs
    /// sequentially on the space's initial point; everything else gets a
    /// parameter-search pool capped by the size of the space.
    pub fn runner_for<I, O>(
        &self,
        task: Task<I, O>,
        configuration: Configuration,
    ) -> PwResult<Box<dyn Runner<I, O>>>
    where
        I: Clone + Send + Sync + 'static,
        O: Send + Sync + 'static,
    {
        if task.constraint_count() == 0 {
            return Err(precondition_error!(
                "task '{}' has no constraints",
                task.name()
            ));
        }

        if configuration.is_singleton() {
            info!(task = task.name(), "singleton configuration: sequential runner");
            return Ok(Box::new(SequentialRunner::new(task, configuration)));
        }

        let space = configuration.search_space();
        let initial_point = Point::initial(Arc::clone(&space));
        let concurrency = self.concurrency();
        if concurrency == 1 {
            info!(
                task = task.name(),
                initial_point = %initial_point,
                "concurrency 1: sequential runner on the initial point"
            );
            let projected = configuration.project(&initial_point)?;
            return Ok(Box::new(SequentialRunner::new(task, projected)));
        }

        let workers = concurrency.min(space.total_points());
        info!(task = task.name(), workers, "parameter search runner");
        Ok(Box::new(ParameterSearchRunner::new(
            task,
            configuration,
            self.exploration(),
            initial_point,
            workers,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_space::SearchSpace;
    use pw_spec::Constraint;
    use pw_types::Score;

    fn point_score(space: &Arc<SearchSpace>, coords: &[i64], objective: f64) -> PointScore {
        let point = Point::new(Arc::clone(space), coords.to_vec()).unwrap();
        PointScore::new(
            point,
            Score::new(BTreeSet::new(), BTreeSet::new(), BTreeSet::new(), objective),
        )
    }

    fn space_2d() -> Arc<SearchSpace> {
        Arc::new(SearchSpace::new().add("max_order", 0, 9).add("step_size", 0, 9))
    }

    #[test]
    fn concurrency_bounds_are_enforced() {
        let manager = TaskManager::new();
        assert!(matches!(
            manager.set_concurrency(0),
            Err(PwError::InvalidConcurrency { requested: 0, .. })
        ));
        assert!(manager
            .set_concurrency(TaskManager::maximum_concurrency() + 1)
            .is_err());
        manager.set_concurrency(1).unwrap();
        assert_eq!(manager.concurrency(), 1);
    }

    #[test]
    fn best_scores_project_each_cycle_minimum() {
        let manager = TaskManager::new();
        let space = space_2d();

        let mut first: BTreeSet<PointScore> = BTreeSet::new();
        first.insert(point_score(&space, &[1, 1], 5.0));
        first.insert(point_score(&space, &[2, 2], -1.0));
        manager.append_scores(first);

        let mut second: BTreeSet<PointScore> = BTreeSet::new();
        second.insert(point_score(&space, &[3, 3], 7.0));
        manager.append_scores(second);

        let best = manager.best_scores();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].point().coordinates(), &[2, 2]);
        assert_eq!(best[1].point().coordinates(), &[3, 3]);

        let entries = manager.scores();
        assert!(entries[0].recorded_at <= entries[1].recorded_at);
    }

    #[test]
    fn optimal_point_is_rounded_mean() {
        let manager = TaskManager::new();
        let space = space_2d();
        for coords in [[1, 2], [2, 3], [2, 7]] {
            let mut entry: BTreeSet<PointScore> = BTreeSet::new();
            entry.insert(point_score(&space, &coords, 0.0));
            manager.append_scores(entry);
        }
        // Means: (1+2+2)/3 = 1.67 -> 2; (2+3+7)/3 = 4.0 -> 4.
        assert_eq!(manager.optimal_point(), vec![2, 4]);
    }

    #[test]
    fn optimal_point_empty_without_scores() {
        let manager = TaskManager::new();
        assert!(manager.optimal_point().is_empty());
    }

    #[test]
    fn clear_scores_resets_the_log() {
        let manager = TaskManager::new();
        let space = space_2d();
        let mut entry: BTreeSet<PointScore> = BTreeSet::new();
        entry.insert(point_score(&space, &[0, 0], 0.0));
        manager.append_scores(entry);
        assert_eq!(manager.scores().len(), 1);
        manager.clear_scores();
        assert!(manager.scores().is_empty());
        assert!(manager.best_scores().is_empty());
    }

    #[test]
    fn plot_script_shape() {
        let manager = TaskManager::new();
        let space = space_2d();
        for coords in [[1, 5], [2, 6]] {
            let mut entry: BTreeSet<PointScore> = BTreeSet::new();
            entry.insert(point_score(&space, &coords, 0.0));
            manager.append_scores(entry);
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.m");
        manager.write_best_scores_plot(&path).unwrap();
        let script = std::fs::read_to_string(&path).unwrap();

        assert!(script.starts_with("x = [1:2];\n"));
        assert!(script.contains("figure(1);"));
        assert!(script.contains("y0 = [1, 2];"));
        assert!(script.contains("y1 = [5, 6];"));
        assert!(script.contains("plot(x,y0,'DisplayName','max order');"));
        assert!(script.ends_with("legend;\nhold off;\n"));
    }

    #[test]
    fn plot_script_skipped_without_scores() {
        let manager = TaskManager::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.m");
        manager.write_best_scores_plot(&path).unwrap();
        assert!(!path.exists());
    }

    fn constrained_task() -> Task<f64, f64> {
        Task::new("probe", |input: &f64, _: &Configuration| Ok(*input))
            .with_constraints(vec![Constraint::new("finite", |_, out: &f64| {
                if out.is_finite() {
                    -1.0
                } else {
                    -f64::INFINITY
                }
            })])
    }

    #[test]
    fn singleton_configuration_selects_sequential_runner() {
        let manager = TaskManager::new();
        let cfg = Configuration::new().with_fixed("level", 2);
        let mut runner = manager.runner_for(constrained_task(), cfg).unwrap();
        runner.push(1.5).unwrap();
        assert_eq!(runner.pull().unwrap(), 1.5);
    }

    #[test]
    fn concurrency_one_projects_the_initial_point() {
        let manager = TaskManager::new();
        manager.set_concurrency(1).unwrap();
        let cfg = Configuration::new().with_range("level", 0, 4);
        let task = Task::new("level_probe", |_: &f64, cfg: &Configuration| {
            Ok(cfg.get("level")? as f64)
        })
        .with_constraints(vec![Constraint::new("any", |_, _: &f64| -1.0)]);

        let mut runner = manager.runner_for(task, cfg).unwrap();
        runner.push(0.0).unwrap();
        // The initial point is the midpoint of [0, 4].
        assert_eq!(runner.pull().unwrap(), 2.0);
    }

    #[test]
    fn tasks_without_constraints_are_rejected() {
        let manager = TaskManager::new();
        let task: Task<f64, f64> = Task::new("bare", |input, _| Ok(*input));
        let cfg = Configuration::new().with_fixed("a", 0);
        assert!(manager.runner_for(task, cfg).is_err());
    }
}
