use std::sync::Arc;

use pw_runner::{ParameterSearchRunner, Runner, ShiftAndKeepBestHalf, Task, TaskManager};
use pw_space::{Configuration, Point};
use pw_spec::{Constraint, ConstraintSeverity, FailureKind, ObjectiveImpact};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧭 Pathwise Basic Usage Example");

    // A configuration with two explorable parameters and one fixed knob.
    let configuration = Configuration::new()
        .with_fixed("use_reconditioning", 1)
        .with_range("maximum_order", 0, 14)
        .with_range("level", 0, 14);
    let space = configuration.search_space();
    println!(
        "Search space: {} dimensions, {} points",
        space.dimension(),
        space.total_points()
    );

    // The task body: a deterministic function of the input and the
    // projected singleton configuration.
    let task = Task::new("bowl", |input: &f64, cfg: &Configuration| {
        let order = cfg.get("maximum_order")? as f64;
        let level = cfg.get("level")? as f64;
        Ok(input + (order - 7.0).powi(2) + (level - 3.0).powi(2))
    })
    .with_constraints(vec![
        // Steers the search: the distance magnitude is the objective.
        Constraint::new("distance", |_, out: &f64| -out - 0.5)
            .with_objective_impact(ObjectiveImpact::Unsigned),
        // Guards the run: an exploding output is a hard critical failure.
        Constraint::new("bounded", |_, out: &f64| 1.0e6 - out)
            .with_failure_kind(FailureKind::Hard)
            .with_severity(ConstraintSeverity::Critical),
    ]);
    println!("Created task '{}' with {} constraints", task.name(), task.constraint_count());

    let initial_point = Point::initial(Arc::clone(&space));
    println!("Initial point: {initial_point}");

    let concurrency = TaskManager::instance().concurrency().min(4);
    let mut runner = ParameterSearchRunner::new(
        task,
        configuration,
        Arc::new(ShiftAndKeepBestHalf),
        initial_point,
        concurrency,
    )?;
    println!("Started parameter search with {concurrency} workers");

    for cycle in 0..10 {
        runner.push(0.0)?;
        let winner = runner.pull()?;
        println!("Cycle {cycle}: best distance {winner}");
    }

    let manager = TaskManager::instance();
    println!("Logged {} cycle rankings", manager.scores().len());
    println!("Representative point: {:?}", manager.optimal_point());

    // Emit the Octave plotting script for the best-score trace.
    manager.print_best_scores()?;
    println!("Wrote best-score trace to points.m");

    Ok(())
}
