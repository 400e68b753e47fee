//! The task surface: a named wrapper binding a user body and its
//! constraining specification.

use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use pw_space::Configuration;
use pw_spec::{ConstrainingSpecification, Constraint};
use pw_types::PwResult;

/// The user-supplied task body: a deterministic, thread-safe function of
/// the input and a singleton configuration.
pub type TaskBody<I, O> = Arc<dyn Fn(&I, &Configuration) -> PwResult<O> + Send + Sync>;

/// A named task: the body plus the constraining specification that scores
/// and steers its exploration.
///
/// The specification sits behind a read-write lock: worker threads score
/// candidates through read access, while the lifecycle advances under
/// write access on the pulling thread only.
pub struct Task<I, O> {
    id: Uuid,
    name: String,
    body: TaskBody<I, O>,
    specification: Arc<RwLock<ConstrainingSpecification<I, O>>>,
}

impl<I, O> Task<I, O> {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&I, &Configuration) -> PwResult<O> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            body: Arc::new(body),
            specification: Arc::new(RwLock::new(ConstrainingSpecification::new(Vec::new()))),
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<Constraint<I, O>>) -> Self {
        self.specification = Arc::new(RwLock::new(ConstrainingSpecification::new(constraints)));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &TaskBody<I, O> {
        &self.body
    }

    pub fn specification(&self) -> &Arc<RwLock<ConstrainingSpecification<I, O>>> {
        &self.specification
    }

    /// Run the body against a singleton configuration.
    pub fn run(&self, input: &I, configuration: &Configuration) -> PwResult<O> {
        (self.body)(input, configuration)
    }

    /// Number of constraints in the specification.
    pub fn constraint_count(&self) -> usize {
        self.specification.read().states().len()
    }
}

impl<I, O> Clone for Task<I, O> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            body: Arc::clone(&self.body),
            specification: Arc::clone(&self.specification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_delegates_to_body() {
        let task: Task<f64, f64> = Task::new("double", |input, cfg| {
            Ok(input * cfg.get("factor")? as f64)
        });
        let cfg = Configuration::new().with_fixed("factor", 3);
        assert_eq!(task.run(&2.0, &cfg).unwrap(), 6.0);
    }

    #[test]
    fn constraints_populate_specification() {
        let task: Task<f64, f64> = Task::new("step", |input, _| Ok(*input))
            .with_constraints(vec![Constraint::new("margin", |_, out: &f64| *out)]);
        assert_eq!(task.constraint_count(), 1);
        assert!(!task.specification().read().is_inactive());
    }

    #[test]
    fn clone_shares_specification() {
        let task: Task<f64, f64> = Task::new("step", |input, _| Ok(*input))
            .with_constraints(vec![Constraint::new("margin", |_, out: &f64| *out)]);
        let cloned = task.clone();
        cloned.specification().write().update_from(&0.0, &1.0).unwrap();
        assert!(task.specification().read().states()[0].has_succeeded());
        assert_eq!(task.id(), cloned.id());
    }
}
