//! Search space definitions.

use serde::{Deserialize, Serialize};

/// A single integer parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Human-readable parameter name (e.g. "maximum_order").
    pub name: String,
    /// Inclusive lower bound.
    pub lower: i64,
    /// Inclusive upper bound.
    pub upper: i64,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, lower: i64, upper: i64) -> Self {
        debug_assert!(lower <= upper);
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    /// Number of admissible values along this dimension.
    pub fn size(&self) -> usize {
        (self.upper - self.lower + 1) as usize
    }

    pub fn contains(&self, value: i64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add(mut self, name: impl Into<String>, lower: i64, upper: i64) -> Self {
        self.parameters.push(ParameterDef::new(name, lower, upper));
        self
    }

    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    pub fn dimension(&self) -> usize {
        self.parameters.len()
    }

    /// Total number of points in the space, saturating on overflow.
    pub fn total_points(&self) -> usize {
        let mut total: usize = 1;
        for param in &self.parameters {
            total = match total.checked_mul(param.size()) {
                Some(t) => t,
                None => return usize::MAX,
            };
        }
        total
    }

    /// Coordinates of the midpoint of every dimension.
    pub(crate) fn midpoint_coordinates(&self) -> Vec<i64> {
        self.parameters
            .iter()
            .map(|p| p.lower + (p.upper - p.lower) / 2)
            .collect()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_points_is_product_of_sizes() {
        let space = SearchSpace::new().add("a", 1, 3).add("b", 10, 11);
        assert_eq!(space.dimension(), 2);
        assert_eq!(space.total_points(), 6);
    }

    #[test]
    fn empty_space_has_one_point() {
        assert_eq!(SearchSpace::new().total_points(), 1);
    }

    #[test]
    fn total_points_saturates() {
        let space = SearchSpace::new()
            .add("a", 0, i64::MAX - 1)
            .add("b", 0, i64::MAX - 1);
        assert_eq!(space.total_points(), usize::MAX);
    }

    #[test]
    fn parameter_bounds() {
        let p = ParameterDef::new("depth", -2, 2);
        assert_eq!(p.size(), 5);
        assert!(p.contains(-2));
        assert!(p.contains(2));
        assert!(!p.contains(3));
    }

    #[test]
    fn midpoint_rounds_down() {
        let space = SearchSpace::new().add("a", 1, 4).add("b", -3, 3);
        assert_eq!(space.midpoint_coordinates(), vec![2, 0]);
    }
}
