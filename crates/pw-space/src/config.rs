//! Configurations: named properties, projection onto search points.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use pw_types::{config_error, precondition_error, PwResult};

use crate::point::Point;
use crate::space::SearchSpace;

/// A property value: fixed, or still ranging over an interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Property {
    Fixed(i64),
    Range { lower: i64, upper: i64 },
}

/// A mapping from named properties to values.
///
/// A configuration is *singleton* when every property is fixed; only
/// singleton configurations can be handed to a task body. The ranged
/// properties, in name order, define the configuration's search space.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Configuration {
    properties: BTreeMap<String, Property>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed(mut self, name: impl Into<String>, value: i64) -> Self {
        self.properties.insert(name.into(), Property::Fixed(value));
        self
    }

    pub fn with_range(mut self, name: impl Into<String>, lower: i64, upper: i64) -> Self {
        let property = if lower == upper {
            Property::Fixed(lower)
        } else {
            Property::Range { lower, upper }
        };
        self.properties.insert(name.into(), property);
        self
    }

    pub fn properties(&self) -> &BTreeMap<String, Property> {
        &self.properties
    }

    /// True when every property is fixed.
    pub fn is_singleton(&self) -> bool {
        self.properties
            .values()
            .all(|p| matches!(p, Property::Fixed(_)))
    }

    /// The value of a fixed property; an error for ranged ones.
    pub fn get(&self, name: &str) -> PwResult<i64> {
        match self.properties.get(name) {
            Some(Property::Fixed(value)) => Ok(*value),
            Some(Property::Range { .. }) => Err(config_error!(
                "property '{name}' has not been fixed to a single value"
            )),
            None => Err(config_error!("unknown property: {name}")),
        }
    }

    /// The search space spanned by the ranged properties, in name order.
    pub fn search_space(&self) -> Arc<SearchSpace> {
        let mut space = SearchSpace::new();
        for (name, property) in &self.properties {
            if let Property::Range { lower, upper } = property {
                space = space.add(name.clone(), *lower, *upper);
            }
        }
        Arc::new(space)
    }

    /// Fix every ranged property to the point's coordinate, yielding a
    /// singleton configuration.
    ///
    /// The point must come from this configuration's search space: the
    /// coordinate order is the name order of the ranged properties.
    pub fn project(&self, point: &Point) -> PwResult<Configuration> {
        let ranged: Vec<&String> = self
            .properties
            .iter()
            .filter(|(_, p)| matches!(p, Property::Range { .. }))
            .map(|(name, _)| name)
            .collect();
        if ranged.len() != point.coordinates().len() {
            return Err(precondition_error!(
                "point of dimension {} cannot project a configuration with {} ranged properties",
                point.coordinates().len(),
                ranged.len()
            ));
        }

        let mut projected = self.clone();
        for (name, &coordinate) in ranged.into_iter().zip(point.coordinates()) {
            projected
                .properties
                .insert(name.clone(), Property::Fixed(coordinate));
        }
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Configuration {
        Configuration::new()
            .with_fixed("use_reconditioning", 1)
            .with_range("maximum_order", 1, 5)
            .with_range("level", 0, 2)
    }

    #[test]
    fn singleton_detection() {
        assert!(!sample().is_singleton());
        assert!(Configuration::new().with_fixed("a", 3).is_singleton());
        assert!(Configuration::new().is_singleton());
    }

    #[test]
    fn degenerate_range_is_fixed() {
        let cfg = Configuration::new().with_range("a", 2, 2);
        assert!(cfg.is_singleton());
        assert_eq!(cfg.get("a").unwrap(), 2);
    }

    #[test]
    fn search_space_covers_ranged_properties_in_name_order() {
        let space = sample().search_space();
        let names: Vec<&str> = space.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["level", "maximum_order"]);
        assert_eq!(space.total_points(), 15);
    }

    #[test]
    fn projection_fixes_every_ranged_property() {
        let cfg = sample();
        let space = cfg.search_space();
        let point = Point::new(space, vec![2, 4]).unwrap();
        let projected = cfg.project(&point).unwrap();

        assert!(projected.is_singleton());
        assert_eq!(projected.get("level").unwrap(), 2);
        assert_eq!(projected.get("maximum_order").unwrap(), 4);
        assert_eq!(projected.get("use_reconditioning").unwrap(), 1);
    }

    #[test]
    fn projection_rejects_mismatched_dimension() {
        let cfg = sample();
        let other_space = Arc::new(SearchSpace::new().add("x", 0, 1));
        let point = Point::new(other_space, vec![0]).unwrap();
        assert!(cfg.project(&point).is_err());
    }

    #[test]
    fn get_errors() {
        let cfg = sample();
        assert!(cfg.get("maximum_order").is_err());
        assert!(cfg.get("missing").is_err());
        assert_eq!(cfg.get("use_reconditioning").unwrap(), 1);
    }
}
