//! Search points with distance-1 shifting, and the point + score couple.

use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use pw_types::{precondition_error, PwResult, Score};

use crate::space::SearchSpace;

/// An integer-coordinate element of a search space.
///
/// Equality and ordering look at coordinates only; the space handle exists
/// so a point can produce its own neighbours.
#[derive(Debug, Clone)]
pub struct Point {
    space: Arc<SearchSpace>,
    coords: Vec<i64>,
}

impl Point {
    /// Build a point, checking dimension and bounds against the space.
    pub fn new(space: Arc<SearchSpace>, coords: Vec<i64>) -> PwResult<Self> {
        if coords.len() != space.dimension() {
            return Err(precondition_error!(
                "point has {} coordinates but the space has dimension {}",
                coords.len(),
                space.dimension()
            ));
        }
        for (param, &value) in space.parameters().iter().zip(&coords) {
            if !param.contains(value) {
                return Err(precondition_error!(
                    "coordinate {} for '{}' is outside [{}, {}]",
                    value,
                    param.name,
                    param.lower,
                    param.upper
                ));
            }
        }
        Ok(Self { space, coords })
    }

    /// The midpoint of the space, used to seed an exploration.
    pub fn initial(space: Arc<SearchSpace>) -> Self {
        let coords = space.midpoint_coordinates();
        Self { space, coords }
    }

    pub fn space(&self) -> &Arc<SearchSpace> {
        &self.space
    }

    pub fn coordinates(&self) -> &[i64] {
        &self.coords
    }

    /// All points at coordinate distance 1 within bounds.
    pub fn neighbours(&self) -> Vec<Point> {
        let mut result = Vec::with_capacity(2 * self.coords.len());
        for (i, param) in self.space.parameters().iter().enumerate() {
            for delta in [-1i64, 1] {
                let value = self.coords[i] + delta;
                if param.contains(value) {
                    let mut coords = self.coords.clone();
                    coords[i] = value;
                    result.push(Point {
                        space: Arc::clone(&self.space),
                        coords,
                    });
                }
            }
        }
        result
    }

    /// A random neighbour absent from `exclude`, if one exists.
    fn random_fresh_neighbour<R: Rng>(
        &self,
        exclude: &BTreeSet<Point>,
        rng: &mut R,
    ) -> Option<Point> {
        let mut neighbours = self.neighbours();
        neighbours.shuffle(rng);
        neighbours.into_iter().find(|p| !exclude.contains(p))
    }

    /// Produce `n` distinct shifted points, at distance 1 from this point
    /// where the space permits.
    ///
    /// Requires `1 <= n <= total_points`. The point itself only appears in
    /// the result when the space is too small to provide `n` proper
    /// neighbours.
    pub fn make_random_shifted(&self, n: usize) -> PwResult<BTreeSet<Point>> {
        let total = self.space.total_points();
        if n == 0 || n > total {
            return Err(precondition_error!(
                "cannot shift into {n} points in a space of {total}"
            ));
        }
        let mut rng = rand::thread_rng();
        let mut neighbours = self.neighbours();
        neighbours.shuffle(&mut rng);
        let mut seed: BTreeSet<Point> = neighbours.into_iter().take(n).collect();
        if seed.is_empty() {
            seed.insert(self.clone());
        }
        extend_set_by_shifting(&seed, n)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}

impl Eq for Point {}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coords.cmp(&other.coords)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// Grow a non-empty point set to `target` distinct points by shifting.
///
/// Cycles round-robin through the retained points, inserting a fresh
/// random neighbour of each; when every neighbourhood of the accumulated
/// set is exhausted before reaching `target`, the space cannot supply the
/// requested cardinality and an error is returned.
pub fn extend_set_by_shifting(
    points: &BTreeSet<Point>,
    target: usize,
) -> PwResult<BTreeSet<Point>> {
    let first = points
        .iter()
        .next()
        .ok_or_else(|| precondition_error!("cannot extend an empty point set"))?;
    if target > first.space.total_points() {
        return Err(precondition_error!(
            "cannot extend to {target} points in a space of {}",
            first.space.total_points()
        ));
    }

    let mut result = points.clone();
    let mut rng = rand::thread_rng();
    while result.len() < target {
        let sources: Vec<Point> = result.iter().cloned().collect();
        let before = result.len();
        for src in &sources {
            if result.len() >= target {
                break;
            }
            if let Some(fresh) = src.random_fresh_neighbour(&result, &mut rng) {
                result.insert(fresh);
            }
        }
        if result.len() == before {
            return Err(precondition_error!(
                "search space exhausted while extending to {target} points"
            ));
        }
    }
    Ok(result)
}

/// The point + score couple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointScore {
    point: Point,
    score: Score,
}

impl PointScore {
    pub fn new(point: Point, score: Score) -> Self {
        Self { point, score }
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn score(&self) -> &Score {
        &self.score
    }
}

impl PartialOrd for PointScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PointScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.point.cmp(&other.point))
    }
}

impl fmt::Display for PointScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: {}}}", self.point, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::SearchSpace;

    fn space_2d() -> Arc<SearchSpace> {
        Arc::new(SearchSpace::new().add("a", 0, 4).add("b", 0, 4))
    }

    fn point(space: &Arc<SearchSpace>, coords: &[i64]) -> Point {
        Point::new(Arc::clone(space), coords.to_vec()).unwrap()
    }

    #[test]
    fn construction_checks_bounds() {
        let space = space_2d();
        assert!(Point::new(Arc::clone(&space), vec![0, 4]).is_ok());
        assert!(Point::new(Arc::clone(&space), vec![0, 5]).is_err());
        assert!(Point::new(Arc::clone(&space), vec![0]).is_err());
    }

    #[test]
    fn initial_point_is_midpoint() {
        let space = space_2d();
        assert_eq!(Point::initial(space).coordinates(), &[2, 2]);
    }

    #[test]
    fn interior_point_has_full_neighbourhood() {
        let space = space_2d();
        let p = point(&space, &[2, 2]);
        assert_eq!(p.neighbours().len(), 4);
    }

    #[test]
    fn corner_point_has_clipped_neighbourhood() {
        let space = space_2d();
        let p = point(&space, &[0, 0]);
        let neighbours = p.neighbours();
        assert_eq!(neighbours.len(), 2);
        for n in &neighbours {
            assert!(n.coordinates().iter().all(|&c| (0..=4).contains(&c)));
        }
    }

    #[test]
    fn random_shifted_yields_distinct_distance_one_points() {
        let space = space_2d();
        let p = point(&space, &[2, 2]);
        let shifted = p.make_random_shifted(4).unwrap();
        assert_eq!(shifted.len(), 4);
        for s in &shifted {
            let distance: i64 = s
                .coordinates()
                .iter()
                .zip(p.coordinates())
                .map(|(a, b)| (a - b).abs())
                .sum();
            assert_eq!(distance, 1, "shifted point {s} is not a neighbour");
        }
    }

    #[test]
    fn random_shifted_widens_when_neighbourhood_is_short() {
        // A 1x5 line: the midpoint has only two neighbours, so asking for
        // four points must widen past distance 1.
        let space = Arc::new(SearchSpace::new().add("a", 0, 4));
        let p = Point::initial(Arc::clone(&space));
        let shifted = p.make_random_shifted(4).unwrap();
        assert_eq!(shifted.len(), 4);
    }

    #[test]
    fn random_shifted_in_degenerate_space() {
        let space = Arc::new(SearchSpace::new().add("a", 3, 3));
        let p = Point::initial(Arc::clone(&space));
        let shifted = p.make_random_shifted(1).unwrap();
        assert_eq!(shifted.len(), 1);
        assert!(shifted.contains(&p));
    }

    #[test]
    fn random_shifted_rejects_oversized_requests() {
        let space = Arc::new(SearchSpace::new().add("a", 0, 1));
        let p = Point::initial(Arc::clone(&space));
        assert!(p.make_random_shifted(3).is_err());
        assert!(p.make_random_shifted(0).is_err());
    }

    #[test]
    fn extend_preserves_members_and_reaches_target() {
        let space = space_2d();
        let seed: BTreeSet<Point> = [point(&space, &[1, 1]), point(&space, &[3, 3])]
            .into_iter()
            .collect();
        let extended = extend_set_by_shifting(&seed, 6).unwrap();
        assert_eq!(extended.len(), 6);
        assert!(extended.contains(&point(&space, &[1, 1])));
        assert!(extended.contains(&point(&space, &[3, 3])));
    }

    #[test]
    fn extend_can_fill_a_whole_space() {
        let space = Arc::new(SearchSpace::new().add("a", 0, 2).add("b", 0, 1));
        let seed: BTreeSet<Point> =
            [Point::new(Arc::clone(&space), vec![0, 0]).unwrap()].into_iter().collect();
        let extended = extend_set_by_shifting(&seed, 6).unwrap();
        assert_eq!(extended.len(), 6);
    }

    #[test]
    fn point_order_is_lexicographic_on_coordinates() {
        let space = space_2d();
        let a = point(&space, &[1, 4]);
        let b = point(&space, &[2, 0]);
        assert!(a < b);
    }

    #[test]
    fn point_score_orders_by_score_then_point() {
        let space = space_2d();
        let better = Score::new(
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
            -1.0,
        );
        let worse = Score::new(BTreeSet::new(), BTreeSet::new(), BTreeSet::new(), 1.0);

        let a = PointScore::new(point(&space, &[4, 4]), better.clone());
        let b = PointScore::new(point(&space, &[0, 0]), worse);
        assert!(a < b, "score dominates the point order");

        let c = PointScore::new(point(&space, &[0, 0]), better.clone());
        let d = PointScore::new(point(&space, &[1, 0]), better);
        assert!(c < d, "equal scores fall back to point order");
    }
}
