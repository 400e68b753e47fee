//! Exploration strategies: deriving the next generation of points from a
//! ranking.

use std::collections::BTreeSet;

use pw_space::{extend_set_by_shifting, Point, PointScore};
use pw_types::{precondition_error, PwResult};

/// Policy mapping a ranking of point scores to the next generation of
/// points.
///
/// Implementations must preserve cardinality and must not return
/// duplicates.
pub trait ExplorationStrategy: Send + Sync {
    /// Make the next points from the ranking, preserving its size.
    fn next_points_from(&self, ranking: &BTreeSet<PointScore>) -> PwResult<BTreeSet<Point>>;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Keeps the best half of the ranking and extends it back to full size
/// with shifted neighbours of the retained points.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftAndKeepBestHalf;

impl ExplorationStrategy for ShiftAndKeepBestHalf {
    fn next_points_from(&self, ranking: &BTreeSet<PointScore>) -> PwResult<BTreeSet<Point>> {
        if ranking.is_empty() {
            return Err(precondition_error!(
                "cannot derive the next generation from an empty ranking"
            ));
        }
        let size = ranking.len();
        let retained_count = size.div_ceil(2);
        let retained: BTreeSet<Point> = ranking
            .iter()
            .take(retained_count)
            .map(|ps| ps.point().clone())
            .collect();
        extend_set_by_shifting(&retained, size)
    }

    fn name(&self) -> &str {
        "shift_and_keep_best_half"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_types::Score;
    use std::sync::Arc;

    use pw_space::SearchSpace;

    fn ranking_of(coords: &[&[i64]], objectives: &[f64]) -> BTreeSet<PointScore> {
        let space = Arc::new(SearchSpace::new().add("a", 0, 9).add("b", 0, 9));
        coords
            .iter()
            .zip(objectives)
            .map(|(c, &objective)| {
                let point = Point::new(Arc::clone(&space), c.to_vec()).unwrap();
                let score = Score::new(
                    BTreeSet::new(),
                    BTreeSet::new(),
                    BTreeSet::new(),
                    objective,
                );
                PointScore::new(point, score)
            })
            .collect()
    }

    #[test]
    fn cardinality_is_preserved() {
        for size in [1usize, 2, 3, 4, 7] {
            let coords: Vec<Vec<i64>> = (0..size as i64).map(|i| vec![i, i]).collect();
            let refs: Vec<&[i64]> = coords.iter().map(|c| c.as_slice()).collect();
            let objectives: Vec<f64> = (0..size).map(|i| i as f64).collect();
            let ranking = ranking_of(&refs, &objectives);

            let next = ShiftAndKeepBestHalf.next_points_from(&ranking).unwrap();
            assert_eq!(next.len(), size, "cardinality must survive size {size}");
        }
    }

    #[test]
    fn best_half_is_retained() {
        let ranking = ranking_of(
            &[&[0, 0], &[2, 2], &[4, 4], &[6, 6]],
            &[-10.0, -5.0, 5.0, 10.0],
        );
        let next = ShiftAndKeepBestHalf.next_points_from(&ranking).unwrap();

        let best: Vec<&PointScore> = ranking.iter().take(2).collect();
        for ps in best {
            assert!(
                next.contains(ps.point()),
                "best point {} must be retained",
                ps.point()
            );
        }
    }

    #[test]
    fn no_duplicates_in_next_generation() {
        let ranking = ranking_of(&[&[5, 5], &[5, 6]], &[0.0, 1.0]);
        let next = ShiftAndKeepBestHalf.next_points_from(&ranking).unwrap();
        // BTreeSet already deduplicates; the cardinality check is the
        // meaningful assertion.
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn empty_ranking_is_rejected() {
        assert!(ShiftAndKeepBestHalf
            .next_points_from(&BTreeSet::new())
            .is_err());
    }
}
