use std::collections::BTreeSet;

use itertools::Itertools;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, trace};

use crate::constraint::Constraint;
use crate::error::{Result, SweeperError};
use crate::grid::{Point, all_points};

/// Which side of the board a proven cell lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fact {
    Safe,
    Mine,
}

/// What a single observation taught the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inference {
    /// Inference passes run before the fixpoint was reached, the final
    /// no-change pass included.
    pub passes: usize,
    /// Cells newly proven safe, in the order they were proven. The observed
    /// cell itself is not listed.
    pub safes: Vec<Point>,
    /// Cells newly proven to be mines, in the order they were proven.
    pub mines: Vec<Point>,
}

/// Everything the player knows about one game.
///
/// The only mutators are [`KnowledgeBase::record_observation`] and the two
/// `mark_*` methods; each runs inference to a fixpoint before returning.
/// After any error the knowledge base is inconsistent and should be dropped
/// along with the game it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeBase {
    height: usize,
    width: usize,
    /// Cells the player has revealed.
    moves_made: BTreeSet<Point>,
    known_safe: BTreeSet<Point>,
    known_mine: BTreeSet<Point>,
    /// Active statements, never empty and never duplicated.
    constraints: Vec<Constraint>,
}

impl KnowledgeBase {
    pub fn new(height: usize, width: usize) -> Self {
        KnowledgeBase {
            height,
            width,
            moves_made: BTreeSet::new(),
            known_safe: BTreeSet::new(),
            known_mine: BTreeSet::new(),
            constraints: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn moves_made(&self) -> &BTreeSet<Point> {
        &self.moves_made
    }

    pub fn known_safe(&self) -> &BTreeSet<Point> {
        &self.known_safe
    }

    pub fn known_mine(&self) -> &BTreeSet<Point> {
        &self.known_mine
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Whether the cell has been proven either safe or a mine.
    pub fn is_known(&self, point: Point) -> bool {
        self.known_safe.contains(&point) || self.known_mine.contains(&point)
    }

    /// Called when the board reports that the safe cell `point` has `count`
    /// mines among its neighbours.
    ///
    /// Records the move, marks the cell safe, adds a constraint over the
    /// neighbours that are still unresolved and then infers until nothing
    /// changes.
    pub fn record_observation(&mut self, point: Point, count: u8) -> Result<Inference> {
        self.check_bounds(point)?;
        debug!(%point, count, "recording observation");

        let mut inference = Inference::default();
        self.moves_made.insert(point);
        self.assert_fact(point, Fact::Safe)?;

        // Known mines come off the count, known safes simply drop out.
        let mut adjacent_mines = 0;
        let mut unresolved = BTreeSet::new();
        for neighbor in point.neighbors(self.height, self.width) {
            if self.known_mine.contains(&neighbor) {
                adjacent_mines += 1;
            } else if !self.known_safe.contains(&neighbor) {
                unresolved.insert(neighbor);
            }
        }

        let count = usize::from(count);
        let remaining =
            count
                .checked_sub(adjacent_mines)
                .ok_or(SweeperError::InvalidConstraint {
                    cells: unresolved.len(),
                    count: count as isize - adjacent_mines as isize,
                })?;
        self.insert_constraint(Constraint::new(unresolved, remaining)?);

        self.settle(&mut inference)?;
        debug!(
            %point,
            passes = inference.passes,
            safes = inference.safes.len(),
            mines = inference.mines.len(),
            constraints = self.constraints.len(),
            "observation settled"
        );
        Ok(inference)
    }

    /// Marks a cell as a mine and updates every constraint that mentions it.
    pub fn mark_mine(&mut self, point: Point) -> Result<()> {
        self.mark(point, Fact::Mine)
    }

    /// Marks a cell as safe and updates every constraint that mentions it.
    pub fn mark_safe(&mut self, point: Point) -> Result<()> {
        self.mark(point, Fact::Safe)
    }

    /// A cell proven safe that has not been revealed yet, if any.
    pub fn query_safe_move(&self) -> Option<Point> {
        self.known_safe.difference(&self.moves_made).next().copied()
    }

    /// A uniformly chosen cell that has not been revealed and is not known to
    /// be a mine, if any.
    pub fn query_random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Point> {
        let candidates: Vec<Point> = all_points(self.height, self.width)
            .filter(|point| !self.moves_made.contains(point) && !self.known_mine.contains(point))
            .collect();
        candidates.choose(rng).copied()
    }

    fn check_bounds(&self, point: Point) -> Result<()> {
        if point.in_bounds(self.height, self.width) {
            Ok(())
        } else {
            Err(SweeperError::OutOfBounds(point))
        }
    }

    fn mark(&mut self, point: Point, fact: Fact) -> Result<()> {
        self.check_bounds(point)?;
        self.assert_fact(point, fact)?;
        self.settle(&mut Inference::default())
    }

    /// Adds the fact and pushes it into every constraint. Returns whether the
    /// fact was new.
    fn assert_fact(&mut self, point: Point, fact: Fact) -> Result<bool> {
        let (target, opposite) = match fact {
            Fact::Safe => (&mut self.known_safe, &self.known_mine),
            Fact::Mine => (&mut self.known_mine, &self.known_safe),
        };
        if opposite.contains(&point) {
            return Err(SweeperError::KnowledgeContradiction(point));
        }
        if !target.insert(point) {
            return Ok(false);
        }

        debug!(%point, ?fact, "cell proven");
        self.propagate(point, fact)?;
        Ok(true)
    }

    /// Replaces every constraint by its reduction against the new fact,
    /// dropping the ones left empty and any duplicates this creates.
    fn propagate(&mut self, point: Point, fact: Fact) -> Result<()> {
        let reduced = std::mem::take(&mut self.constraints)
            .into_iter()
            .map(|constraint| match fact {
                Fact::Mine => constraint.reduce_by_mine(point),
                Fact::Safe => Ok(constraint.reduce_by_safe(point)),
            })
            .collect::<Result<Vec<_>>>()?;

        self.constraints = reduced
            .into_iter()
            .filter(|constraint| !constraint.is_empty())
            .unique()
            .collect();
        Ok(())
    }

    fn insert_constraint(&mut self, constraint: Constraint) -> bool {
        if constraint.is_empty() || self.constraints.contains(&constraint) {
            return false;
        }
        trace!(%constraint, "adding constraint");
        self.constraints.push(constraint);
        true
    }

    /// Runs extraction and subset resolution until a full pass changes
    /// nothing.
    ///
    /// Every pass that changes something strictly shrinks the total number of
    /// cells held across all constraints, so the loop is bounded by the board
    /// size.
    fn settle(&mut self, inference: &mut Inference) -> Result<()> {
        loop {
            inference.passes += 1;
            let extracted = self.extract_facts(inference)?;
            let resolved = self.resolve_subsets()?;
            trace!(
                pass = inference.passes,
                extracted,
                resolved,
                constraints = self.constraints.len(),
                "inference pass"
            );
            if !extracted && !resolved {
                return Ok(());
            }
        }
    }

    /// Marks every cell that a single constraint already decides.
    fn extract_facts(&mut self, inference: &mut Inference) -> Result<bool> {
        let facts: Vec<(Point, Fact)> = self
            .constraints
            .iter()
            .flat_map(|constraint| {
                let mines = constraint.known_mines().into_iter().map(|p| (p, Fact::Mine));
                let safes = constraint.known_safes().into_iter().map(|p| (p, Fact::Safe));
                mines.chain(safes)
            })
            .collect();

        let mut changed = false;
        for (point, fact) in facts {
            if self.assert_fact(point, fact)? {
                changed = true;
                match fact {
                    Fact::Safe => inference.safes.push(point),
                    Fact::Mine => inference.mines.push(point),
                }
            }
        }
        Ok(changed)
    }

    /// Replaces each superset `B` of some constraint `A` with `B - A`.
    fn resolve_subsets(&mut self) -> Result<bool> {
        let mut changed = false;
        while let Some((subset, superset)) = self.find_subset_pair() {
            let derived = self.constraints[subset].resolve_against(&self.constraints[superset])?;
            let superseded = self.constraints.remove(superset);
            trace!(%superseded, "constraint superseded");
            if let Some(derived) = derived {
                self.insert_constraint(derived);
            }
            changed = true;
        }
        Ok(changed)
    }

    fn find_subset_pair(&self) -> Option<(usize, usize)> {
        let len = self.constraints.len();
        (0..len).cartesian_product(0..len).find(|&(a, b)| {
            a != b && self.constraints[a].is_strict_subset_of(&self.constraints[b])
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn p(row: usize, col: usize) -> Point {
        Point::new(row, col)
    }

    #[test]
    fn test_zero_observation_marks_neighbors_safe() {
        let mut kb = KnowledgeBase::new(3, 3);
        let inference = kb.record_observation(p(0, 0), 0).unwrap();

        assert_eq!(kb.moves_made(), &BTreeSet::from([p(0, 0)]));
        assert_eq!(
            kb.known_safe(),
            &BTreeSet::from([p(0, 0), p(0, 1), p(1, 0), p(1, 1)])
        );
        assert!(kb.known_mine().is_empty());
        assert!(kb.constraints().is_empty());
        assert_eq!(inference.safes, vec![p(0, 1), p(1, 0), p(1, 1)]);
        assert!(inference.mines.is_empty());
    }

    #[test]
    fn test_observation_subtracts_known_mines() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(0, 1)).unwrap();

        // One mine is already accounted for, so the rest of the centre's
        // neighbourhood is clear.
        kb.record_observation(p(1, 1), 1).unwrap();

        assert_eq!(kb.known_mine(), &BTreeSet::from([p(0, 1)]));
        assert_eq!(kb.known_safe().len(), 8);
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn test_subset_resolution_proves_safes() {
        // Mine at (1, 0) on a 2x3 board.
        let mut kb = KnowledgeBase::new(2, 3);
        kb.record_observation(p(0, 0), 1).unwrap();
        assert_eq!(
            kb.constraints(),
            &[Constraint::new([p(0, 1), p(1, 0), p(1, 1)], 1).unwrap()]
        );

        // {(1,0),(1,1)} = 1 is a strict subset of
        // {(0,2),(1,0),(1,1),(1,2)} = 1, leaving {(0,2),(1,2)} = 0.
        let inference = kb.record_observation(p(0, 1), 1).unwrap();

        assert_eq!(inference.safes, vec![p(0, 2), p(1, 2)]);
        assert!(inference.mines.is_empty());
        assert!(kb.known_safe().contains(&p(0, 2)));
        assert!(kb.known_safe().contains(&p(1, 2)));
        assert_eq!(
            kb.constraints(),
            &[Constraint::new([p(1, 0), p(1, 1)], 1).unwrap()]
        );
        assert_eq!(kb.query_safe_move(), Some(p(0, 2)));
    }

    #[test]
    fn test_single_cell_constraint_marks_mine() {
        let mut kb = KnowledgeBase::new(1, 2);
        let inference = kb.record_observation(p(0, 0), 1).unwrap();

        assert_eq!(inference.mines, vec![p(0, 1)]);
        assert_eq!(kb.known_mine(), &BTreeSet::from([p(0, 1)]));
        assert_eq!(kb.query_safe_move(), None);

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(kb.query_random_move(&mut rng), None);
    }

    #[test]
    fn test_out_of_bounds_observation() {
        let mut kb = KnowledgeBase::new(2, 2);
        assert_eq!(
            kb.record_observation(p(2, 0), 0),
            Err(SweeperError::OutOfBounds(p(2, 0)))
        );
        assert_eq!(kb.mark_safe(p(0, 9)), Err(SweeperError::OutOfBounds(p(0, 9))));
        assert!(kb.moves_made().is_empty());
    }

    #[test]
    fn test_count_above_neighbors_is_invalid() {
        let mut kb = KnowledgeBase::new(3, 3);
        assert_eq!(
            kb.record_observation(p(0, 0), 4),
            Err(SweeperError::InvalidConstraint { cells: 3, count: 4 })
        );
    }

    #[test]
    fn test_count_below_known_mines_is_invalid() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(0, 1)).unwrap();
        kb.mark_mine(p(1, 0)).unwrap();

        let err = kb.record_observation(p(0, 0), 1).unwrap_err();
        assert_eq!(err, SweeperError::InvalidConstraint { cells: 1, count: -1 });
    }

    #[test]
    fn test_contradictions_are_fatal() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.mark_mine(p(2, 2)).unwrap();
        assert_eq!(
            kb.mark_safe(p(2, 2)),
            Err(SweeperError::KnowledgeContradiction(p(2, 2)))
        );

        // Revealing a cell already proven to be a mine
        assert_eq!(
            kb.record_observation(p(2, 2), 0),
            Err(SweeperError::KnowledgeContradiction(p(2, 2)))
        );

        kb.mark_safe(p(0, 0)).unwrap();
        assert_eq!(
            kb.mark_mine(p(0, 0)),
            Err(SweeperError::KnowledgeContradiction(p(0, 0)))
        );
    }

    #[test]
    fn test_conflicting_observations_surface_an_error() {
        // (0,0) says its only unknown neighbour is a mine, (0,2) says the
        // same cell is clear.
        let mut kb = KnowledgeBase::new(1, 3);
        kb.record_observation(p(0, 0), 1).unwrap();
        assert!(kb.record_observation(p(0, 2), 0).is_err());
    }

    #[test]
    fn test_marks_are_idempotent() {
        let mut kb = KnowledgeBase::new(4, 4);
        kb.record_observation(p(0, 0), 1).unwrap();

        let mut once = kb.clone();
        once.mark_safe(p(1, 1)).unwrap();
        once.mark_mine(p(2, 2)).unwrap();

        let mut twice = kb.clone();
        twice.mark_safe(p(1, 1)).unwrap();
        twice.mark_safe(p(1, 1)).unwrap();
        twice.mark_mine(p(2, 2)).unwrap();
        twice.mark_mine(p(2, 2)).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_mark_runs_inference() {
        let mut kb = KnowledgeBase::new(1, 3);
        kb.record_observation(p(0, 1), 1).unwrap();
        assert_eq!(
            kb.constraints(),
            &[Constraint::new([p(0, 0), p(0, 2)], 1).unwrap()]
        );

        kb.mark_safe(p(0, 0)).unwrap();
        assert_eq!(kb.known_mine(), &BTreeSet::from([p(0, 2)]));
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn test_repeated_observation_is_harmless() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.record_observation(p(1, 1), 2).unwrap();
        let before = kb.clone();

        kb.record_observation(p(1, 1), 2).unwrap();
        assert_eq!(kb, before);
    }

    #[test]
    fn test_random_move_skips_moves_and_mines() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.record_observation(p(1, 1), 1).unwrap();
        kb.mark_mine(p(0, 0)).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let point = kb.query_random_move(&mut rng).unwrap();
            assert!(point.in_bounds(3, 3));
            assert_ne!(point, p(1, 1));
            assert_ne!(point, p(0, 0));
        }
    }

    #[test]
    fn test_random_move_is_reproducible() {
        let mut kb = KnowledgeBase::new(8, 8);
        kb.record_observation(p(4, 4), 3).unwrap();

        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| kb.query_random_move(&mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
    }
}
