use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::error::{Result, SweeperError};
use crate::grid::Point;

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// A constraint is never edited in place. Every transformation consumes or
/// borrows it and hands back a fresh value, so the knowledge base can replace
/// entries wholesale instead of mutating shared ones.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Constraint {
    cells: BTreeSet<Point>,
    count: usize,
}

impl Constraint {
    /// Builds a constraint, rejecting counts larger than the number of cells.
    pub fn new(cells: impl IntoIterator<Item = Point>, count: usize) -> Result<Self> {
        let cells: BTreeSet<Point> = cells.into_iter().collect();
        if count > cells.len() {
            return Err(SweeperError::InvalidConstraint {
                cells: cells.len(),
                count: count as isize,
            });
        }
        Ok(Constraint { cells, count })
    }

    pub fn cells(&self) -> &BTreeSet<Point> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// An empty constraint carries no information.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.cells.contains(&point)
    }

    /// Every cell is a mine when the count equals the number of cells.
    pub fn known_mines(&self) -> BTreeSet<Point> {
        if self.cells.len() == self.count {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Every cell is safe when the count is zero.
    pub fn known_safes(&self) -> BTreeSet<Point> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Drops a cell known to be a mine, taking one mine off the count.
    pub fn reduce_by_mine(mut self, point: Point) -> Result<Self> {
        if !self.cells.remove(&point) {
            return Ok(self);
        }
        match self.count.checked_sub(1) {
            Some(count) => {
                self.count = count;
                Ok(self)
            }
            None => Err(SweeperError::InvalidConstraint {
                cells: self.cells.len(),
                count: -1,
            }),
        }
    }

    /// Drops a cell known to be safe. The count is untouched.
    pub fn reduce_by_safe(mut self, point: Point) -> Self {
        self.cells.remove(&point);
        self
    }

    /// Proper subset only: two constraints over the same cells do not
    /// resolve against each other.
    pub fn is_strict_subset_of(&self, other: &Constraint) -> bool {
        self.cells.len() < other.cells.len() && self.cells.is_subset(&other.cells)
    }

    /// If `self ⊂ other`, the cells of `other` outside `self` hold exactly
    /// `other.count - self.count` mines.
    ///
    /// Returns `Ok(None)` when `self` is not a strict subset of `other`.
    pub fn resolve_against(&self, other: &Constraint) -> Result<Option<Constraint>> {
        if !self.is_strict_subset_of(other) {
            return Ok(None);
        }

        let cells: BTreeSet<Point> = other.cells.difference(&self.cells).copied().collect();
        match other.count.checked_sub(self.count) {
            Some(count) => Constraint::new(cells, count).map(Some),
            None => Err(SweeperError::InvalidConstraint {
                cells: cells.len(),
                count: other.count as isize - self.count as isize,
            }),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} = {}", self.cells.iter().join(", "), self.count)
    }
}
