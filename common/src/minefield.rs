use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::index;

use crate::error::{Result, SweeperError};
use crate::grid::Point;

/// Ground truth about the board. The player only learns from it through
/// `neighbor_count` on cells it reveals.
pub trait Oracle {
    fn height(&self) -> usize;

    fn width(&self) -> usize;

    fn is_mine(&self, point: Point) -> bool;

    /// Mines among the in-bounds neighbours of `point`, not counting the
    /// cell itself.
    fn neighbor_count(&self, point: Point) -> u8;

    fn in_bounds(&self, point: Point) -> bool {
        point.in_bounds(self.height(), self.width())
    }
}

/// A board with a fixed set of mines.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Minefield {
    height: usize,
    width: usize,
    mines: BTreeSet<Point>,
}

impl Minefield {
    /// Places `mines` mines uniformly at random. At least one cell must stay
    /// clear.
    pub fn random<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let cells = height * width;
        if mines >= cells {
            return Err(SweeperError::TooManyMines { mines, cells });
        }

        let mines = index::sample(rng, cells, mines)
            .into_iter()
            .map(|i| Point::new(i / width, i % width))
            .collect();
        Ok(Minefield {
            height,
            width,
            mines,
        })
    }

    /// A board with mines exactly at the given cells.
    pub fn with_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Point>,
    ) -> Result<Self> {
        let mines: BTreeSet<Point> = mines.into_iter().collect();
        if let Some(&outside) = mines.iter().find(|p| !p.in_bounds(height, width)) {
            return Err(SweeperError::OutOfBounds(outside));
        }
        Ok(Minefield {
            height,
            width,
            mines,
        })
    }

    pub fn mines(&self) -> &BTreeSet<Point> {
        &self.mines
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    pub fn safe_count(&self) -> usize {
        self.height * self.width - self.mines.len()
    }
}

impl Oracle for Minefield {
    fn height(&self) -> usize {
        self.height
    }

    fn width(&self) -> usize {
        self.width
    }

    fn is_mine(&self, point: Point) -> bool {
        self.mines.contains(&point)
    }

    fn neighbor_count(&self, point: Point) -> u8 {
        point
            .neighbors(self.height, self.width)
            .filter(|neighbor| self.mines.contains(neighbor))
            .count() as u8
    }
}
