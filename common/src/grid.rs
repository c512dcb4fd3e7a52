use std::fmt;

use itertools::iproduct;

/// A coordinate on the board, addressed by row then column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn new(row: usize, col: usize) -> Self {
        Point { row, col }
    }

    pub fn in_bounds(self, height: usize, width: usize) -> bool {
        self.row < height && self.col < width
    }

    /// All in-bounds cells touching this one, excluding the cell itself.
    /// Handles board edges and corners.
    pub fn neighbors(self, height: usize, width: usize) -> impl Iterator<Item = Point> {
        (-1isize..=1).flat_map(move |dr| {
            (-1isize..=1).filter_map(move |dc| {
                if dr == 0 && dc == 0 {
                    return None;
                }

                let row = self.row.checked_add_signed(dr)?;
                let col = self.col.checked_add_signed(dc)?;
                let neighbor = Point { row, col };
                neighbor.in_bounds(height, width).then_some(neighbor)
            })
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Every cell of a `height × width` board in row-major order.
pub fn all_points(height: usize, width: usize) -> impl Iterator<Item = Point> {
    iproduct!(0..height, 0..width).map(|(row, col)| Point { row, col })
}
