use thiserror::Error;

use crate::grid::Point;

/// Errors raised by the knowledge base and the game driver.
///
/// Every variant is fatal for the session it came from: the engine never
/// clamps a count or picks a side of a contradiction to keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweeperError {
    /// A constraint would claim more mines than it has cells, or fewer than
    /// zero. The oracle and the knowledge base have diverged.
    #[error("invalid constraint: {count} mines among {cells} cells")]
    InvalidConstraint { cells: usize, count: isize },

    /// A cell was asserted both safe and a mine.
    #[error("knowledge contradiction at {0}: cell is both safe and a mine")]
    KnowledgeContradiction(Point),

    /// A cell outside the board was referenced.
    #[error("cell {0} is outside the board")]
    OutOfBounds(Point),

    /// The board cannot hold the requested number of mines.
    #[error("{mines} mines do not fit on a board of {cells} cells")]
    TooManyMines { mines: usize, cells: usize },

    /// A move was attempted after the game ended.
    #[error("game_ended")]
    GameOver,
}

pub type Result<T> = std::result::Result<T, SweeperError>;
