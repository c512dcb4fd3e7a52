//! Knowledge-base inference for minesweeper.
//!
//! The player's view of a game lives in a [`KnowledgeBase`]: every revealed
//! cell contributes a [`Constraint`] ("exactly N of these cells are mines"),
//! and after each observation the knowledge base derives every cell that is
//! provably safe or provably a mine. A [`Game`] wires it to a hidden
//! [`Minefield`] and plays by taking proven-safe cells first and guessing
//! only when nothing is proven.

pub mod constraint;
pub mod error;
pub mod game;
pub mod grid;
pub mod knowledge;
pub mod minefield;

pub use constraint::Constraint;
pub use error::{Result, SweeperError};
pub use game::{Game, GameState, Move, MoveKind};
pub use grid::{Point, all_points};
pub use knowledge::{Inference, KnowledgeBase};
pub use minefield::{Minefield, Oracle};
