use rand::Rng;
use tracing::{debug, info};

use crate::error::{Result, SweeperError};
use crate::grid::Point;
use crate::knowledge::{Inference, KnowledgeBase};
use crate::minefield::{Minefield, Oracle};

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// How the player arrived at a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// The cell is proven safe.
    Safe,
    /// Nothing is proven; the cell was picked at random.
    Guess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub point: Point,
    pub kind: MoveKind,
}

/// One game session: the hidden board, the player's knowledge and the
/// outcome so far.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Game {
    minefield: Minefield,
    knowledge: KnowledgeBase,
    state: GameState,
}

impl Game {
    pub fn new(minefield: Minefield) -> Self {
        let knowledge = KnowledgeBase::new(minefield.height(), minefield.width());
        Game {
            minefield,
            knowledge,
            state: GameState::Playing,
        }
    }

    /// A fresh game on a randomly mined board.
    pub fn random<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Game::new(Minefield::random(height, width, mines, rng)?))
    }

    pub fn from_bytes(bts: &[u8]) -> std::result::Result<Self, bcs::Error> {
        bcs::from_bytes(bts)
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, bcs::Error> {
        bcs::to_bytes(self)
    }

    pub fn minefield(&self) -> &Minefield {
        &self.minefield
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// The number shown on a revealed cell, or `None` while it is hidden.
    pub fn revealed_count(&self, point: Point) -> Option<u8> {
        self.knowledge
            .moves_made()
            .contains(&point)
            .then(|| self.minefield.neighbor_count(point))
    }

    /// Reveals a cell and feeds what it shows to the knowledge base.
    ///
    /// Revealing a cell twice is a no-op.
    pub fn reveal(&mut self, point: Point) -> Result<Inference> {
        if self.state != GameState::Playing {
            return Err(SweeperError::GameOver);
        }
        if !self.minefield.in_bounds(point) {
            return Err(SweeperError::OutOfBounds(point));
        }
        if self.knowledge.moves_made().contains(&point) {
            return Ok(Inference::default());
        }

        if self.minefield.is_mine(point) {
            info!(%point, moves = self.knowledge.moves_made().len(), "hit a mine");
            self.state = GameState::Lost;
            return Ok(Inference::default());
        }

        let count = self.minefield.neighbor_count(point);
        let inference = self.knowledge.record_observation(point, count)?;

        if self.knowledge.moves_made().len() == self.minefield.safe_count() {
            info!(moves = self.knowledge.moves_made().len(), "board cleared");
            self.state = GameState::Won;
        }
        Ok(inference)
    }

    /// Prefers a cell proven safe and guesses otherwise.
    pub fn choose_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Move> {
        if let Some(point) = self.knowledge.query_safe_move() {
            return Some(Move {
                point,
                kind: MoveKind::Safe,
            });
        }
        self.knowledge.query_random_move(rng).map(|point| Move {
            point,
            kind: MoveKind::Guess,
        })
    }

    /// Chooses and makes one move. Returns `None` once the game is over or
    /// nothing is left to reveal.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<Move>> {
        if self.state != GameState::Playing {
            return Ok(None);
        }
        let Some(next) = self.choose_move(rng) else {
            return Ok(None);
        };

        let inference = self.reveal(next.point)?;
        debug!(
            point = %next.point,
            kind = ?next.kind,
            safes = inference.safes.len(),
            mines = inference.mines.len(),
            "move made"
        );
        Ok(Some(next))
    }

    /// Plays until the game is won or lost.
    pub fn play<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<GameState> {
        while self.step(rng)?.is_some() {}
        Ok(self.state)
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
    fn test_game_initialization() {
        let mut rng = StdRng::seed_from_u64(3);
        let game = Game::random(5, 6, 4, &mut rng).unwrap();

        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.minefield().mine_count(), 4);
        assert_eq!(game.knowledge().height(), 5);
        assert_eq!(game.knowledge().width(), 6);
        assert!(game.knowledge().moves_made().is_empty());
    }

    #[test]
    fn test_hitting_mine() {
        let field = Minefield::with_mines(2, 2, [p(1, 1)]).unwrap();
        let mut game = Game::new(field);

        game.reveal(p(1, 1)).unwrap();
        assert_eq!(game.state(), GameState::Lost);
        assert_eq!(game.reveal(p(0, 0)), Err(SweeperError::GameOver));

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(game.step(&mut rng), Ok(None));
    }

    #[test]
    fn test_winning_by_deduction() {
        // A single '1' next to the mine decides the whole 1x3 strip.
        let field = Minefield::with_mines(1, 3, [p(0, 2)]).unwrap();
        let mut game = Game::new(field);

        game.reveal(p(0, 0)).unwrap();
        assert_eq!(game.revealed_count(p(0, 0)), Some(0));
        assert_eq!(game.revealed_count(p(0, 1)), None);

        let mut rng = StdRng::seed_from_u64(0);
        let next = game.step(&mut rng).unwrap();
        assert_eq!(
            next,
            Some(Move {
                point: p(0, 1),
                kind: MoveKind::Safe
            })
        );
        assert_eq!(game.state(), GameState::Won);
        assert!(game.knowledge().known_mine().contains(&p(0, 2)));
    }

    #[test]
    fn test_reveal_twice_is_noop() {
        let field = Minefield::with_mines(3, 3, [p(2, 2)]).unwrap();
        let mut game = Game::new(field);

        game.reveal(p(0, 0)).unwrap();
        let before = game.clone();
        assert_eq!(game.reveal(p(0, 0)), Ok(Inference::default()));
        assert_eq!(game, before);
    }

    #[test]
    fn test_reveal_outside_board() {
        let field = Minefield::with_mines(2, 2, std::iter::empty()).unwrap();
        let mut game = Game::new(field);
        assert_eq!(
            game.reveal(p(0, 5)),
            Err(SweeperError::OutOfBounds(p(0, 5)))
        );
    }

    #[test]
    fn test_play_finishes() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = Game::random(9, 9, 10, &mut rng).unwrap();

        let state = game.play(&mut rng).unwrap();
        assert_ne!(state, GameState::Playing);
        if state == GameState::Won {
            assert_eq!(game.knowledge().moves_made().len(), 71);
        }
    }

    #[test]
    fn test_bytes_roundtrip_mid_game() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = Game::random(6, 6, 5, &mut rng).unwrap();
        game.step(&mut rng).unwrap();

        let restored = Game::from_bytes(&game.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, game);
    }
}
