use minesweeper_kb as ms;
use ms::Oracle;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wasm_bindgen::prelude::*;

// Cell codes returned by `get_cells`.
const HIDDEN: i8 = -1;
const FLAGGED: i8 = -2;
const MINE: i8 = -3;

fn load(bts: &[u8]) -> Result<ms::Game, String> {
    ms::Game::from_bytes(bts).map_err(|e| e.to_string())
}

fn save(game: &ms::Game) -> Result<Vec<u8>, String> {
    game.to_bytes().map_err(|e| e.to_string())
}

/// Appends the game status byte: 0 playing, 1 lost, 2 won.
fn save_with_status(game: &ms::Game) -> Result<Vec<u8>, String> {
    let mut xs = save(game)?;
    xs.push(match game.state() {
        ms::GameState::Playing => 0,
        ms::GameState::Lost => 1,
        ms::GameState::Won => 2,
    });
    Ok(xs)
}

#[wasm_bindgen]
pub fn create_game(height: u8, width: u8, mines: u16, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut rng = StdRng::seed_from_u64(seed);
    let game = ms::Game::random(height as usize, width as usize, mines as usize, &mut rng)
        .map_err(|e| e.to_string())?;
    save(&game)
}

#[wasm_bindgen]
pub fn choose_cell(bts: Vec<u8>, row: usize, col: usize) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = load(&bts)?;
    game.reveal(ms::Point::new(row, col))
        .map_err(|e| e.to_string())?;
    save_with_status(&game)
}

/// Lets the bot make one move: a proven-safe cell if there is one, otherwise
/// a guess drawn from `seed`.
#[wasm_bindgen]
pub fn auto_step(bts: Vec<u8>, seed: u64) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let mut game = load(&bts)?;
    let mut rng = StdRng::seed_from_u64(seed);
    game.step(&mut rng).map_err(|e| e.to_string())?;
    save_with_status(&game)
}

/// `[row, col]` of a proven-safe hidden cell, or empty when none is known.
#[wasm_bindgen]
pub fn hint(bts: Vec<u8>) -> Result<Vec<u32>, String> {
    console_error_panic_hook::set_once();

    let game = load(&bts)?;
    Ok(game
        .knowledge()
        .query_safe_move()
        .map(|point| vec![point.row as u32, point.col as u32])
        .unwrap_or_default())
}

#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let game = load(&bts)?;
    let knowledge = game.knowledge();
    let lost = game.state() == ms::GameState::Lost;
    Ok(ms::all_points(knowledge.height(), knowledge.width())
        .map(|point| match game.revealed_count(point) {
            Some(n) => n as i8,
            None if knowledge.known_mine().contains(&point) => FLAGGED,
            None if lost && game.minefield().is_mine(point) => MINE,
            None => HIDDEN,
        })
        .collect())
}
