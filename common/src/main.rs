use std::thread;
use std::time::Duration;

use clap::Parser;
use minesweeper_kb::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Autonomous minesweeper bot.
///
/// Reveals cells the knowledge base proves safe and guesses only when
/// nothing is proven.
#[derive(Parser, Debug)]
#[command(name = "sweeper-bot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Board height in rows
    #[arg(long, default_value_t = 10)]
    height: usize,

    /// Board width in columns
    #[arg(long, default_value_t = 10)]
    width: usize,

    /// Number of mines
    #[arg(short, long, default_value_t = 15)]
    mines: usize,

    /// Seed for mine placement and guesses; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Pause between moves, in milliseconds
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Play this many games silently and report the win rate
    #[arg(short, long, default_value_t = 1)]
    games: usize,

    /// Do not print the board
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, "starting");
    let mut rng = StdRng::seed_from_u64(seed);

    if cli.games > 1 {
        return run_batch(&cli, &mut rng);
    }

    // --- 1. Initialization ---
    let mut game = Game::random(cli.height, cli.width, cli.mines, &mut rng)?;

    if !cli.quiet {
        println!("--- Autonomous Minesweeper Bot ---");
        println!("Strategy: Prioritize logically safe moves, guess randomly otherwise.");
        println!("Initial Board:");
        print_board(&game);
    }

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while let Some(next) = game.step(&mut rng)? {
        move_count += 1;
        if cli.quiet {
            continue;
        }

        println!("\n--- Move #{} ---", move_count);
        match next.kind {
            MoveKind::Safe => println!("Logic found a guaranteed safe cell."),
            MoveKind::Guess => println!("No logically safe move found. Making a random guess..."),
        }
        println!("Bot reveals {}...", next.point);
        print_board(&game);

        // Add a delay to make the game watchable
        thread::sleep(Duration::from_millis(cli.delay_ms));
    }

    // --- 3. Final Result ---
    println!("\n--- Game Over ---");
    match game.state() {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Playing => println!("Result: The game ended unexpectedly."),
    }
    Ok(())
}

/// `RUST_LOG` picks the filter, `SWEEPER_LOG_FORMAT=json` switches to
/// machine-readable output.
fn init_tracing() {
    let log_format = std::env::var("SWEEPER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "minesweeper_kb=warn,sweeper_bot=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run_batch(cli: &Cli, rng: &mut StdRng) -> anyhow::Result<()> {
    let mut won = 0;
    for round in 0..cli.games {
        let mut game = Game::random(cli.height, cli.width, cli.mines, rng)?;
        let state = game.play(rng)?;
        tracing::debug!(round, ?state, moves = game.knowledge().moves_made().len(), "game finished");
        if state == GameState::Won {
            won += 1;
        }
    }

    println!(
        "Won {} of {} games ({:.1}%) on {}x{} with {} mines",
        won,
        cli.games,
        100.0 * won as f64 / cli.games as f64,
        cli.height,
        cli.width,
        cli.mines
    );
    Ok(())
}

fn print_board(game: &Game) {
    let knowledge = game.knowledge();

    // Print header
    print!("   ");
    for col in 0..knowledge.width() {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(knowledge.width()));

    // Print rows
    for row in 0..knowledge.height() {
        print!("{:^2}|", row);
        for col in 0..knowledge.width() {
            let point = Point::new(row, col);
            let display = match game.revealed_count(point) {
                Some(n) => format!(" {} ", n),
                None if knowledge.known_mine().contains(&point) => " ⚑ ".to_string(),
                None if game.state() == GameState::Lost && game.minefield().is_mine(point) => {
                    " * ".to_string()
                }
                None => " ■ ".to_string(),
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
