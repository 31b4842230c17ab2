use std::thread;
use std::time::Duration;

use clap::Parser;
use minesweeper_ai::{Game, GameState, MoveKind, Turn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

/// Lets the logic player loose on randomly generated boards.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value_t = 8)]
    height: usize,

    #[arg(long, default_value_t = 8)]
    width: usize,

    #[arg(short, long, default_value_t = 8)]
    mines: usize,

    #[arg(long, help = "Random seed for reproducible boards and guesses")]
    seed: Option<u64>,

    #[arg(short = 'n', long, default_value_t = 1)]
    games: usize,

    #[arg(long, help = "Pause between moves, in milliseconds", default_value_t = 0)]
    delay_ms: u64,

    #[arg(short, long, help = "Only print the final summary", default_value_t = false)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    if !args.quiet {
        println!("--- Minesweeper Logic Bot ---");
        println!("Strategy: Probe cells proven safe, guess randomly otherwise.");
    }

    let (mut won, mut lost, mut stuck) = (0, 0, 0);
    for round in 1..=args.games {
        let mut game = Game::new(args.height, args.width, args.mines, &mut rng)?;

        if !args.quiet {
            println!("\n=== Game {round} of {} ===", args.games);
            println!("Mines:\n{}", game.board());
        }

        let mut move_count = 0;
        while game.state() == GameState::Playing {
            let Some(turn) = game.step(&mut rng)? else {
                break;
            };
            move_count += 1;

            if !args.quiet {
                println!("\n--- Move #{move_count} ---");
                print_turn(&turn);
                print!("{game}");
            }

            if args.delay_ms > 0 {
                thread::sleep(Duration::from_millis(args.delay_ms));
            }
        }

        match game.state() {
            GameState::Won => won += 1,
            GameState::Lost => lost += 1,
            GameState::Stuck | GameState::Playing => stuck += 1,
        }

        if !args.quiet {
            println!("\n--- Game Over ---");
            match game.state() {
                GameState::Won => println!("Result: The bot flagged every mine and won!"),
                GameState::Lost => println!("Result: The bot hit a mine and lost."),
                GameState::Stuck | GameState::Playing => {
                    println!("Result: The bot ran out of moves.")
                }
            }
        }
    }

    println!(
        "\nPlayed {} game(s) on {}x{} with {} mines: {won} won, {lost} lost, {stuck} stuck.",
        args.games, args.height, args.width, args.mines
    );

    Ok(())
}

fn print_turn(turn: &Turn) {
    let how = match turn.kind {
        Some(MoveKind::Safe) => "Logic found a guaranteed safe cell.",
        Some(MoveKind::Random) => "No logically safe move found. Making a random guess...",
        None => "Revealing a chosen cell.",
    };
    println!("{how}");
    match turn.revealed {
        Some(count) => println!("Bot reveals {} and sees {count}.", turn.cell),
        None => println!("Bot reveals {} and hits a mine!", turn.cell),
    }
}
