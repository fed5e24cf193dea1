//! Line-based console version of the game: one command per line on stdin.

use anyhow::{Context, Result};
use clap::Parser;
use sokoban_core::{
    config::GameConfig,
    level::load_level,
    puzzle::PuzzleState,
};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Fancy Sokoban (console)", long_about = None)]
struct Args {
    /// Maze file to load
    #[arg(short, long, value_name = "MAP_FILE", default_value = "maps/maze1.txt")]
    map: PathBuf,

    /// TOML file overriding coin value and shop prices
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = GameConfig::load_or_default(args.config.as_deref())?;
    let level = load_level(&args.map, &config)
        .with_context(|| format!("Failed to load maze {}", args.map.display()))?;
    let mut puzzle = PuzzleState::with_config(level, &config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    play(&mut puzzle, stdin.lock(), &mut stdout)
}

fn display(puzzle: &PuzzleState, out: &mut impl Write) -> io::Result<()> {
    for row in puzzle.snapshot().board_rows() {
        writeln!(out, "{row}")?;
    }
    let player = puzzle.player();
    writeln!(
        out,
        "Moves remaining: {}, strength: {}",
        player.moves_remaining, player.strength
    )?;
    writeln!(out)
}

/// Runs the read-apply-check loop until the game ends, the player quits or
/// input runs out.
fn play(puzzle: &mut PuzzleState, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    let mut lines = input.lines();
    loop {
        if puzzle.has_won() {
            display(puzzle, out)?;
            writeln!(out, "You won!")?;
            info!("Level won");
            return Ok(());
        }
        if puzzle.has_lost() {
            writeln!(out, "You lost!")?;
            info!("Level lost");
            return Ok(());
        }

        display(puzzle, out)?;
        write!(out, "Enter move: ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.context("Failed to read command")?;
        match line.trim() {
            "q" => return Ok(()),
            "u" => {
                if let Err(err) = puzzle.undo() {
                    writeln!(out, "{err}\n")?;
                }
            }
            token => {
                if puzzle.attempt_move_token(token).is_err() {
                    writeln!(out, "Invalid move\n")?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokoban_core::level::parse_level;

    fn run(level: &str, commands: &str) -> (PuzzleState, String) {
        let level = parse_level(level, &GameConfig::default()).unwrap();
        let mut puzzle = PuzzleState::new(level).unwrap();
        let mut out = Vec::new();
        play(&mut puzzle, commands.as_bytes(), &mut out).unwrap();
        (puzzle, String::from_utf8(out).unwrap())
    }

    #[test]
    fn winning_run_prints_victory() {
        let (puzzle, out) = run("1 10\nP1G\n", "d\n");
        assert!(puzzle.has_won());
        assert!(out.ends_with("You won!\n"));
    }

    #[test]
    fn bad_command_is_reported_and_ignored() {
        let (puzzle, out) = run("1 10\nP G\n", "x\nq\n");
        assert!(out.contains("Invalid move"));
        assert_eq!(puzzle.player().moves_remaining, 10);
    }

    #[test]
    fn undo_without_history_does_not_crash() {
        let (puzzle, out) = run("1 10\nP G\n", "u\nd\nu\nq\n");
        assert!(out.contains("Nothing to undo"));
        assert_eq!(puzzle.player().moves_remaining, 10);
    }

    #[test]
    fn running_out_of_moves_loses() {
        let (puzzle, out) = run("1 1\nP  G\n", "d\n");
        assert!(puzzle.has_lost());
        assert!(out.ends_with("You lost!\n"));
    }

    #[test]
    fn end_of_input_stops_the_loop() {
        let (_, out) = run("1 10\nP G\n", "");
        assert!(out.ends_with("Enter move: "));
    }
}
