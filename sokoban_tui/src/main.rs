use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use sokoban_core::{
    Direction, Entity, PotionKind,
    config::GameConfig,
    level::{load_level, save_level},
    puzzle::{PuzzleState, Tile},
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Extra Fancy Sokoban", long_about = None)]
struct Args {
    /// Maze file to load
    #[arg(short, long, value_name = "MAP_FILE", default_value = "maps/coin_maze.txt")]
    map: PathBuf,

    /// TOML file overriding coin value and shop prices
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// File used by the save ('k') and load ('l') keys
    #[arg(short, long, value_name = "SAVE_FILE", default_value = "save.txt")]
    save: PathBuf,

    /// Log file (the terminal is busy with the game)
    #[arg(long, value_name = "LOG_FILE", default_value = "sokoban.log")]
    log: PathBuf,
}

/// Game over state waiting for a "play again?" answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Won,
    Lost,
}

struct App {
    puzzle: PuzzleState,
    config: GameConfig,
    save_path: PathBuf,
    /// Feedback for the last action.
    status: String,
    outcome: Option<Outcome>,
    should_quit: bool,
}

impl App {
    fn new(puzzle: PuzzleState, config: GameConfig, save_path: PathBuf) -> Self {
        App {
            puzzle,
            config,
            save_path,
            status: String::from("Good luck!"),
            outcome: None,
            should_quit: false,
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        if self.outcome.is_some() {
            match code {
                KeyCode::Char('y') => {
                    self.puzzle.reset();
                    self.outcome = None;
                    self.status = String::from("Level restarted.");
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => self.quit(),
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Char('u') => match self.puzzle.undo() {
                Ok(_) => self.status = String::from("Undone."),
                Err(err) => self.status = err.to_string(),
            },
            KeyCode::Char('1') => self.buy(PotionKind::Strength),
            KeyCode::Char('2') => self.buy(PotionKind::Move),
            KeyCode::Char('3') => self.buy(PotionKind::Fancy),
            KeyCode::Char('k') => self.save(),
            KeyCode::Char('l') => self.load(),
            other => {
                if let Some(direction) = direction_for(other) {
                    self.step(direction);
                }
            }
        }
    }

    fn step(&mut self, direction: Direction) {
        match self.puzzle.attempt_move(direction) {
            Ok(_) => self.status.clear(),
            Err(err) => self.status = format!("Invalid move: {err}"),
        }
        self.refresh_outcome();
    }

    /// Switches to the play-again prompt once the puzzle is won or lost.
    fn refresh_outcome(&mut self) {
        self.outcome = if self.puzzle.has_won() {
            info!("Level won");
            Some(Outcome::Won)
        } else if self.puzzle.has_lost() {
            info!("Level lost");
            Some(Outcome::Lost)
        } else {
            None
        };
    }

    fn buy(&mut self, kind: PotionKind) {
        self.status = match self.puzzle.attempt_purchase(kind) {
            Ok(price) => format!("Bought {} for ${price}.", kind.name()),
            Err(err) => err.to_string(),
        };
    }

    fn save(&mut self) {
        self.status = match save_level(&self.save_path, &self.puzzle.snapshot()) {
            Ok(()) => format!("Saved to {}.", self.save_path.display()),
            Err(err) => {
                warn!(%err, "Save failed");
                err.to_string()
            }
        };
    }

    fn load(&mut self) {
        let loaded = load_level(&self.save_path, &self.config)
            .and_then(|level| PuzzleState::with_config(level, &self.config));
        self.status = match loaded {
            Ok(puzzle) => {
                self.puzzle = puzzle;
                self.refresh_outcome();
                format!("Loaded {}.", self.save_path.display())
            }
            Err(err) => {
                warn!(%err, "Load failed");
                err.to_string()
            }
        };
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        KeyCode::Char(c) => Direction::from_token(c),
        _ => None,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log)?;

    let config = GameConfig::load_or_default(args.config.as_deref())?;
    let level = load_level(&args.map, &config)
        .with_context(|| format!("Failed to load maze {}", args.map.display()))?;
    let puzzle = PuzzleState::with_config(level, &config)?;
    let mut app = App::new(puzzle, config, args.save);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    result
}

/// Sends tracing output to a file without ANSI codes.
fn init_tracing(path: &Path) -> Result<()> {
    let log_file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    info!("Starting Extra Fancy Sokoban");
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop: draw, then block on the next key press.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key.code);
            }
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // map and shop
            Constraint::Length(4), // stats
            Constraint::Length(3), // status/help
        ])
        .split(frame.area());
    let top = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[0]);

    render_map(frame, top[0], &app.puzzle);
    render_shop(frame, top[1], &app.puzzle);
    render_stats(frame, rows[1], &app.puzzle);

    let footer = match app.outcome {
        Some(Outcome::Won) => Line::from("You won! Play again? (y/n)").green().bold(),
        Some(Outcome::Lost) => Line::from("You lost! Play again? (y/n)").red().bold(),
        None => Line::from(vec![
            Span::raw(app.status.clone()),
            Span::raw("  |  wasd/arrows move, u undo, 1-3 buy, k save, l load, q quit").dark_gray(),
        ]),
    };
    let help_text = Paragraph::new(footer)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, rows[2]);
}

/// Renders the player's moves, strength and money.
fn render_stats(frame: &mut Frame, area: Rect, puzzle: &PuzzleState) {
    let player = puzzle.player();
    let stats = Line::from(vec![
        Span::raw("Moves remaining: "),
        Span::styled(player.moves_remaining.to_string(), Style::default().bold()),
        Span::raw("   Strength: "),
        Span::styled(player.strength.to_string(), Style::default().bold()),
        Span::raw("   Money: "),
        Span::styled(format!("${}", player.money), Style::default().bold()),
    ]);
    let widget = Paragraph::new(stats)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Player Stats"));
    frame.render_widget(widget, area);
}

/// Renders the potions for sale.
fn render_shop(frame: &mut Frame, area: Rect, puzzle: &PuzzleState) {
    let money = puzzle.player().money;
    let items: Vec<ListItem> = puzzle
        .shop_items()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let style = if money >= item.price {
                potion_style(item.kind)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::from(Line::from(Span::styled(
                format!("[{}] {}: ${}", index + 1, item.kind.name(), item.price),
                style,
            )))
        })
        .collect();
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Shop"));
    frame.render_widget(widget, area);
}

fn potion_style(kind: PotionKind) -> Style {
    match kind {
        PotionKind::Strength => Style::default().fg(Color::Red),
        PotionKind::Move => Style::default().fg(Color::Blue),
        PotionKind::Fancy => Style::default().fg(Color::Magenta),
    }
}

fn entity_span(entity: Entity) -> Span<'static> {
    match entity {
        Entity::Crate { strength } => Span::styled(
            strength.to_string(),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        Entity::Potion(kind) => Span::styled(kind.symbol().to_string(), potion_style(kind)),
        Entity::Coin { .. } => Span::styled("$", Style::default().fg(Color::LightYellow)),
    }
}

fn tile_span(tile: Tile) -> Span<'static> {
    match tile {
        Tile::Floor => Span::raw(" "),
        Tile::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
        Tile::Goal { filled: false } => Span::styled("o", Style::default().fg(Color::Green)),
        Tile::Goal { filled: true } => Span::styled("*", Style::default().fg(Color::Green).bold()),
    }
}

/// Renders the maze: entities over the player over tiles.
fn render_map(frame: &mut Frame, area: Rect, puzzle: &PuzzleState) {
    let tiles = puzzle.tiles();
    let entities = puzzle.entities();
    let player_position = puzzle.player_position();

    let mut lines: Vec<Line> = vec![Line::default(); tiles.rows()];
    for (position, &tile) in tiles.enumerate() {
        let span = if let Some(&entity) = entities.get(&position) {
            entity_span(entity)
        } else if position == player_position {
            Span::styled("@", Style::default().fg(Color::Red).bold())
        } else {
            tile_span(tile)
        };
        lines[position.row].push_span(span);
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Extra Fancy Sokoban").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
