use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    Entity, PotionKind, Position,
    config::GameConfig,
    map::{Grid, GridError},
    puzzle::{Player, Tile},
};

/// Marks the player's starting cell in level text.
pub const PLAYER_SYMBOL: char = 'P';
/// The player standing on an unfilled goal.
pub const PLAYER_ON_GOAL_SYMBOL: char = 'Q';
/// The player standing on a filled goal.
pub const PLAYER_ON_FILLED_GOAL_SYMBOL: char = 'R';

/// Player marker for the tile the player stands on.
fn player_symbol(tile: Tile) -> char {
    match tile {
        Tile::Goal { filled: false } => PLAYER_ON_GOAL_SYMBOL,
        Tile::Goal { filled: true } => PLAYER_ON_FILLED_GOAL_SYMBOL,
        Tile::Floor | Tile::Wall => PLAYER_SYMBOL,
    }
}

/// Tile underneath a player marker, or `None` if `symbol` is not one.
fn tile_under_player(symbol: char) -> Option<Tile> {
    match symbol {
        PLAYER_SYMBOL => Some(Tile::Floor),
        PLAYER_ON_GOAL_SYMBOL => Some(Tile::Goal { filled: false }),
        PLAYER_ON_FILLED_GOAL_SYMBOL => Some(Tile::Goal { filled: true }),
        _ => None,
    }
}

/// Represents errors raised while reading or validating a level.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Failed to access level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Level text is empty")]
    Empty,
    #[error("Invalid stats line '{line}': expected 'strength moves [money]'")]
    BadStats { line: String },
    #[error("Level has no grid rows")]
    NoRows,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map symbol '{symbol}' at {position}")]
    UnknownSymbol { symbol: char, position: Position },
    #[error("No player start ('P', 'Q' or 'R') found in level")]
    MissingPlayer,
    #[error("Multiple player starts found at {first} and {second}")]
    MultiplePlayers { first: Position, second: Position },
    #[error("Level grid is malformed: {0}")]
    Grid(#[from] GridError),
    #[error("Invalid level at {position}: {reason}")]
    Invalid {
        position: Position,
        reason: &'static str,
    },
}

/// A level in load shape: tiles, entities and the player's stats and start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub tiles: Grid<Tile>,
    pub entities: BTreeMap<Position, Entity>,
    pub player: Player,
}

impl Level {
    /// Renders the level in the text format read by [`parse_level`].
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Returns the grid rows as text, without the stats line.
    pub fn board_rows(&self) -> Vec<String> {
        let mut rows = vec![String::with_capacity(self.tiles.cols()); self.tiles.rows()];
        for (position, &tile) in self.tiles.enumerate() {
            rows[position.row].push(self.symbol_at(position, tile));
        }
        rows
    }

    /// Entity first, then the player, then the tile underneath.
    fn symbol_at(&self, position: Position, tile: Tile) -> char {
        if let Some(entity) = self.entities.get(&position) {
            entity.symbol()
        } else if position == self.player.position {
            player_symbol(tile)
        } else {
            tile.symbol()
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}",
            self.player.strength, self.player.moves_remaining, self.player.money
        )?;
        for row in self.board_rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

fn parse_stats(line: &str) -> Result<(u32, u32, u32), LevelError> {
    let bad = || LevelError::BadStats {
        line: line.to_string(),
    };
    let numbers = line
        .split_whitespace()
        .map(|token| token.parse::<u32>().map_err(|_| bad()))
        .collect::<Result<Vec<_>, _>>()?;
    match numbers.as_slice() {
        [strength, moves] => Ok((*strength, *moves, 0)),
        [strength, moves, money] => Ok((*strength, *moves, *money)),
        _ => Err(bad()),
    }
}

/// Parses level text: a stats line `strength moves [money]` followed by one
/// line per grid row.
pub fn parse_level(text: &str, config: &GameConfig) -> Result<Level, LevelError> {
    let mut lines = text.lines().map(|line| line.strip_suffix('\r').unwrap_or(line));
    let stats_line = lines
        .by_ref()
        .find(|line| !line.trim().is_empty())
        .ok_or(LevelError::Empty)?;
    let (strength, moves_remaining, money) = parse_stats(stats_line)?;

    let rows: Vec<Vec<char>> = lines
        .map(|line| line.chars().collect::<Vec<_>>())
        .collect();
    // Trailing blank lines are not rows.
    let height = rows
        .iter()
        .rposition(|row| !row.is_empty())
        .map_or(0, |last| last + 1);
    if height == 0 {
        return Err(LevelError::NoRows);
    }
    let width = rows[0].len();
    if width == 0 {
        return Err(LevelError::RaggedRow {
            row: 0,
            expected: 1,
            found: 0,
        });
    }

    let mut cells = Vec::with_capacity(width * height);
    let mut entities = BTreeMap::new();
    let mut start: Option<Position> = None;

    for (row, symbols) in rows[..height].iter().enumerate() {
        if symbols.len() != width {
            return Err(LevelError::RaggedRow {
                row,
                expected: width,
                found: symbols.len(),
            });
        }
        for (col, &symbol) in symbols.iter().enumerate() {
            let position = Position { row, col };
            if let Some(tile) = tile_under_player(symbol) {
                if let Some(first) = start {
                    return Err(LevelError::MultiplePlayers {
                        first,
                        second: position,
                    });
                }
                start = Some(position);
                cells.push(tile);
                continue;
            }
            let (tile, entity) = match symbol {
                'S' => (Tile::Floor, Some(Entity::Potion(PotionKind::Strength))),
                'M' => (Tile::Floor, Some(Entity::Potion(PotionKind::Move))),
                'F' => (Tile::Floor, Some(Entity::Potion(PotionKind::Fancy))),
                '$' => (
                    Tile::Floor,
                    Some(Entity::Coin {
                        value: config.coin_value,
                    }),
                ),
                digit if digit.is_ascii_digit() => (
                    Tile::Floor,
                    digit.to_digit(10).map(|strength| Entity::Crate { strength }),
                ),
                other => match Tile::from_symbol(other) {
                    Some(tile) => (tile, None),
                    None => {
                        return Err(LevelError::UnknownSymbol {
                            symbol: other,
                            position,
                        });
                    }
                },
            };
            cells.push(tile);
            if let Some(entity) = entity {
                entities.insert(position, entity);
            }
        }
    }

    let tiles = Grid::from_cells(height, width, cells)?;
    let position = start.ok_or(LevelError::MissingPlayer)?;
    debug!(rows = height, cols = width, %position, "Level parsed");

    Ok(Level {
        tiles,
        entities,
        player: Player {
            strength,
            moves_remaining,
            money,
            position,
        },
    })
}

/// Reads and parses a level file.
pub fn load_level(path: impl AsRef<Path>, config: &GameConfig) -> Result<Level, LevelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let level = parse_level(&text, config)?;
    info!(path = %path.display(), "Level loaded");
    Ok(level)
}

/// Writes a level in the same format [`load_level`] reads.
pub fn save_level(path: impl AsRef<Path>, level: &Level) -> Result<(), LevelError> {
    let path = path.as_ref();
    std::fs::write(path, level.to_text()).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Level saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAZE: &str = "1 12 4\nWWWWW\nWP1GW\nW S$W\nWWWWW\n";

    fn parse(text: &str) -> Result<Level, LevelError> {
        parse_level(text, &GameConfig::default())
    }

    #[test]
    fn parses_stats_tiles_and_entities() {
        let level = parse(MAZE).unwrap();
        assert_eq!(level.tiles.dimensions(), (4, 5));
        assert_eq!(level.player.strength, 1);
        assert_eq!(level.player.moves_remaining, 12);
        assert_eq!(level.player.money, 4);
        assert_eq!(level.player.position, Position::new(1, 1));
        assert_eq!(level.tiles[Position::new(1, 1)], Tile::Floor);
        assert_eq!(level.tiles[Position::new(1, 3)], Tile::Goal { filled: false });
        assert_eq!(
            level.entities.get(&Position::new(1, 2)),
            Some(&Entity::Crate { strength: 1 })
        );
        assert_eq!(
            level.entities.get(&Position::new(2, 2)),
            Some(&Entity::Potion(PotionKind::Strength))
        );
        assert_eq!(
            level.entities.get(&Position::new(2, 3)),
            Some(&Entity::Coin { value: 5 })
        );
    }

    #[test]
    fn money_defaults_to_zero() {
        let level = parse("3 7\nPG\n").unwrap();
        assert_eq!(level.player.money, 0);
    }

    #[test]
    fn coin_value_comes_from_config() {
        let config = GameConfig {
            coin_value: 9,
            ..GameConfig::default()
        };
        let level = parse_level("0 1\nP$\n", &config).unwrap();
        assert_eq!(
            level.entities.get(&Position::new(0, 1)),
            Some(&Entity::Coin { value: 9 })
        );
    }

    #[test]
    fn text_round_trips() {
        let level = parse(MAZE).unwrap();
        assert_eq!(level.to_text(), MAZE);
        assert_eq!(parse(&level.to_text()).unwrap(), level);
    }

    #[test]
    fn filled_goal_is_written_and_read_back() {
        let level = parse("1 1 0\nPX\n").unwrap();
        assert_eq!(level.tiles[Position::new(0, 1)], Tile::Goal { filled: true });
        assert_eq!(level.to_text(), "1 1 0\nPX\n");
    }

    #[test]
    fn player_on_a_goal_keeps_the_goal() {
        let level = parse("1 9 0\n Q\n").unwrap();
        assert_eq!(level.player.position, Position::new(0, 1));
        assert_eq!(level.tiles[Position::new(0, 1)], Tile::Goal { filled: false });
        assert_eq!(level.to_text(), "1 9 0\n Q\n");

        let level = parse("1 9 0\nR \n").unwrap();
        assert_eq!(level.tiles[Position::new(0, 0)], Tile::Goal { filled: true });
        assert_eq!(level.to_text(), "1 9 0\nR \n");
    }

    #[test]
    fn windows_line_endings_are_accepted() {
        let level = parse("1 2\r\nP G\r\n").unwrap();
        assert_eq!(level.tiles.dimensions(), (1, 3));
    }

    #[test]
    fn malformed_levels_are_rejected() {
        assert!(matches!(parse(""), Err(LevelError::Empty)));
        assert!(matches!(parse("one two\nP\n"), Err(LevelError::BadStats { .. })));
        assert!(matches!(parse("1\nP\n"), Err(LevelError::BadStats { .. })));
        assert!(matches!(parse("1 2\n"), Err(LevelError::NoRows)));
        assert!(matches!(
            parse("1 2\nPGG\nWW\n"),
            Err(LevelError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            parse("1 2\nP?\n"),
            Err(LevelError::UnknownSymbol { symbol: '?', .. })
        ));
        assert!(matches!(parse("1 2\n G\n"), Err(LevelError::MissingPlayer)));
        assert!(matches!(
            parse("1 2\nPP\n"),
            Err(LevelError::MultiplePlayers { .. })
        ));
        assert!(matches!(
            parse("1 2\nQ R\n"),
            Err(LevelError::MultiplePlayers { .. })
        ));
    }

    #[test]
    fn grid_errors_convert_into_level_errors() {
        let source = Grid::from_cells(2, 2, vec![Tile::Floor; 3]).unwrap_err();
        let err = LevelError::from(source.clone());
        assert!(matches!(&err, LevelError::Grid(inner) if *inner == source));
        assert!(err.to_string().contains("Expected 4 cells"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_level("no/such/level.txt", &GameConfig::default()).unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
    }

    #[test]
    fn save_then_load_restores_level() {
        let level = parse(MAZE).unwrap();
        let path = std::env::temp_dir().join(format!(
            "sokoban_level_test_{}.txt",
            std::process::id()
        ));
        save_level(&path, &level).unwrap();
        let loaded = load_level(&path, &GameConfig::default()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, level);
    }
}
