use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod config;
pub mod level;
pub mod map;
pub mod puzzle;
pub mod shop;

/// Represents a grid coordinate as (row, column).
///
/// Ordering is row-major, so maps keyed by `Position` iterate top-to-bottom,
/// left-to-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Returns the neighbouring position one step in `direction`.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant. The
    /// caller is still responsible for checking the upper grid bounds.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dr, dc) = direction.delta();
        Some(Position {
            row: self.row.checked_add_signed(dr)?,
            col: self.col.checked_add_signed(dc)?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four directions the player can move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Row/column offset of a single step.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Maps the console tokens `w`, `s`, `a`, `d` to directions.
    pub fn from_token(token: char) -> Option<Direction> {
        match token {
            'w' => Some(Direction::Up),
            's' => Some(Direction::Down),
            'a' => Some(Direction::Left),
            'd' => Some(Direction::Right),
            _ => None,
        }
    }
}

impl FromStr for Direction {
    type Err = puzzle::MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Direction::from_token(c).ok_or_else(|| puzzle::MoveError::InvalidDirection {
                    token: s.to_string(),
                })
            }
            _ => Err(puzzle::MoveError::InvalidDirection {
                token: s.to_string(),
            }),
        }
    }
}

/// The kinds of potion found on the map or sold in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PotionKind {
    Strength,
    Move,
    Fancy,
}

/// Stat changes granted by a potion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Effect {
    pub strength: u32,
    pub moves: u32,
}

impl PotionKind {
    pub const ALL: [PotionKind; 3] = [PotionKind::Strength, PotionKind::Move, PotionKind::Fancy];

    /// The single effect table used both when a potion is applied and when it
    /// is reverted by undo.
    pub fn effect(self) -> Effect {
        match self {
            PotionKind::Strength => Effect {
                strength: 2,
                moves: 0,
            },
            PotionKind::Move => Effect {
                strength: 0,
                moves: 5,
            },
            PotionKind::Fancy => Effect {
                strength: 2,
                moves: 2,
            },
        }
    }

    pub fn symbol(self) -> char {
        match self {
            PotionKind::Strength => 'S',
            PotionKind::Move => 'M',
            PotionKind::Fancy => 'F',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PotionKind::Strength => "Strength Potion",
            PotionKind::Move => "Move Potion",
            PotionKind::Fancy => "Fancy Potion",
        }
    }
}

/// Represents movable or collectable things placed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    /// A crate that needs at least `strength` to push.
    Crate { strength: u32 },
    Potion(PotionKind),
    Coin { value: u32 },
}

impl Entity {
    /// Character used for this entity in the level text format.
    pub fn symbol(&self) -> char {
        match self {
            Entity::Crate { strength } => char::from_digit(*strength % 10, 10).unwrap_or('0'),
            Entity::Potion(kind) => kind.symbol(),
            Entity::Coin { .. } => '$',
        }
    }
}
