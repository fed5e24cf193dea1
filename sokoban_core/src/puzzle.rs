use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    Direction, Effect, Entity, PotionKind, Position,
    config::GameConfig,
    level::{Level, LevelError},
    map::Grid,
};

/// Represents the static type of a cell in the puzzle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Floor,
    Wall,
    Goal {
        filled: bool,
    },
}

impl Tile {
    pub fn is_blocking(self) -> bool {
        matches!(self, Tile::Wall)
    }

    /// Character used for this tile in the level text format.
    pub fn symbol(self) -> char {
        match self {
            Tile::Floor => ' ',
            Tile::Wall => 'W',
            Tile::Goal { filled: false } => 'G',
            Tile::Goal { filled: true } => 'X',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Tile> {
        match symbol {
            ' ' => Some(Tile::Floor),
            'W' => Some(Tile::Wall),
            'G' => Some(Tile::Goal { filled: false }),
            'X' => Some(Tile::Goal { filled: true }),
            _ => None,
        }
    }
}

/// The player's mutable stats and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub strength: u32,
    pub moves_remaining: u32,
    pub money: u32,
    pub position: Position,
}

/// A stat increase that would not fit in a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Player {stat} would overflow")]
pub struct StatOverflow {
    pub stat: &'static str,
}

impl Player {
    /// Adds an effect to strength and moves. Neither stat changes if either
    /// would overflow.
    pub fn apply_effect(&mut self, effect: Effect) -> Result<(), StatOverflow> {
        let strength = self
            .strength
            .checked_add(effect.strength)
            .ok_or(StatOverflow { stat: "strength" })?;
        let moves_remaining = self
            .moves_remaining
            .checked_add(effect.moves)
            .ok_or(StatOverflow { stat: "moves" })?;
        self.strength = strength;
        self.moves_remaining = moves_remaining;
        Ok(())
    }

    pub fn add_money(&mut self, amount: u32) -> Result<(), StatOverflow> {
        self.money = self
            .money
            .checked_add(amount)
            .ok_or(StatOverflow { stat: "money" })?;
        Ok(())
    }

    /// Undoes a previously applied effect.
    pub fn revert_effect(&mut self, effect: Effect) {
        self.strength = self.strength.saturating_sub(effect.strength);
        self.moves_remaining = self.moves_remaining.saturating_sub(effect.moves);
    }
}

/// What a successful move picked up or pushed on its way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consumed {
    Nothing,
    /// A crate was pushed and now rests at `landed`.
    Crate { strength: u32, landed: Position },
    /// A crate was pushed onto the unfilled goal at `goal` and merged into it.
    CrateIntoGoal { strength: u32, goal: Position },
    Potion(PotionKind),
    Coin(u32),
}

/// An applied move, holding everything needed to invert it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub direction: Direction,
    pub from: Position,
    pub to: Position,
    pub consumed: Consumed,
}

/// One entry of the append-only undo log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntry {
    Move(MoveRecord),
    Purchase { kind: PotionKind, price: u32 },
}

/// Reasons a move can be rejected. The state is never changed when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("'{token}' is not a direction")]
    InvalidDirection { token: String },
    #[error("Cannot move into the wall at {position}")]
    BlockedByWall { position: Position },
    #[error("Crate needs strength {required}, player has {available}")]
    InsufficientStrength { required: u32, available: u32 },
    #[error("Moving {direction:?} from {from} leaves the grid")]
    OutOfBounds { from: Position, direction: Direction },
    #[error("Crate cannot be pushed onto {position}")]
    CrateBlocked { position: Position },
    #[error("No moves remaining")]
    OutOfMoves,
    #[error(transparent)]
    StatOverflow(#[from] StatOverflow),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UndoError {
    #[error("Nothing to undo")]
    EmptyHistory,
}

/// Owns the puzzle grid, the entities on it and the player.
///
/// All mutation goes through [`PuzzleState::attempt_move`],
/// [`PuzzleState::undo`], [`PuzzleState::attempt_purchase`] and
/// [`PuzzleState::reset`].
#[derive(Debug, Clone)]
pub struct PuzzleState {
    pub(crate) tiles: Grid<Tile>,
    pub(crate) entities: BTreeMap<Position, Entity>,
    pub(crate) player: Player,
    pub(crate) history: Vec<HistoryEntry>,
    pub(crate) config: GameConfig,
    initial: Level,
}

impl PuzzleState {
    /// Builds a puzzle from a parsed level using the default rules.
    pub fn new(level: Level) -> Result<Self, LevelError> {
        Self::with_config(level, &GameConfig::default())
    }

    /// Builds a puzzle from a parsed level, checking that it is playable.
    pub fn with_config(level: Level, config: &GameConfig) -> Result<Self, LevelError> {
        validate(&level)?;
        info!(
            rows = level.tiles.rows(),
            cols = level.tiles.cols(),
            entities = level.entities.len(),
            "Puzzle loaded"
        );
        Ok(PuzzleState {
            tiles: level.tiles.clone(),
            entities: level.entities.clone(),
            player: level.player.clone(),
            history: Vec::new(),
            config: config.clone(),
            initial: level,
        })
    }

    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }
    pub fn entities(&self) -> &BTreeMap<Position, Entity> {
        &self.entities
    }
    pub fn player(&self) -> &Player {
        &self.player
    }
    pub fn player_position(&self) -> Position {
        self.player.position
    }
    pub fn dimensions(&self) -> (usize, usize) {
        self.tiles.dimensions()
    }
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Moves the player one step, pushing a crate or collecting a potion or
    /// coin if one is in the way.
    pub fn attempt_move(&mut self, direction: Direction) -> Result<Consumed, MoveError> {
        let result = self.apply_move(direction);
        match &result {
            Ok(consumed) => debug!(
                ?direction,
                position = %self.player.position,
                moves_remaining = self.player.moves_remaining,
                ?consumed,
                "Move applied"
            ),
            Err(err) => trace!(?direction, %err, "Move rejected"),
        }
        result
    }

    /// Parses a console token and moves in that direction.
    pub fn attempt_move_token(&mut self, token: &str) -> Result<Consumed, MoveError> {
        let direction: Direction = token.parse()?;
        self.attempt_move(direction)
    }

    fn apply_move(&mut self, direction: Direction) -> Result<Consumed, MoveError> {
        if self.player.moves_remaining == 0 {
            return Err(MoveError::OutOfMoves);
        }
        let from = self.player.position;
        let target = self
            .tiles
            .neighbor(from, direction)
            .ok_or(MoveError::OutOfBounds { from, direction })?;
        if self.tiles[target].is_blocking() {
            return Err(MoveError::BlockedByWall { position: target });
        }

        let consumed = match self.entities.get(&target).copied() {
            Some(Entity::Crate { strength }) => self.push_crate(target, direction, strength)?,
            Some(Entity::Potion(kind)) => {
                self.player.apply_effect(kind.effect())?;
                self.entities.remove(&target);
                Consumed::Potion(kind)
            }
            Some(Entity::Coin { value }) => {
                self.player.add_money(value)?;
                self.entities.remove(&target);
                Consumed::Coin(value)
            }
            None => Consumed::Nothing,
        };

        self.player.position = target;
        self.player.moves_remaining -= 1;
        self.history.push(HistoryEntry::Move(MoveRecord {
            direction,
            from,
            to: target,
            consumed,
        }));
        Ok(consumed)
    }

    /// Pushes the crate at `at` one step further. Nothing is mutated unless
    /// every check passes.
    fn push_crate(
        &mut self,
        at: Position,
        direction: Direction,
        strength: u32,
    ) -> Result<Consumed, MoveError> {
        if self.player.strength < strength {
            return Err(MoveError::InsufficientStrength {
                required: strength,
                available: self.player.strength,
            });
        }
        let landing = self
            .tiles
            .neighbor(at, direction)
            .ok_or(MoveError::OutOfBounds {
                from: at,
                direction,
            })?;
        let landing_tile = self.tiles[landing];
        if landing_tile.is_blocking() {
            return Err(MoveError::BlockedByWall { position: landing });
        }
        if self.entities.contains_key(&landing) || landing_tile == (Tile::Goal { filled: true }) {
            return Err(MoveError::CrateBlocked { position: landing });
        }

        self.entities.remove(&at);
        match &mut self.tiles[landing] {
            Tile::Goal { filled } => {
                *filled = true;
                Ok(Consumed::CrateIntoGoal {
                    strength,
                    goal: landing,
                })
            }
            _ => {
                self.entities.insert(landing, Entity::Crate { strength });
                Ok(Consumed::Crate {
                    strength,
                    landed: landing,
                })
            }
        }
    }

    /// Reverses the most recent move or purchase.
    pub fn undo(&mut self) -> Result<HistoryEntry, UndoError> {
        let entry = self.history.pop().ok_or(UndoError::EmptyHistory)?;
        match entry {
            HistoryEntry::Move(record) => self.revert_move(&record),
            HistoryEntry::Purchase { kind, price } => {
                self.player.revert_effect(kind.effect());
                self.player.money = self.player.money.saturating_add(price);
            }
        }
        debug!(?entry, position = %self.player.position, "Undone");
        Ok(entry)
    }

    fn revert_move(&mut self, record: &MoveRecord) {
        match record.consumed {
            Consumed::Nothing => {}
            Consumed::Crate { strength, landed } => {
                self.entities.remove(&landed);
                self.entities.insert(record.to, Entity::Crate { strength });
            }
            Consumed::CrateIntoGoal { strength, goal } => {
                if let Tile::Goal { filled } = &mut self.tiles[goal] {
                    *filled = false;
                }
                self.entities.insert(record.to, Entity::Crate { strength });
            }
            Consumed::Potion(kind) => {
                self.entities.insert(record.to, Entity::Potion(kind));
                self.player.revert_effect(kind.effect());
            }
            Consumed::Coin(value) => {
                self.entities.insert(record.to, Entity::Coin { value });
                self.player.money = self.player.money.saturating_sub(value);
            }
        }
        self.player.moves_remaining = self.player.moves_remaining.saturating_add(1);
        self.player.position = record.from;
    }

    /// True when every goal tile is filled.
    pub fn has_won(&self) -> bool {
        !self
            .tiles
            .iter()
            .any(|tile| matches!(tile, Tile::Goal { filled: false }))
    }

    /// True when the puzzle is unsolved and no moves are left.
    pub fn has_lost(&self) -> bool {
        !self.has_won() && self.player.moves_remaining == 0
    }

    /// Restores the level this puzzle was built from and clears the history.
    pub fn reset(&mut self) {
        self.tiles = self.initial.tiles.clone();
        self.entities = self.initial.entities.clone();
        self.player = self.initial.player.clone();
        self.history.clear();
        info!("Puzzle reset");
    }

    /// Returns the current state in the same shape a level is loaded in.
    pub fn snapshot(&self) -> Level {
        Level {
            tiles: self.tiles.clone(),
            entities: self.entities.clone(),
            player: self.player.clone(),
        }
    }
}

fn validate(level: &Level) -> Result<(), LevelError> {
    let tiles = &level.tiles;
    for (&position, entity) in &level.entities {
        let reason = match (tiles.get(position), entity) {
            (None, _) => Some("entity is outside the grid"),
            (Some(Tile::Wall), _) => Some("entity is inside a wall"),
            (Some(Tile::Goal { filled: true }), Entity::Crate { .. }) => {
                Some("crate sits on a filled goal")
            }
            (_, Entity::Crate { strength }) if *strength > 9 => {
                Some("crate strength must be a single digit")
            }
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(LevelError::Invalid { position, reason });
        }
    }

    let position = level.player.position;
    let reason = match tiles.get(position) {
        None => Some("player is outside the grid"),
        Some(Tile::Wall) => Some("player is inside a wall"),
        Some(_) if level.entities.contains_key(&position) => {
            Some("player shares a cell with an entity")
        }
        Some(_) => None,
    };
    match reason {
        Some(reason) => Err(LevelError::Invalid { position, reason }),
        None => Ok(()),
    }
}
