//! Board model: tiles, directions, levels and solution proofs.
//!
//! A level's data is `height` rows of `width` tile characters joined with
//! `\n`. Movable tiles carry the set of directions they may be pushed in.

use serde::{Deserialize, Serialize};
use shared_types::LevelId;
use thiserror::Error;

/// A single move of the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Up,
        Direction::Right,
        Direction::Down,
    ];

    /// Unit vector, y grows downwards.
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
        }
    }

    pub fn from_vector(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (-1, 0) => Some(Direction::Left),
            (0, -1) => Some(Direction::Up),
            (1, 0) => Some(Direction::Right),
            (0, 1) => Some(Direction::Down),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Direction::Left => 0b0001,
            Direction::Up => 0b0010,
            Direction::Right => 0b0100,
            Direction::Down => 0b1000,
        }
    }
}

/// Set of directions a movable tile may be pushed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Moves(u8);

impl Moves {
    pub const NONE: Moves = Moves(0);
    pub const ALL: Moves = Moves(0b1111);

    pub fn of(directions: &[Direction]) -> Self {
        Moves(directions.iter().fold(0, |acc, d| acc | d.bit()))
    }

    pub fn allows(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.allows(*d))
    }
}

/// Board tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tile {
    Floor,
    Wall,
    Exit,
    Start,
    Hole,
    /// Pushable block restricted to a non-empty set of directions.
    Block(Moves),
}

/// Movement sets for the directional block characters, in alphabet order.
const BLOCK_CHARS: [(char, u8); 15] = [
    ('2', 0b1111), // any
    ('6', 0b0001), // left
    ('7', 0b0010), // up
    ('8', 0b0100), // right
    ('9', 0b1000), // down
    ('A', 0b0011), // up-left
    ('B', 0b0110), // up-right
    ('C', 0b1100), // down-right
    ('D', 0b1001), // down-left
    ('E', 0b1110), // all but left
    ('F', 0b1101), // all but up
    ('G', 0b1011), // all but right
    ('H', 0b0111), // all but down
    ('I', 0b0101), // left-right
    ('J', 0b1010), // up-down
];

impl Tile {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Tile::Floor),
            '1' => Some(Tile::Wall),
            '3' => Some(Tile::Exit),
            '4' => Some(Tile::Start),
            '5' => Some(Tile::Hole),
            _ => BLOCK_CHARS
                .iter()
                .find(|(ch, _)| *ch == c)
                .map(|(_, bits)| Tile::Block(Moves(*bits))),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Tile::Floor => '0',
            Tile::Wall => '1',
            Tile::Exit => '3',
            Tile::Start => '4',
            Tile::Hole => '5',
            Tile::Block(moves) => BLOCK_CHARS
                .iter()
                .find(|(_, bits)| *bits == moves.0)
                .map(|(ch, _)| *ch)
                .unwrap_or('2'),
        }
    }

    pub fn moves(self) -> Option<Moves> {
        match self {
            Tile::Block(moves) => Some(moves),
            _ => None,
        }
    }

    pub fn is_movable(self) -> bool {
        matches!(self, Tile::Block(_))
    }
}

/// Malformed level data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("Level has no rows")]
    Empty,

    #[error("Row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Unknown tile '{tile}' at ({x}, {y})")]
    UnknownTile { tile: char, x: usize, y: usize },

    #[error("Level must have exactly one start tile, found {found}")]
    StartCount { found: usize },

    #[error("Declared size {width}x{height} does not match data")]
    SizeMismatch { width: usize, height: usize },
}

/// Wire form of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    pub id: LevelId,
    pub width: usize,
    pub height: usize,
    pub data: String,
}

/// A parsed, well-formed puzzle board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LevelData", into = "LevelData")]
pub struct Level {
    id: LevelId,
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Level {
    /// Parse `\n`-joined rows.
    pub fn parse(id: LevelId, data: &str) -> Result<Self, LevelError> {
        let rows: Vec<&str> = data.split('\n').collect();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if width == 0 {
            return Err(LevelError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(LevelError::RaggedRow {
                    row: y,
                    found,
                    expected: width,
                });
            }
            for (x, c) in row.chars().enumerate() {
                let tile = Tile::from_char(c).ok_or(LevelError::UnknownTile { tile: c, x, y })?;
                tiles.push(tile);
            }
        }

        let starts = tiles.iter().filter(|t| **t == Tile::Start).count();
        if starts != 1 {
            return Err(LevelError::StartCount { found: starts });
        }

        Ok(Self {
            id,
            width,
            height: rows.len(),
            tiles,
        })
    }

    pub(crate) fn from_tiles(id: LevelId, width: usize, height: usize, tiles: Vec<Tile>) -> Self {
        Self {
            id,
            width,
            height,
            tiles,
        }
    }

    pub fn id(&self) -> &LevelId {
        &self.id
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x).copied()
    }

    /// Rows joined with `\n`.
    pub fn data(&self) -> String {
        self.tiles
            .chunks(self.width)
            .map(|row| row.iter().map(|t| t.to_char()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<LevelData> for Level {
    type Error = LevelError;

    fn try_from(raw: LevelData) -> Result<Self, Self::Error> {
        let level = Level::parse(raw.id, &raw.data)?;
        if level.width != raw.width || level.height != raw.height {
            return Err(LevelError::SizeMismatch {
                width: raw.width,
                height: raw.height,
            });
        }
        Ok(level)
    }
}

impl From<Level> for LevelData {
    fn from(level: Level) -> Self {
        LevelData {
            data: level.data(),
            id: level.id,
            width: level.width,
            height: level.height,
        }
    }
}

/// Move sequence submitted as proof of a solve.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolutionProof(pub Vec<Direction>);

impl SolutionProof {
    pub fn new(moves: Vec<Direction>) -> Self {
        Self(moves)
    }

    pub fn moves(&self) -> &[Direction] {
        &self.0
    }
}
