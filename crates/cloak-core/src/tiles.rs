use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Integer tile coordinate. Rows grow upward: the first line of a level is
/// row 0, the next one row -1, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Geometry class of a tile symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    /// Full square. Also the fallback for unrecognized symbols.
    Block,
    /// Bottom half of the square (`_`).
    Floor,
    /// Top half of the square (`^`).
    Ceiling,
    /// Lower half plus the upper-right quarter (`/`), rising to the right.
    AscendingStep,
    /// Lower half plus the upper-left quarter (`\`), rising to the left.
    DescendingStep,
    /// Player start marker (`@`). Emits no geometry.
    Start,
    /// Guard spawn marker (`%`). Emits no geometry.
    GuardSpawn,
}

impl TileKind {
    pub const START_SYMBOL: char = '@';
    pub const GUARD_SYMBOL: char = '%';

    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            Self::START_SYMBOL => Self::Start,
            Self::GUARD_SYMBOL => Self::GuardSpawn,
            '_' => Self::Floor,
            '^' => Self::Ceiling,
            '/' => Self::AscendingStep,
            '\\' => Self::DescendingStep,
            // '=' and anything unknown
            _ => Self::Block,
        }
    }

    /// Whether this kind designates a position instead of collision geometry.
    pub fn is_marker(self) -> bool {
        matches!(self, Self::Start | Self::GuardSpawn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// Tabs make column alignment ambiguous and are rejected outright.
    /// Line and column are 1-based.
    TabCharacter { line: usize, column: usize },
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TabCharacter { line, column } => {
                write!(f, "tab character in level at line {line}, column {column}")
            },
        }
    }
}

impl std::error::Error for LevelError {}

/// Sparse mapping from tile coordinate to symbol. Immutable after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMap {
    tiles: BTreeMap<TileCoord, char>,
}

impl TileMap {
    /// Parse a level from its lines, top row first.
    ///
    /// Every non-whitespace character becomes a tile keyed by
    /// `(column, -line_index)`. Whitespace is a hole.
    pub fn parse<I, S>(lines: I) -> Result<Self, LevelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tiles = BTreeMap::new();
        for (row, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            if let Some(col) = line.chars().position(|c| c == '\t') {
                return Err(LevelError::TabCharacter {
                    line: row + 1,
                    column: col + 1,
                });
            }
            for (col, symbol) in line.chars().enumerate() {
                if symbol.is_whitespace() {
                    continue;
                }
                tiles.insert(TileCoord::new(col as i32, -(row as i32)), symbol);
            }
        }
        Ok(Self { tiles })
    }

    /// Parse a whole level text (newline separated).
    pub fn parse_str(text: &str) -> Result<Self, LevelError> {
        Self::parse(text.lines())
    }

    pub fn get(&self, coord: TileCoord) -> Option<char> {
        self.tiles.get(&coord).copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in coordinate order (column, then row).
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, char)> + '_ {
        self.tiles.iter().map(|(&coord, &symbol)| (coord, symbol))
    }
}
