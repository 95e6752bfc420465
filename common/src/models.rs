use std::fmt;

use serde::{Deserialize, Serialize};

/// A board coordinate.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub row: usize,
    pub column: usize,
}

impl Cell {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.row, self.column)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    New,
    Started,
    Paused,
    Won,
    Lost,
}

impl GameStatus {
    /// True once the game has left `new`, including finished games.
    pub fn has_started(self) -> bool {
        self != Self::New
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardParams {
    pub nbr_rows: usize,
    pub nbr_columns: usize,
    pub nbr_mines: usize,
}

impl Default for BoardParams {
    fn default() -> Self {
        Self {
            nbr_rows: 9,
            nbr_columns: 9,
            nbr_mines: 10,
        }
    }
}

/// Body of a game creation request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewGame {
    pub player_id: String,
    #[serde(default)]
    pub board: BoardParams,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenedCell {
    pub row: usize,
    pub column: usize,
    /// Number of neighbouring mines, or -1 when the cell is a mine.
    pub value: i8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BoardView {
    pub nbr_rows: usize,
    pub nbr_columns: usize,
    pub nbr_mines: usize,
    pub mines: Vec<Cell>,
    pub flagged: Vec<Cell>,
    pub opened: Vec<OpenedCell>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GameView {
    pub id: String,
    pub player_id: String,
    pub status: GameStatus,
    /// Play time formatted as `H:MM:SS`.
    pub elapsed_time: String,
    pub elapsed_seconds: u64,
    pub board: BoardView,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    #[serde(rename = "games_won")]
    pub won: u32,
    #[serde(rename = "games_lost")]
    pub lost: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewUser {
    pub name_first: String,
    pub name_last: String,
    pub email: String,
    pub password: String,
}

/// Partial user update, every field optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name_first: Option<String>,
    #[serde(default)]
    pub name_last: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserView {
    pub id: String,
    pub name_first: String,
    pub name_last: String,
    pub email: String,
    pub stats: UserStats,
}

/// Envelope of every collection response: `{"records": [...]}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Records<T> {
    pub records: Vec<T>,
}

impl<T> From<Vec<T>> for Records<T> {
    fn from(records: Vec<T>) -> Self {
        Self { records }
    }
}
