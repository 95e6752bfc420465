use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use minesweeper_common::models::{Cell, GameStatus, UserStats};

/// Adjacency value recorded for an opened mine.
pub const MINE_VALUE: i8 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub(crate) rows: usize,
    pub(crate) columns: usize,
    pub(crate) mine_count: usize,
    pub(crate) mines: BTreeSet<Cell>,
    pub(crate) flagged: BTreeSet<Cell>,
    pub(crate) opened: BTreeMap<Cell, i8>,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub(crate) id: String,
    pub(crate) player_id: String,
    pub(crate) board: Board,
    pub(crate) status: GameStatus,
    pub(crate) elapsed: TimeDelta,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

#[derive(Debug, Clone)]
pub struct User {
    pub(crate) id: String,
    pub(crate) name_first: String,
    pub(crate) name_last: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) stats: UserStats,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}
