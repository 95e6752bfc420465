use chrono::{DateTime, TimeDelta, Utc};
use minesweeper_common::models::{Cell, GameStatus, GameView, NewGame};
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::{
    config::BoardLimits,
    data::{Board, Game},
    error::{GameError, Result},
    store::Store,
};

/// A validated mutation of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Pause,
    Flag(Cell),
    Open(Cell),
}

/// How a finished game ended, as recorded in the player's stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
}

/// Renders a duration as `H:MM:SS`, hours unbounded.
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

impl Game {
    /// A fresh game in `new` status. The id is assigned by the store.
    pub fn new(player_id: impl Into<String>, board: Board, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            player_id: player_id.into(),
            board,
            status: GameStatus::New,
            elapsed: TimeDelta::zero(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Play time, including the running stretch since the last mutation while
    /// the game is `started`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        if self.status == GameStatus::Started {
            self.elapsed + (now - self.updated_at).max(TimeDelta::zero())
        } else {
            self.elapsed
        }
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.elapsed(now).num_seconds().max(0) as u64
    }

    /// Folds the running stretch into the accumulator and moves the
    /// mutation timestamp to `now`.
    fn accrue(&mut self, now: DateTime<Utc>) {
        self.elapsed = self.elapsed(now);
        self.updated_at = now;
    }

    fn ensure_not_finished(&self) -> Result<()> {
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        Ok(())
    }

    fn ensure_playing(&self) -> Result<()> {
        match self.status {
            GameStatus::Started => Ok(()),
            GameStatus::New => Err(GameError::NotStarted),
            GameStatus::Paused => Err(GameError::GamePaused),
            GameStatus::Won | GameStatus::Lost => Err(GameError::GameFinished),
        }
    }

    fn playable_cell(&self, cell: Cell) -> Result<()> {
        self.ensure_playing()?;
        if !self.board.is_cell(cell) {
            return Err(GameError::out_of_bounds(cell));
        }
        if self.board.is_opened(cell) {
            return Err(GameError::CellAlreadyOpened(cell));
        }
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_not_finished()?;
        if self.status != GameStatus::New {
            return Err(GameError::AlreadyStarted);
        }

        self.accrue(now);
        self.status = GameStatus::Started;
        Ok(())
    }

    /// Toggles between `started` and `paused`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_not_finished()?;
        let next = match self.status {
            GameStatus::Started => GameStatus::Paused,
            GameStatus::Paused => GameStatus::Started,
            GameStatus::New => return Err(GameError::NotStarted),
            GameStatus::Won | GameStatus::Lost => return Err(GameError::GameFinished),
        };

        self.accrue(now);
        self.status = next;
        Ok(())
    }

    /// Toggles the flag on a closed cell. Returns whether it ends up flagged.
    pub fn flag(&mut self, cell: Cell, now: DateTime<Utc>) -> Result<bool> {
        self.playable_cell(cell)?;

        self.accrue(now);
        Ok(self.board.toggle_flag(cell))
    }

    /// Opens a cell and settles the game when that decides it.
    pub fn open(&mut self, cell: Cell, now: DateTime<Utc>) -> Result<Option<Outcome>> {
        self.playable_cell(cell)?;
        if self.board.is_flagged(cell) {
            return Err(GameError::CellFlagged(cell));
        }

        self.accrue(now);
        self.board.reveal(cell);

        let outcome = if self.board.has_won() {
            Some(Outcome::Won)
        } else if self.board.has_lost() {
            Some(Outcome::Lost)
        } else {
            None
        };

        match outcome {
            Some(Outcome::Won) => self.status = GameStatus::Won,
            Some(Outcome::Lost) => self.status = GameStatus::Lost,
            None => {}
        }
        Ok(outcome)
    }

    /// Applies a transition, returning the outcome if it ended the game.
    pub fn apply(&mut self, transition: Transition, now: DateTime<Utc>) -> Result<Option<Outcome>> {
        match transition {
            Transition::Start => self.start(now).map(|_| None),
            Transition::Pause => self.pause(now).map(|_| None),
            Transition::Flag(cell) => self.flag(cell, now).map(|_| None),
            Transition::Open(cell) => self.open(cell, now),
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> GameView {
        let elapsed_seconds = self.elapsed_seconds(now);
        GameView {
            id: self.id.clone(),
            player_id: self.player_id.clone(),
            status: self.status,
            elapsed_time: format_elapsed(elapsed_seconds),
            elapsed_seconds,
            board: self.board.view(),
        }
    }
}

/// Creates a game for an existing player and stores it.
#[instrument(level = "trace", skip(store, limits, rng), fields(player_id = %params.player_id))]
pub fn create_game<R: Rng>(
    store: &Store,
    limits: &BoardLimits,
    params: NewGame,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Game> {
    let player = store.load_user(&params.player_id)?;
    let board = Board::generate(&params.board, limits, rng)?;
    debug!(
        "Generated {}x{} board with {} mines for player {}",
        board.rows(),
        board.columns(),
        board.mine_count(),
        player.id()
    );

    let game = store.insert_game(Game::new(player.id(), board, now))?;
    info!("Created game {} for player {}", game.id(), game.player_id());
    Ok(game)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use minesweeper_common::models::BoardParams;

    use super::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    fn game(rows: usize, columns: usize, mines: &[(usize, usize)]) -> Game {
        let params = BoardParams {
            nbr_rows: rows,
            nbr_columns: columns,
            nbr_mines: mines.len(),
        };
        let board = Board::with_mines(
            &params,
            &BoardLimits::default(),
            mines.iter().map(|&(r, c)| Cell::new(r, c)),
        )
        .unwrap();
        Game::new("player", board, t(0))
    }

    fn started(rows: usize, columns: usize, mines: &[(usize, usize)]) -> Game {
        let mut game = game(rows, columns, mines);
        game.start(t(0)).unwrap();
        game
    }

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(65), "0:01:05");
        assert_eq!(format_elapsed(3 * 3600 + 59 * 60 + 7), "3:59:07");
        assert_eq!(format_elapsed(100 * 3600), "100:00:00");
    }

    #[test]
    fn start_only_from_new() {
        let mut game = game(2, 2, &[(0, 0)]);
        game.start(t(1)).unwrap();
        assert_eq!(game.status(), GameStatus::Started);
        assert_eq!(game.start(t(2)), Err(GameError::AlreadyStarted));

        game.pause(t(3)).unwrap();
        assert_eq!(game.start(t(4)), Err(GameError::AlreadyStarted));
    }

    #[test]
    fn pause_requires_a_started_game() {
        let mut game = game(2, 2, &[(0, 0)]);
        assert_eq!(game.pause(t(1)), Err(GameError::NotStarted));
        assert_eq!(game.status(), GameStatus::New);
    }

    #[test]
    fn pause_and_resume_keep_elapsed_time_monotonic() {
        let mut game = started(3, 3, &[(0, 0)]);
        assert_eq!(game.elapsed_seconds(t(10)), 10);

        game.pause(t(30)).unwrap();
        assert_eq!(game.status(), GameStatus::Paused);
        assert_eq!(game.elapsed_seconds(t(30)), 30);
        assert_eq!(game.elapsed_seconds(t(500)), 30);

        game.pause(t(500)).unwrap();
        assert_eq!(game.status(), GameStatus::Started);
        assert_eq!(game.elapsed_seconds(t(500)), 30);
        assert_eq!(game.elapsed_seconds(t(510)), 40);
    }

    #[test]
    fn actions_while_started_do_not_lose_time() {
        let mut game = started(3, 3, &[(0, 0)]);
        game.flag(Cell::new(2, 2), t(20)).unwrap();
        game.open(Cell::new(1, 1), t(25)).unwrap();
        assert_eq!(game.updated_at(), t(25));
        assert_eq!(game.elapsed_seconds(t(30)), 30);
    }

    #[test]
    fn cell_actions_need_a_running_game() {
        let mut game = game(3, 3, &[(0, 0)]);
        let cell = Cell::new(2, 2);
        assert_eq!(game.flag(cell, t(1)), Err(GameError::NotStarted));
        assert_eq!(game.open(cell, t(1)), Err(GameError::NotStarted));

        game.start(t(1)).unwrap();
        game.pause(t(2)).unwrap();
        assert_eq!(game.flag(cell, t(3)), Err(GameError::GamePaused));
        assert_eq!(game.open(cell, t(3)), Err(GameError::GamePaused));
        assert!(game.board().flagged().is_empty());
        assert!(game.board().opened().is_empty());
    }

    #[test]
    fn cell_guards() {
        let mut game = started(3, 3, &[(0, 0)]);
        assert_eq!(
            game.open(Cell::new(3, 1), t(1)),
            Err(GameError::CellOutOfBounds { row: 3, column: 1 })
        );

        game.open(Cell::new(1, 1), t(1)).unwrap();
        assert_eq!(
            game.flag(Cell::new(1, 1), t(2)),
            Err(GameError::CellAlreadyOpened(Cell::new(1, 1)))
        );
        assert_eq!(
            game.open(Cell::new(1, 1), t(2)),
            Err(GameError::CellAlreadyOpened(Cell::new(1, 1)))
        );

        assert_eq!(game.flag(Cell::new(2, 2), t(3)), Ok(true));
        assert_eq!(
            game.open(Cell::new(2, 2), t(4)),
            Err(GameError::CellFlagged(Cell::new(2, 2)))
        );
        assert_eq!(game.flag(Cell::new(2, 2), t(5)), Ok(false));
    }

    #[test]
    fn opening_safe_cells_wins() {
        let mut game = started(2, 2, &[(0, 0)]);
        assert_eq!(game.open(Cell::new(0, 1), t(1)), Ok(None));
        assert_eq!(game.open(Cell::new(1, 0), t(2)), Ok(None));
        assert_eq!(game.open(Cell::new(1, 1), t(3)), Ok(Some(Outcome::Won)));
        assert_eq!(game.status(), GameStatus::Won);
        assert!(!game.board().is_opened(Cell::new(0, 0)));
        assert_eq!(game.elapsed_seconds(t(100)), 3);
    }

    #[test]
    fn opening_a_mine_loses() {
        let mut game = started(2, 2, &[(0, 0)]);
        let opened = game.open(Cell::new(1, 1), t(1)).unwrap();
        assert_eq!(opened, None);
        assert_eq!(game.board().opened()[&Cell::new(1, 1)], 1);
        assert_eq!(game.status(), GameStatus::Started);

        let mut game = started(2, 2, &[(0, 0)]);
        game.open(Cell::new(0, 1), t(1)).unwrap();
        game.open(Cell::new(1, 0), t(2)).unwrap();
        assert_eq!(game.open(Cell::new(0, 0), t(4)), Ok(Some(Outcome::Lost)));
        assert_eq!(game.status(), GameStatus::Lost);
        assert_eq!(game.elapsed_seconds(t(60)), 4);
    }

    #[test]
    fn finished_games_reject_everything() {
        let mut game = started(2, 2, &[(0, 0)]);
        game.open(Cell::new(0, 0), t(1)).unwrap();
        let board = game.board().clone();

        for transition in [
            Transition::Start,
            Transition::Pause,
            Transition::Flag(Cell::new(1, 1)),
            Transition::Open(Cell::new(1, 1)),
        ] {
            assert_eq!(game.apply(transition, t(2)), Err(GameError::GameFinished));
        }
        assert_eq!(game.board(), &board);
        assert_eq!(game.status(), GameStatus::Lost);
    }

    #[test]
    fn view_reports_live_elapsed_time() {
        let game = started(2, 2, &[(0, 0)]);
        let view = game.view(t(3725));
        assert_eq!(view.status, GameStatus::Started);
        assert_eq!(view.elapsed_seconds, 3725);
        assert_eq!(view.elapsed_time, "1:02:05");
        assert_eq!(view.board.nbr_mines, 1);
    }
}
