use chrono::{DateTime, Utc};
use minesweeper_common::{
    models::{Cell, GameStatus, GameView},
    protocol::{Action, CellPayload},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::{
    data::Game,
    error::{GameError, Result},
    logic::Transition,
    store::Store,
};

/// Reads the target cell of `flag`/`open` once the game accepts cell actions.
fn target_cell(game: &Game, payload: Option<&Value>) -> Result<Cell> {
    if game.status() == GameStatus::New {
        return Err(GameError::NotStarted);
    }
    if game.status() == GameStatus::Paused {
        return Err(GameError::GamePaused);
    }

    let payload = payload
        .ok_or_else(|| GameError::InvalidPayload("missing cell coordinates".to_string()))?;
    let CellPayload { row, column } = CellPayload::deserialize(payload)
        .map_err(|e| GameError::InvalidPayload(e.to_string()))?;

    let cell = match (usize::try_from(row), usize::try_from(column)) {
        (Ok(row), Ok(column)) => Cell::new(row, column),
        _ => return Err(GameError::CellOutOfBounds { row, column }),
    };
    if !game.board().is_cell(cell) {
        return Err(GameError::out_of_bounds(cell));
    }
    Ok(cell)
}

/// Checks `action` against the game's current state and turns it into a
/// transition.
fn validate(game: &Game, action: Action, payload: Option<&Value>) -> Result<Transition> {
    match action {
        Action::Start => {
            if game.status().has_started() {
                return Err(GameError::AlreadyStarted);
            }
            Ok(Transition::Start)
        }
        Action::Pause => {
            if !game.status().has_started() {
                return Err(GameError::NotStarted);
            }
            Ok(Transition::Pause)
        }
        Action::Flag => {
            let cell = target_cell(game, payload)?;
            if game.board().is_opened(cell) {
                return Err(GameError::CellAlreadyOpened(cell));
            }
            Ok(Transition::Flag(cell))
        }
        Action::Open => {
            let cell = target_cell(game, payload)?;
            if game.board().is_opened(cell) {
                return Err(GameError::CellAlreadyOpened(cell));
            }
            if game.board().is_flagged(cell) {
                return Err(GameError::CellFlagged(cell));
            }
            Ok(Transition::Open(cell))
        }
    }
}

/// Runs one game action as a single load, validate, mutate and persist
/// transaction and returns the stored result.
#[instrument(level = "trace", skip(store, payload))]
pub fn perform(
    store: &Store,
    game_id: &str,
    action: &str,
    payload: Option<&Value>,
    now: DateTime<Utc>,
) -> Result<GameView> {
    let mut game = store.load_game(game_id)?;

    if game.is_finished() {
        return Err(GameError::GameFinished);
    }

    let action: Action = action
        .parse()
        .map_err(|_| GameError::UnknownAction(action.to_string()))?;
    let transition = validate(&game, action, payload)?;
    debug!("Applying {:?} to game {}", transition, game_id);

    let outcome = game.apply(transition, now)?;
    store.save_game(game, outcome)?;

    let game = store.load_game(game_id)?;
    if outcome.is_some() {
        info!(
            "Game {} finished as {} for player {}",
            game_id,
            game.status(),
            game.player_id()
        );
    }
    Ok(game.view(now))
}
