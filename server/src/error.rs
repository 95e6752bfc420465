use minesweeper_common::{models::Cell, protocol::ErrorResponse};
use rocket::{
    Request,
    http::Status,
    response::{self, Responder},
    serde::json::Json,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Board of {rows}x{columns} is outside the allowed 2x2 to {max_rows}x{max_columns}")]
    InvalidDimensions {
        rows: usize,
        columns: usize,
        max_rows: usize,
        max_columns: usize,
    },
    #[error("Number of mines must be between 1 and {max}, got {mines}")]
    InvalidMineCount { mines: usize, max: usize },
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error("Address {0} already in use")]
    EmailInUse(String),

    #[error("Could not find game with id={0}")]
    GameNotFound(String),
    #[error("Could not find user with id={0}")]
    UserNotFound(String),

    #[error("Cannot apply action as game has already started")]
    AlreadyStarted,
    #[error("Cannot apply action as game has not yet started")]
    NotStarted,
    #[error("Cannot apply action as game is paused")]
    GamePaused,
    #[error("Cannot apply action as game has already finished")]
    GameFinished,

    #[error("Cell [{row}, {column}] is not within the limits of the board")]
    CellOutOfBounds { row: i64, column: i64 },
    #[error("Cell {0} is already opened")]
    CellAlreadyOpened(Cell),
    #[error("Cell {0} is flagged")]
    CellFlagged(Cell),

    #[error("Invalid game action payload: {0}")]
    InvalidPayload(String),
    #[error("Unknown game action '{0}'")]
    UnknownAction(String),

    #[error("Game {0} was modified concurrently, reload and retry")]
    Conflict(String),
    #[error("This API only supports requests encoded as JSON")]
    UnsupportedMediaType,
    #[error("This API only supports responses encoded as JSON")]
    NotAcceptable,
    #[error("Too many requests")]
    RateLimited,
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GameError>;

impl GameError {
    pub fn out_of_bounds(cell: Cell) -> Self {
        // Board dimensions are capped far below i64::MAX.
        Self::CellOutOfBounds {
            row: cell.row as i64,
            column: cell.column as i64,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::GameNotFound(_) | Self::UserNotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::UnsupportedMediaType => Status::UnsupportedMediaType,
            Self::NotAcceptable => Status::NotAcceptable,
            Self::RateLimited => Status::TooManyRequests,
            Self::Internal(_) => Status::InternalServerError,
            _ => Status::BadRequest,
        }
    }
}

impl<'r> Responder<'r, 'static> for GameError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = ErrorResponse {
            title: status.reason().unwrap_or("Error").to_string(),
            description: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}
