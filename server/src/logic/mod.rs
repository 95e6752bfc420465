//! Game rules: the board, the game state machine and the action dispatcher.

mod action;
mod board;
mod game;
mod user;

pub use action::perform;
pub use game::{Outcome, Transition, create_game, format_elapsed};
