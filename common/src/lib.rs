//! Wire types shared between the minesweeper service and its clients.
//!
//! Field names, action names and the status vocabulary are the contract with
//! existing clients and are serialized exactly as declared here.

pub mod models;
pub mod protocol;
