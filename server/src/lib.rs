//! Multi-user minesweeper game server.
//!
//! Users register, create games bound to themselves and drive them through
//! `start`, `pause`, `flag` and `open` actions over a JSON API.

pub mod config;
pub mod cors;
pub mod data;
pub mod error;
pub mod logging;
pub mod logic;
pub mod media;
pub mod rate_limit;
pub mod routes;
pub mod store;

use rocket::{Build, Rocket, catchers, routes};
use tracing::info;

use crate::{
    config::Config, cors::create_cors, logging::RequestLogger, rate_limit::RateLimiter,
    store::Store,
};

/// Assembles the Rocket instance with its state, fairings and routes.
pub fn build(config: Config) -> Result<Rocket<Build>, rocket_cors::Error> {
    let cors = create_cors(&config.cors_allowed_origins)?;
    let rate_limiter = RateLimiter::per_minute(config.creations_per_minute);

    info!(
        "Board limits: {} rows, {} columns; {} creations per minute per client",
        config.limits.max_rows, config.limits.max_columns, config.creations_per_minute
    );

    Ok(rocket::build()
        .attach(RequestLogger)
        .attach(cors)
        .manage(Store::new())
        .manage(rate_limiter)
        .manage(config)
        .mount(
            "/",
            routes![
                routes::create_user,
                routes::list_users,
                routes::get_user,
                routes::replace_user,
                routes::update_user,
                routes::delete_user,
                routes::create_game,
                routes::list_games,
                routes::get_game,
                routes::delete_game,
                routes::perform_action,
            ],
        )
        .register("/", catchers![routes::default_catcher]))
}
