use minesweeper_server::{build, config::Config, logging::init_tracing};
use tracing::info;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("🚀 Starting Minesweeper game server");

    let rocket = build(Config::from_env())?;
    info!("📡 Endpoints: /users, /games, POST /games/<id>/<action>");

    rocket.launch().await?;
    Ok(())
}
