use chrono::Utc;
use minesweeper_common::{
    models::{GameView, NewGame, NewUser, Records, UserUpdate, UserView},
    protocol::ErrorResponse,
};
use rocket::{
    Request, State, catch, delete, get, http::Status, patch, post, put, serde::json::Json,
};
use serde_json::Value;
use tokio::task;
use tracing::{debug, info, instrument};

use crate::{
    config::Config,
    data::User,
    error::{GameError, Result},
    logic,
    media::RequireJson,
    rate_limit::{ClientIp, RateLimiter},
    store::Store,
};

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?
}

#[post("/users", data = "<params>")]
#[instrument(level = "trace", skip(json, params, store, config, rate_limiter), fields(client_ip = %client_ip.0))]
pub async fn create_user(
    json: RequireJson,
    params: Json<NewUser>,
    store: &State<Store>,
    config: &State<Config>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<UserView>> {
    json?;
    rate_limiter.check(&client_ip)?;

    let params = params.into_inner();
    let (cost, now) = (config.password_cost, Utc::now());
    // Password hashing is CPU bound.
    let user = blocking(move || User::register(params, cost, now)).await?;
    let user = store.insert_user(user)?;

    info!("Registered user {} from {}", user.id(), client_ip.0);
    Ok(Json(user.view()))
}

#[get("/users")]
pub fn list_users(json: RequireJson, store: &State<Store>) -> Result<Json<Records<UserView>>> {
    json?;
    let users: Vec<UserView> = store.list_users().iter().map(User::view).collect();
    Ok(Json(users.into()))
}

#[get("/users/<id>")]
pub fn get_user(id: &str, json: RequireJson, store: &State<Store>) -> Result<Json<UserView>> {
    json?;
    Ok(Json(store.load_user(id)?.view()))
}

/// Full update: every field is required, as on registration.
#[put("/users/<id>", data = "<params>")]
#[instrument(level = "trace", skip(json, params, store, config))]
pub async fn replace_user(
    id: &str,
    json: RequireJson,
    params: Json<NewUser>,
    store: &State<Store>,
    config: &State<Config>,
) -> Result<Json<UserView>> {
    json?;
    let mut user = store.load_user(id)?;
    let params = params.into_inner();
    let (cost, now) = (config.password_cost, Utc::now());

    let user = blocking(move || {
        user.replace(params, cost, now)?;
        Ok(user)
    })
    .await?;
    let user = store.save_user(user)?;

    debug!("Replaced user {}", user.id());
    Ok(Json(user.view()))
}

#[patch("/users/<id>", data = "<update>")]
#[instrument(level = "trace", skip(json, update, store, config))]
pub async fn update_user(
    id: &str,
    json: RequireJson,
    update: Json<UserUpdate>,
    store: &State<Store>,
    config: &State<Config>,
) -> Result<Json<UserView>> {
    json?;
    let mut user = store.load_user(id)?;
    let update = update.into_inner();
    let (cost, now) = (config.password_cost, Utc::now());

    let user = blocking(move || {
        user.update(update, cost, now)?;
        Ok(user)
    })
    .await?;
    let user = store.save_user(user)?;

    debug!("Updated user {}", user.id());
    Ok(Json(user.view()))
}

#[delete("/users/<id>")]
pub fn delete_user(id: &str, json: RequireJson, store: &State<Store>) -> Result<Status> {
    json?;
    store.remove_user(id)?;
    Ok(Status::NoContent)
}

#[post("/games", data = "<params>")]
#[instrument(level = "trace", skip(json, store, config, rate_limiter), fields(client_ip = %client_ip.0))]
pub fn create_game(
    json: RequireJson,
    params: Json<NewGame>,
    store: &State<Store>,
    config: &State<Config>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<GameView>> {
    json?;
    info!(
        "Game creation request from {}: {}x{} with {} mines",
        client_ip.0, params.board.nbr_rows, params.board.nbr_columns, params.board.nbr_mines
    );
    rate_limiter.check(&client_ip)?;

    let now = Utc::now();
    let game = logic::create_game(
        store,
        &config.limits,
        params.into_inner(),
        &mut rand::rng(),
        now,
    )?;
    Ok(Json(game.view(now)))
}

#[get("/games?<player_id>")]
pub fn list_games(
    player_id: Option<&str>,
    json: RequireJson,
    store: &State<Store>,
) -> Result<Json<Records<GameView>>> {
    json?;
    let now = Utc::now();
    let games: Vec<GameView> = store
        .list_games(player_id)
        .iter()
        .map(|game| game.view(now))
        .collect();
    Ok(Json(games.into()))
}

#[get("/games/<id>")]
pub fn get_game(id: &str, json: RequireJson, store: &State<Store>) -> Result<Json<GameView>> {
    json?;
    Ok(Json(store.load_game(id)?.view(Utc::now())))
}

#[delete("/games/<id>")]
pub fn delete_game(id: &str, json: RequireJson, store: &State<Store>) -> Result<Status> {
    json?;
    store.remove_game(id)?;
    Ok(Status::NoContent)
}

#[post("/games/<id>/<action>", data = "<payload>")]
#[instrument(level = "trace", skip(json, payload, store), fields(game_id = %id))]
pub fn perform_action(
    id: &str,
    action: &str,
    json: RequireJson,
    payload: Option<Json<Value>>,
    store: &State<Store>,
) -> Result<Json<GameView>> {
    json?;
    let payload = payload.map(Json::into_inner);
    let view = logic::perform(store, id, action, payload.as_ref(), Utc::now())?;
    debug!("Game {} is now {} after '{}'", id, view.status, action);
    Ok(Json(view))
}

#[catch(default)]
pub fn default_catcher(status: Status, req: &Request<'_>) -> (Status, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            title: status.reason().unwrap_or("Error").to_string(),
            description: format!("Could not process {} {}", req.method(), req.uri()),
        }),
    )
}
