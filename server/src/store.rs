use dashmap::{DashMap, Entry};
use nanoid::nanoid;
use tracing::{debug, info, instrument, warn};

use crate::{
    data::{Game, User},
    error::{GameError, Result},
    logic::Outcome,
};

/// In-memory storage for users and games, keyed by nanoid.
///
/// Each record is replaced as a whole on save, so readers never observe a
/// half-applied action.
#[derive(Debug, Default)]
pub struct Store {
    users: DashMap<String, User>,
    /// Lower-cased email to user id, kept in step with `users`.
    emails: DashMap<String, String>,
    games: DashMap<String, Game>,
}

/// Inserts under a fresh id, growing the id length after repeated collisions.
///
/// `admit` runs while the new slot is held, so whatever it checks still holds
/// once the value is visible.
fn insert_with_fresh_id<V: Clone>(
    map: &DashMap<String, V>,
    value: V,
    assign: impl Fn(&mut V, &str),
    admit: impl Fn(&V) -> Result<()>,
) -> Result<V> {
    let mut id_length = 5;
    let max_attempts_per_length = 10;

    loop {
        for _ in 0..max_attempts_per_length {
            let id = nanoid!(id_length);
            match map.entry(id.clone()) {
                Entry::Occupied(_) => {
                    debug!("ID collision, trying another: {}", id);
                    continue;
                }
                Entry::Vacant(entry) => {
                    admit(&value)?;
                    let mut value = value;
                    assign(&mut value, &id);
                    entry.insert(value.clone());
                    return Ok(value);
                }
            }
        }

        warn!(
            "Exhausted ID attempts at length {}, increasing to {}",
            id_length,
            id_length + 1
        );
        id_length += 1;
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new user, refusing an email that is already registered.
    #[instrument(level = "trace", skip(self, user), fields(email = %user.email))]
    pub fn insert_user(&self, user: User) -> Result<User> {
        let email = user.email.clone();
        let reservation = match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => return Err(GameError::EmailInUse(email)),
            Entry::Vacant(entry) => entry,
        };

        let user = insert_with_fresh_id(
            &self.users,
            user,
            |user, id| user.id = id.to_string(),
            |_| Ok(()),
        )?;
        reservation.insert(user.id.clone());
        info!("Created user {}", user.id);
        Ok(user)
    }

    pub fn load_user(&self, id: &str) -> Result<User> {
        self.users
            .get(id)
            .map(|user| user.clone())
            .ok_or_else(|| GameError::UserNotFound(id.to_string()))
    }

    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|user| user.created_at);
        users
    }

    /// Replaces a stored user, moving its email reservation if it changed.
    #[instrument(level = "trace", skip(self, user), fields(user_id = %user.id))]
    pub fn save_user(&self, user: User) -> Result<User> {
        let previous = self.load_user(&user.id)?;

        if previous.email != user.email {
            match self.emails.entry(user.email.clone()) {
                Entry::Occupied(_) => return Err(GameError::EmailInUse(user.email)),
                Entry::Vacant(entry) => {
                    entry.insert(user.id.clone());
                }
            }
            self.emails.remove(&previous.email);
        }

        let mut slot = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| GameError::UserNotFound(user.id.clone()))?;
        // Stats may have moved since `user` was loaded.
        let stats = slot.stats;
        *slot = User { stats, ..user };
        debug!("Saved user {}", slot.id);
        Ok(slot.clone())
    }

    /// Removes a user together with every game it owns.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_user(&self, id: &str) -> Result<()> {
        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| GameError::UserNotFound(id.to_string()))?;
        self.emails.remove(&user.email);

        let before = self.games.len();
        self.games.retain(|_, game| game.player_id != id);
        info!(
            "Removed user {} and {} of their games",
            id,
            before.saturating_sub(self.games.len())
        );
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn increment_user_stat(&self, id: &str, outcome: Outcome) -> Result<()> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| GameError::UserNotFound(id.to_string()))?;
        match outcome {
            Outcome::Won => user.stats.won += 1,
            Outcome::Lost => user.stats.lost += 1,
        }
        debug!("User {} stats now {:?}", id, user.stats);
        Ok(())
    }

    /// Stores a new game, provided its player still exists.
    ///
    /// The player is checked while the game's slot is held, so a concurrent
    /// [`Store::remove_user`] either rejects this insert or cascades over it.
    #[instrument(level = "trace", skip(self, game), fields(player_id = %game.player_id))]
    pub fn insert_game(&self, game: Game) -> Result<Game> {
        insert_with_fresh_id(
            &self.games,
            game,
            |game, id| game.id = id.to_string(),
            |game| {
                if self.users.contains_key(&game.player_id) {
                    Ok(())
                } else {
                    Err(GameError::UserNotFound(game.player_id.clone()))
                }
            },
        )
    }

    pub fn load_game(&self, id: &str) -> Result<Game> {
        self.games
            .get(id)
            .map(|game| game.clone())
            .ok_or_else(|| GameError::GameNotFound(id.to_string()))
    }

    /// Games sorted by creation time, optionally only those of one player.
    pub fn list_games(&self, player_id: Option<&str>) -> Vec<Game> {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .filter(|entry| player_id.is_none_or(|player| entry.player_id == player))
            .map(|entry| entry.value().clone())
            .collect();
        games.sort_by_key(|game| game.created_at);
        games
    }

    /// Compare-and-swap save of a game loaded earlier.
    ///
    /// Fails with [`GameError::Conflict`] if the stored version moved since
    /// `game` was loaded. When `outcome` is given the player's stat is bumped
    /// in the same critical section; if that fails nothing is written.
    #[instrument(level = "trace", skip(self, game), fields(game_id = %game.id, version = game.version))]
    pub fn save_game(&self, mut game: Game, outcome: Option<Outcome>) -> Result<Game> {
        let mut slot = self
            .games
            .get_mut(&game.id)
            .ok_or_else(|| GameError::GameNotFound(game.id.clone()))?;

        if slot.version != game.version {
            warn!(
                "Stale save of game {}: stored version {}, given {}",
                game.id, slot.version, game.version
            );
            return Err(GameError::Conflict(game.id));
        }

        if let Some(outcome) = outcome {
            self.increment_user_stat(&game.player_id, outcome)?;
        }

        game.version += 1;
        *slot = game.clone();
        debug!("Saved game {} at version {}", game.id, game.version);
        Ok(game)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn remove_game(&self, id: &str) -> Result<()> {
        self.games
            .remove(id)
            .map(|_| info!("Removed game {}", id))
            .ok_or_else(|| GameError::GameNotFound(id.to_string()))
    }
}
