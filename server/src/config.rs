use std::{env, str::FromStr};

use tracing::warn;

const MIN_PASSWORD_COST: u32 = 4;
const MAX_PASSWORD_COST: u32 = 31;

/// Bounds applied when a board is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLimits {
    pub max_rows: usize,
    pub max_columns: usize,
    /// Lower bound of the mine ceiling. A board may always hold up to
    /// `cells - 1` mines, so this value only matters when it is larger, and
    /// then the one-safe-cell rule caps it again. In effect it never rejects a
    /// board on its own.
    pub max_mines: usize,
}

impl Default for BoardLimits {
    fn default() -> Self {
        Self {
            max_rows: 99,
            max_columns: 99,
            max_mines: 99,
        }
    }
}

/// Server configuration, read once at startup and handed to Rocket as state.
#[derive(Debug, Clone)]
pub struct Config {
    pub limits: BoardLimits,
    pub creations_per_minute: u32,
    pub cors_allowed_origins: Vec<String>,
    /// bcrypt work factor for stored passwords.
    pub password_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: BoardLimits::default(),
            creations_per_minute: 10,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable value for {}: {}", key, raw);
            default
        }),
        None => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str, default| parse_or(key, lookup(key), default);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allowed_origins);

        Self {
            limits: BoardLimits {
                max_rows: read("MAX_ROWS", defaults.limits.max_rows),
                max_columns: read("MAX_COLUMNS", defaults.limits.max_columns),
                max_mines: read("MAX_MINES", defaults.limits.max_mines),
            },
            creations_per_minute: parse_or(
                "RATE_LIMIT_GAMES_PER_MINUTE",
                lookup("RATE_LIMIT_GAMES_PER_MINUTE"),
                defaults.creations_per_minute,
            ),
            cors_allowed_origins,
            password_cost: parse_or(
                "PASSWORD_HASH_COST",
                lookup("PASSWORD_HASH_COST"),
                defaults.password_cost,
            )
            .clamp(MIN_PASSWORD_COST, MAX_PASSWORD_COST),
        }
    }
}
