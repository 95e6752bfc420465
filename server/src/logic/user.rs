use std::fmt::Write;

use chrono::{DateTime, Utc};
use minesweeper_common::models::{NewUser, UserStats, UserUpdate, UserView};
use sha2::{Digest, Sha256};

use crate::{
    data::User,
    error::{GameError, Result},
};

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// bcrypt only reads the first 72 bytes, so passwords are condensed first.
fn prehash(password: &str) -> String {
    to_hex(&Sha256::digest(password.as_bytes()))
}

/// bcrypt hash (with its own salt and cost) of the SHA-256 of `password`.
fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(prehash(password), cost)
        .map_err(|e| GameError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(candidate: &str, stored: &str) -> bool {
    bcrypt::verify(prehash(candidate), stored).unwrap_or(false)
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn load_name(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > 255 {
        return Err(GameError::InvalidUser(format!(
            "{field} must be between 1 and 255 characters"
        )));
    }
    Ok(value.to_lowercase())
}

fn load_email(value: &str) -> Result<String> {
    let value = value.trim();
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    });
    if !valid {
        return Err(GameError::InvalidUser(format!("'{value}' is not a valid email")));
    }
    Ok(value.to_lowercase())
}

fn check_password(value: &str) -> Result<()> {
    let length = value.chars().count();
    let has_alpha = value.chars().any(char::is_alphabetic);
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(8..=64).contains(&length) || !has_alpha || !has_digit {
        return Err(GameError::InvalidUser(
            "password must contain between 8 and 64 characters, with letters and digits"
                .to_string(),
        ));
    }
    Ok(())
}

impl User {
    /// Validates a registration and hashes its password. The id is assigned
    /// by the store.
    pub fn register(params: NewUser, cost: u32, now: DateTime<Utc>) -> Result<Self> {
        let name_first = load_name("name_first", &params.name_first)?;
        let name_last = load_name("name_last", &params.name_last)?;
        let email = load_email(&params.email)?;
        check_password(&params.password)?;

        Ok(Self {
            id: String::new(),
            name_first,
            name_last,
            email,
            password_hash: hash_password(&params.password, cost)?,
            stats: UserStats::default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrites every user-supplied field. Id, stats and creation time are
    /// kept.
    pub fn replace(&mut self, params: NewUser, cost: u32, now: DateTime<Utc>) -> Result<()> {
        let update = UserUpdate {
            name_first: Some(params.name_first),
            name_last: Some(params.name_last),
            email: Some(params.email),
            password: Some(params.password),
        };
        self.update(update, cost, now)
    }

    /// Applies the fields present in `update`, validating all of them before
    /// touching anything.
    pub fn update(&mut self, update: UserUpdate, cost: u32, now: DateTime<Utc>) -> Result<()> {
        let name_first = update
            .name_first
            .map(|v| load_name("name_first", &v))
            .transpose()?;
        let name_last = update
            .name_last
            .map(|v| load_name("name_last", &v))
            .transpose()?;
        let email = update.email.map(|v| load_email(&v)).transpose()?;
        let password_hash = match &update.password {
            Some(password) => {
                check_password(password)?;
                // Resubmitting the current password keeps the stored hash.
                if self.verify_password(password) {
                    None
                } else {
                    Some(hash_password(password, cost)?)
                }
            }
            None => None,
        };

        if let Some(name_first) = name_first {
            self.name_first = name_first;
        }
        if let Some(name_last) = name_last {
            self.name_last = name_last;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(password_hash) = password_hash {
            self.password_hash = password_hash;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn stats(&self) -> UserStats {
        self.stats
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        verify_password(candidate, &self.password_hash)
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name_first: title_case(&self.name_first),
            name_last: title_case(&self.name_last),
            email: self.email.clone(),
            stats: self.stats,
        }
    }
}
