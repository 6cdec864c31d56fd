// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile table queries and the current-profile pointer.

use std::str::FromStr;

use dragon_core::DragonError;
use dragon_core::scope::PROFILE_CURRENT_KEY;
use dragon_core::types::{Avatar, Profile};
use rusqlite::params;
use tracing::warn;

use super::{UNSCOPED, settings};
use crate::database::{Database, map_tr_err};

/// Load all saved profiles ordered by creation time.
pub async fn load(db: &Database) -> Result<Vec<Profile>, DragonError> {
    db.connection()
        .call(|conn| -> Result<Vec<Profile>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, name, avatar, createdAt, lastActiveAt, pinHash
                 FROM profiles ORDER BY createdAt, id",
            )?;
            let rows = stmt.query_map([], |row| {
                let id: String = row.get(0)?;
                let avatar: String = row.get(2)?;
                let avatar = Avatar::from_str(&avatar).unwrap_or_else(|_| {
                    warn!(id = %id, avatar = %avatar, "unknown avatar, using default");
                    Avatar::default()
                });
                Ok(Profile {
                    id,
                    name: row.get(1)?,
                    avatar,
                    created_at: row.get(3)?,
                    last_active_at: row.get(4)?,
                    pin_hash: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the whole profile table in one transaction.
pub async fn save(db: &Database, profiles: &[Profile]) -> Result<(), DragonError> {
    let profiles = profiles.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM profiles", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO profiles (id, name, avatar, createdAt, lastActiveAt, pinHash)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for p in &profiles {
                    stmt.execute(params![
                        p.id,
                        p.name,
                        p.avatar.to_string(),
                        p.created_at,
                        p.last_active_at,
                        p.pin_hash,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_current(db: &Database) -> Result<Option<String>, DragonError> {
    settings::get(db, PROFILE_CURRENT_KEY, Some(UNSCOPED)).await
}

pub async fn set_current(db: &Database, id: &str) -> Result<(), DragonError> {
    settings::set(db, PROFILE_CURRENT_KEY, id, Some(UNSCOPED)).await
}
