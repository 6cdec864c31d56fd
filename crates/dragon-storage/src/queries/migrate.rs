// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Copy legacy unscoped rows into a profile's namespace.

use dragon_core::scope::{EVENTS_KEY, ITEMS_KEY, LEGACY_GLOBAL_KEYS, MigrationReport};
use dragon_core::DragonError;
use rusqlite::params;

use super::UNSCOPED;
use crate::database::{Database, map_tr_err};

/// Items are copied only when the profile has none, events likewise, and
/// legacy settings per key with insert-or-ignore. The unscoped rows stay.
pub async fn global_to_profile(
    db: &Database,
    profile_id: &str,
) -> Result<MigrationReport, DragonError> {
    if profile_id.is_empty() {
        return Ok(MigrationReport::default());
    }
    let pid = profile_id.to_string();
    let copied = db
        .connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut copied = Vec::new();

            let has_items: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM srs_items WHERE profile_id = ?1)",
                params![pid],
                |row| row.get(0),
            )?;
            if !has_items {
                let n = tx.execute(
                    "INSERT INTO srs_items (profile_id, key, text, type, box, due, addedAt, history)
                     SELECT ?1, key, text, type, box, due, addedAt, history
                     FROM srs_items WHERE profile_id = ?2",
                    params![pid, UNSCOPED],
                )?;
                if n > 0 {
                    copied.push(ITEMS_KEY.to_string());
                }
            }

            let has_events: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM activity_logs WHERE profile_id = ?1)",
                params![pid],
                |row| row.get(0),
            )?;
            if !has_events {
                let n = tx.execute(
                    "INSERT INTO activity_logs (profile_id, type, payload, t)
                     SELECT ?1, type, payload, t FROM activity_logs
                     WHERE profile_id = ?2 ORDER BY id",
                    params![pid, UNSCOPED],
                )?;
                if n > 0 {
                    copied.push(EVENTS_KEY.to_string());
                }
            }

            for key in LEGACY_GLOBAL_KEYS
                .iter()
                .filter(|k| **k != ITEMS_KEY && **k != EVENTS_KEY)
            {
                let n = tx.execute(
                    "INSERT OR IGNORE INTO settings (profile_id, key, value)
                     SELECT ?1, key, value FROM settings WHERE profile_id = ?2 AND key = ?3",
                    params![pid, UNSCOPED, key],
                )?;
                if n > 0 {
                    copied.push((*key).to_string());
                }
            }

            tx.commit()?;
            Ok(copied)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(MigrationReport { copied })
}
