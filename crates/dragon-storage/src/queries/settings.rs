// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-profile key/value settings.

use dragon_core::DragonError;
use rusqlite::{OptionalExtension, params};

use super::namespace;
use crate::database::{Database, map_tr_err};

pub async fn get(
    db: &Database,
    key: &str,
    profile_id: Option<&str>,
) -> Result<Option<String>, DragonError> {
    let ns = namespace(profile_id);
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM settings WHERE profile_id = ?1 AND key = ?2",
                params![ns, key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set(
    db: &Database,
    key: &str,
    value: &str,
    profile_id: Option<&str>,
) -> Result<(), DragonError> {
    let ns = namespace(profile_id);
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO settings (profile_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(profile_id, key) DO UPDATE SET value = excluded.value",
                params![ns, key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settings_are_scoped() {
        let db = Database::open_in_memory().await.unwrap();
        set(&db, "ui.lang", "en", None).await.unwrap();
        set(&db, "ui.lang", "vi", Some("p1")).await.unwrap();
        set(&db, "ui.lang", "zh", Some("p1")).await.unwrap();

        assert_eq!(get(&db, "ui.lang", None).await.unwrap().as_deref(), Some("en"));
        assert_eq!(get(&db, "ui.lang", Some("p1")).await.unwrap().as_deref(), Some("zh"));
        assert_eq!(get(&db, "ui.lang", Some("p2")).await.unwrap(), None);
    }
}
