// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activity log queries.

use dragon_core::DragonError;
use dragon_core::types::ActivityEvent;
use rusqlite::params;
use tracing::warn;

use super::namespace;
use crate::database::{Database, map_tr_err};

/// Append one event. The full event is stored as JSON in `payload`.
pub async fn append(
    db: &Database,
    event: &ActivityEvent,
    profile_id: Option<&str>,
) -> Result<(), DragonError> {
    let ns = namespace(profile_id);
    let kind = event.kind();
    let t = event.timestamp();
    let payload = serde_json::to_string(event)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO activity_logs (profile_id, type, payload, t) VALUES (?1, ?2, ?3, ?4)",
                params![ns, kind, payload, t],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Events of a namespace in append order. Undecodable payloads are skipped.
pub async fn read_all(
    db: &Database,
    profile_id: Option<&str>,
) -> Result<Vec<ActivityEvent>, DragonError> {
    let ns = namespace(profile_id);
    let payloads = db
        .connection()
        .call(move |conn| -> Result<Vec<(i64, String)>, rusqlite::Error> {
            let mut stmt = conn
                .prepare("SELECT id, payload FROM activity_logs WHERE profile_id = ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![ns], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(payloads
        .into_iter()
        .filter_map(|(id, payload)| match serde_json::from_str(&payload) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(id, error = %e, "skipping undecodable activity event");
                None
            }
        })
        .collect())
}

pub async fn clear(db: &Database, profile_id: Option<&str>) -> Result<(), DragonError> {
    let ns = namespace(profile_id);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM activity_logs WHERE profile_id = ?1", params![ns])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
