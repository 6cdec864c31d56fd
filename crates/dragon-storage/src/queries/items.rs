// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review item queries.

use std::collections::HashMap;
use std::str::FromStr;

use dragon_core::types::{HistoryEntry, ItemType, MAX_BOX, MIN_BOX, ReviewItem};
use dragon_core::DragonError;
use rusqlite::params;
use tracing::warn;

use super::namespace;
use crate::database::{Database, map_tr_err};

/// A row as stored, before decoding the typed columns.
struct ItemRow {
    key: String,
    text: String,
    item_type: String,
    srs_box: i64,
    due: i64,
    added_at: i64,
    history: String,
}

impl ItemRow {
    fn decode(self) -> Option<ReviewItem> {
        let item_type = match ItemType::from_str(&self.item_type) {
            Ok(t) => t,
            Err(_) => {
                warn!(key = %self.key, item_type = %self.item_type, "skipping item with unknown type");
                return None;
            }
        };
        let history: Vec<HistoryEntry> = match serde_json::from_str(&self.history) {
            Ok(h) => h,
            Err(e) => {
                warn!(key = %self.key, error = %e, "skipping item with undecodable history");
                return None;
            }
        };
        let srs_box = self.srs_box.clamp(i64::from(MIN_BOX), i64::from(MAX_BOX)) as u8;
        Some(ReviewItem {
            key: self.key,
            text: self.text,
            item_type,
            srs_box,
            due: self.due,
            added_at: self.added_at,
            history,
        })
    }
}

/// Load every item in a namespace, skipping rows that fail to decode.
pub async fn load_all(
    db: &Database,
    profile_id: Option<&str>,
) -> Result<HashMap<String, ReviewItem>, DragonError> {
    let ns = namespace(profile_id);
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<ItemRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT key, text, type, box, due, addedAt, history
                 FROM srs_items WHERE profile_id = ?1",
            )?;
            let rows = stmt.query_map(params![ns], |row| {
                Ok(ItemRow {
                    key: row.get(0)?,
                    text: row.get(1)?,
                    item_type: row.get(2)?,
                    srs_box: row.get(3)?,
                    due: row.get(4)?,
                    added_at: row.get(5)?,
                    history: row.get(6)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(rows
        .into_iter()
        .filter_map(ItemRow::decode)
        .map(|item| (item.key.clone(), item))
        .collect())
}

/// Insert or replace an item by `(profile_id, key)` in one statement.
pub async fn upsert(
    db: &Database,
    item: &ReviewItem,
    profile_id: Option<&str>,
) -> Result<(), DragonError> {
    let ns = namespace(profile_id);
    let history = serde_json::to_string(&item.history)?;
    let item = item.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO srs_items (profile_id, key, text, type, box, due, addedAt, history)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(profile_id, key) DO UPDATE SET
                     text = excluded.text,
                     type = excluded.type,
                     box = excluded.box,
                     due = excluded.due,
                     addedAt = excluded.addedAt,
                     history = excluded.history",
                params![
                    ns,
                    item.key,
                    item.text,
                    item.item_type.to_string(),
                    item.srs_box,
                    item.due,
                    item.added_at,
                    history,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an item. Absent keys are not an error.
pub async fn remove(db: &Database, key: &str, profile_id: Option<&str>) -> Result<(), DragonError> {
    let ns = namespace(profile_id);
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM srs_items WHERE profile_id = ?1 AND key = ?2",
                params![ns, key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
