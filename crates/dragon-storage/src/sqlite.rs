// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`StorageBackend`] trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use dragon_config::model::{BackendPreference, StorageConfig};
use dragon_core::types::{ActivityEvent, BackendKind, Profile, ReviewItem};
use dragon_core::{DragonError, MigrationReport, StorageBackend};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage.
///
/// The database is opened lazily by [`StorageBackend::init`]; every other
/// operation fails with [`DragonError::NotInitialized`] until then.
pub struct SqliteBackend {
    database_path: String,
    wal_mode: bool,
    db: OnceCell<Database>,
}

impl SqliteBackend {
    /// Construct the backend if the configuration allows it.
    ///
    /// Returns `Ok(None)` when the preference is `local`; that is not an error.
    pub fn try_new(config: &StorageConfig) -> Result<Option<Self>, DragonError> {
        if config.backend == BackendPreference::Local {
            return Ok(None);
        }
        if config.database_path.trim().is_empty() {
            return Err(DragonError::Config(
                "storage.database_path must not be empty".to_string(),
            ));
        }
        Ok(Some(Self::new(config.database_path.clone(), config.wal_mode)))
    }

    pub fn new(database_path: impl Into<String>, wal_mode: bool) -> Self {
        Self {
            database_path: database_path.into(),
            wal_mode,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database (used with in-memory databases).
    pub fn with_database(db: Database) -> Self {
        Self {
            database_path: ":memory:".to_string(),
            wal_mode: false,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, DragonError> {
        self.db.get().ok_or(DragonError::NotInitialized)
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn init(&self) -> Result<(), DragonError> {
        self.db
            .get_or_try_init(|| Database::open(&self.database_path, self.wal_mode))
            .await?;
        debug!(path = %self.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DragonError> {
        if let Some(db) = self.db.get() {
            if self.wal_mode {
                db.checkpoint().await?;
            }
        }
        Ok(())
    }

    // --- Review items ---

    async fn items_load_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<HashMap<String, ReviewItem>, DragonError> {
        queries::items::load_all(self.db()?, profile_id).await
    }

    async fn item_upsert(
        &self,
        item: &ReviewItem,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        queries::items::upsert(self.db()?, item, profile_id).await
    }

    async fn item_remove(&self, key: &str, profile_id: Option<&str>) -> Result<(), DragonError> {
        queries::items::remove(self.db()?, key, profile_id).await
    }

    // --- Activity events ---

    async fn event_append(
        &self,
        event: &ActivityEvent,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        queries::events::append(self.db()?, event, profile_id).await
    }

    async fn events_read_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<Vec<ActivityEvent>, DragonError> {
        queries::events::read_all(self.db()?, profile_id).await
    }

    async fn events_clear(&self, profile_id: Option<&str>) -> Result<(), DragonError> {
        queries::events::clear(self.db()?, profile_id).await
    }

    // --- Profiles ---

    async fn profiles_load(&self) -> Result<Vec<Profile>, DragonError> {
        queries::profiles::load(self.db()?).await
    }

    async fn profiles_save(&self, profiles: &[Profile]) -> Result<(), DragonError> {
        queries::profiles::save(self.db()?, profiles).await
    }

    async fn profiles_get_current(&self) -> Result<Option<String>, DragonError> {
        queries::profiles::get_current(self.db()?).await
    }

    async fn profiles_set_current(&self, id: &str) -> Result<(), DragonError> {
        queries::profiles::set_current(self.db()?, id).await
    }

    // --- Settings ---

    async fn setting_get(
        &self,
        key: &str,
        profile_id: Option<&str>,
    ) -> Result<Option<String>, DragonError> {
        queries::settings::get(self.db()?, key, profile_id).await
    }

    async fn setting_set(
        &self,
        key: &str,
        value: &str,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        queries::settings::set(self.db()?, key, value, profile_id).await
    }

    // --- Migration ---

    async fn migrate_global_to_profile(
        &self,
        profile_id: &str,
    ) -> Result<MigrationReport, DragonError> {
        queries::migrate::global_to_profile(self.db()?, profile_id).await
    }
}
