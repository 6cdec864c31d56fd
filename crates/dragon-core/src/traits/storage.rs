// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backend trait shared by the local key-value and relational backends.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::DragonError;
use crate::scope::MigrationReport;
use crate::types::{ActivityEvent, BackendKind, Profile, ReviewItem};

/// Durable persistence for review items, activity events, profiles and
/// settings.
///
/// A `profile_id` of `None` addresses the unscoped namespace (state written
/// before any profile existed). Implementations must be safe to share across
/// tasks; the selector hands one instance to every caller in the process.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Idempotent setup (schema creation, directory creation, connection open).
    async fn init(&self) -> Result<(), DragonError>;

    /// Flushes pending state and releases resources.
    async fn close(&self) -> Result<(), DragonError> {
        Ok(())
    }

    // --- Review items ---

    /// All review items of a profile keyed by item key. Empty if none.
    async fn items_load_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<HashMap<String, ReviewItem>, DragonError>;

    /// Insert or replace an item by `(profile_id, item.key)`.
    async fn item_upsert(
        &self,
        item: &ReviewItem,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError>;

    /// Delete an item. Deleting an absent key is not an error.
    async fn item_remove(&self, key: &str, profile_id: Option<&str>) -> Result<(), DragonError>;

    // --- Activity events ---

    async fn event_append(
        &self,
        event: &ActivityEvent,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError>;

    /// Events of a profile in append order.
    async fn events_read_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<Vec<ActivityEvent>, DragonError>;

    async fn events_clear(&self, profile_id: Option<&str>) -> Result<(), DragonError>;

    // --- Profiles ---

    async fn profiles_load(&self) -> Result<Vec<Profile>, DragonError>;

    /// Replace the saved profile list.
    async fn profiles_save(&self, profiles: &[Profile]) -> Result<(), DragonError>;

    async fn profiles_get_current(&self) -> Result<Option<String>, DragonError>;

    async fn profiles_set_current(&self, id: &str) -> Result<(), DragonError>;

    // --- Settings ---

    async fn setting_get(
        &self,
        key: &str,
        profile_id: Option<&str>,
    ) -> Result<Option<String>, DragonError>;

    async fn setting_set(
        &self,
        key: &str,
        value: &str,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError>;

    // --- Migration ---

    /// Copy legacy unscoped state into `profile_id`'s scope where the scoped
    /// destination does not exist yet. The global state is left in place, so
    /// calling this again is a no-op.
    async fn migrate_global_to_profile(
        &self,
        profile_id: &str,
    ) -> Result<MigrationReport, DragonError>;
}
