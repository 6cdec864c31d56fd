// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local backend: JSON blobs in a [`KvStore`], one blob per scoped key.
//!
//! Every write rewrites the whole blob. A blob that fails to decode is
//! treated as empty and the next write replaces it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use dragon_core::scope::{
    EVENTS_KEY, ITEMS_KEY, LEGACY_GLOBAL_KEYS, PROFILE_CURRENT_KEY, PROFILE_LIST_KEY,
};
use dragon_core::types::{ActivityEvent, BackendKind, MAX_BOX, MIN_BOX, Profile, ReviewItem};
use dragon_core::{DragonError, MigrationReport, StorageBackend, scoped_key};

use crate::kv::{KvStore, MemoryKvStore};

/// Key-value backed storage.
pub struct LocalBackend {
    store: Arc<dyn KvStore>,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl LocalBackend {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Backend over a fresh [`MemoryKvStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    async fn read_json<T>(&self, key: &str) -> Result<T, DragonError>
    where
        T: DeserializeOwned + Default,
    {
        match self.store.get(key).await? {
            None => Ok(T::default()),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(value),
                Err(e) => {
                    warn!(key, error = %e, "corrupt blob, treating as empty");
                    Ok(T::default())
                }
            },
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DragonError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw).await
    }

    async fn items_blob(
        &self,
        profile_id: Option<&str>,
    ) -> Result<HashMap<String, ReviewItem>, DragonError> {
        self.read_json(&scoped_key(ITEMS_KEY, profile_id)).await
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn init(&self) -> Result<(), DragonError> {
        self.store.init().await
    }

    // --- Review items ---

    async fn items_load_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<HashMap<String, ReviewItem>, DragonError> {
        let mut items = self.items_blob(profile_id).await?;
        for item in items.values_mut() {
            item.srs_box = item.srs_box.clamp(MIN_BOX, MAX_BOX);
        }
        Ok(items)
    }

    async fn item_upsert(
        &self,
        item: &ReviewItem,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.items_blob(profile_id).await?;
        items.insert(item.key.clone(), item.clone());
        self.write_json(&scoped_key(ITEMS_KEY, profile_id), &items)
            .await?;
        debug!(key = %item.key, profile_id, "item stored");
        Ok(())
    }

    async fn item_remove(&self, key: &str, profile_id: Option<&str>) -> Result<(), DragonError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.items_blob(profile_id).await?;
        if items.remove(key).is_some() {
            self.write_json(&scoped_key(ITEMS_KEY, profile_id), &items)
                .await?;
        }
        Ok(())
    }

    // --- Activity events ---

    async fn event_append(
        &self,
        event: &ActivityEvent,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        let _guard = self.write_lock.lock().await;
        let key = scoped_key(EVENTS_KEY, profile_id);
        let mut events: Vec<ActivityEvent> = self.read_json(&key).await?;
        events.push(event.clone());
        self.write_json(&key, &events).await
    }

    async fn events_read_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<Vec<ActivityEvent>, DragonError> {
        self.read_json(&scoped_key(EVENTS_KEY, profile_id)).await
    }

    async fn events_clear(&self, profile_id: Option<&str>) -> Result<(), DragonError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&scoped_key(EVENTS_KEY, profile_id)).await
    }

    // --- Profiles ---

    async fn profiles_load(&self) -> Result<Vec<Profile>, DragonError> {
        self.read_json(PROFILE_LIST_KEY).await
    }

    async fn profiles_save(&self, profiles: &[Profile]) -> Result<(), DragonError> {
        let _guard = self.write_lock.lock().await;
        self.write_json(PROFILE_LIST_KEY, profiles).await
    }

    async fn profiles_get_current(&self) -> Result<Option<String>, DragonError> {
        Ok(self
            .store
            .get(PROFILE_CURRENT_KEY)
            .await?
            .filter(|id| !id.is_empty()))
    }

    async fn profiles_set_current(&self, id: &str) -> Result<(), DragonError> {
        self.store.set(PROFILE_CURRENT_KEY, id).await
    }

    // --- Settings ---

    async fn setting_get(
        &self,
        key: &str,
        profile_id: Option<&str>,
    ) -> Result<Option<String>, DragonError> {
        self.store.get(&scoped_key(key, profile_id)).await
    }

    async fn setting_set(
        &self,
        key: &str,
        value: &str,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        self.store.set(&scoped_key(key, profile_id), value).await
    }

    // --- Migration ---

    async fn migrate_global_to_profile(
        &self,
        profile_id: &str,
    ) -> Result<MigrationReport, DragonError> {
        let mut report = MigrationReport::default();
        if profile_id.is_empty() {
            return Ok(report);
        }

        let _guard = self.write_lock.lock().await;
        for base in LEGACY_GLOBAL_KEYS {
            let Some(global) = self.store.get(base).await? else {
                continue;
            };
            let target = scoped_key(base, Some(profile_id));
            if self.store.get(&target).await?.is_some() {
                continue;
            }
            self.store.set(&target, &global).await?;
            report.copied.push((*base).to_string());
        }

        if !report.is_empty() {
            debug!(profile_id, copied = ?report.copied, "migrated global state into profile");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragon_core::types::ItemType;

    fn item(text: &str) -> ReviewItem {
        ReviewItem {
            key: ReviewItem::key_for(ItemType::Phrase, text),
            text: text.to_string(),
            item_type: ItemType::Phrase,
            srs_box: 2,
            due: 10,
            added_at: 1,
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn items_are_stored_under_scoped_keys() {
        let backend = LocalBackend::in_memory();
        backend.item_upsert(&item("xin chao"), Some("p1")).await.unwrap();

        let raw = backend.store().get("srs.items::p1").await.unwrap();
        assert!(raw.unwrap().contains("phrase:xin chao"));
        assert!(backend.store().get("srs.items").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_blob_reads_as_empty_and_is_replaced() {
        let backend = LocalBackend::in_memory();
        backend.store().set("srs.items", "{oops").await.unwrap();
        assert!(backend.items_load_all(None).await.unwrap().is_empty());

        backend.item_upsert(&item("a"), None).await.unwrap();
        assert_eq!(backend.items_load_all(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_do_not_lose_entries() {
        let backend = Arc::new(LocalBackend::in_memory());
        let mut handles = Vec::new();
        for i in 0..20 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.item_upsert(&item(&format!("w{i}")), Some("p")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(backend.items_load_all(Some("p")).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn migration_copies_only_missing_keys() {
        let backend = LocalBackend::in_memory();
        backend.store().set("ui.lang", "vi").await.unwrap();
        backend.store().set("dialect.playbackRate", "0.8").await.unwrap();
        backend.store().set("ui.lang::p1", "en").await.unwrap();

        let report = backend.migrate_global_to_profile("p1").await.unwrap();
        assert_eq!(report.copied, vec!["dialect.playbackRate".to_string()]);
        assert_eq!(
            backend.setting_get("ui.lang", Some("p1")).await.unwrap().as_deref(),
            Some("en")
        );
        assert_eq!(
            backend.setting_get("ui.lang", None).await.unwrap().as_deref(),
            Some("vi")
        );
        assert!(backend.migrate_global_to_profile("p1").await.unwrap().is_empty());
    }
}
