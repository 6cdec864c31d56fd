// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock storage backend for deterministic testing.
//!
//! `MockBackend` keeps everything in memory, records each mutating call with
//! the profile it was addressed to, and can be told to fail writes or to
//! park writes and loads until a test releases them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use dragon_core::scope::{EVENTS_KEY, ITEMS_KEY, LEGACY_GLOBAL_KEYS};
use dragon_core::types::{ActivityEvent, BackendKind, Profile, ReviewItem};
use dragon_core::{DragonError, MigrationReport, StorageBackend};

/// A mutating call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Upsert { key: String, profile: Option<String> },
    Remove { key: String, profile: Option<String> },
    Append { kind: String, profile: Option<String> },
    ClearEvents { profile: Option<String> },
    SaveProfiles { count: usize },
    SetCurrent { id: String },
    SetSetting { key: String, profile: Option<String> },
    Migrate { profile: String },
}

#[derive(Default)]
struct State {
    items: HashMap<String, HashMap<String, ReviewItem>>,
    events: HashMap<String, Vec<ActivityEvent>>,
    profiles: Vec<Profile>,
    current: Option<String>,
    settings: HashMap<(String, String), String>,
}

fn ns(profile_id: Option<&str>) -> String {
    profile_id.unwrap_or_default().to_string()
}

fn owned(profile_id: Option<&str>) -> Option<String> {
    profile_id.map(str::to_string)
}

/// In-memory [`StorageBackend`] for engine and profile tests.
pub struct MockBackend {
    state: Mutex<State>,
    calls: Mutex<Vec<RecordedCall>>,
    fail_writes: AtomicBool,
    fail_loads: AtomicBool,
    write_gate: Arc<RwLock<()>>,
    load_gate: Arc<RwLock<()>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            calls: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            write_gate: Arc::new(RwLock::new(())),
            load_gate: Arc::new(RwLock::new(())),
        }
    }

    /// Make every mutating call fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `items_load_all` fail with a storage error.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Park all item and event writes until the guard is dropped.
    pub async fn hold_writes(&self) -> OwnedRwLockWriteGuard<()> {
        self.write_gate.clone().write_owned().await
    }

    /// Park `items_load_all` until the guard is dropped.
    pub async fn hold_loads(&self) -> OwnedRwLockWriteGuard<()> {
        self.load_gate.clone().write_owned().await
    }

    /// Every mutating call so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Seed an item without recording a call.
    pub async fn seed_item(&self, item: ReviewItem, profile_id: Option<&str>) {
        self.state
            .lock()
            .await
            .items
            .entry(ns(profile_id))
            .or_default()
            .insert(item.key.clone(), item);
    }

    /// Seed a setting without recording a call.
    pub async fn seed_setting(&self, key: &str, value: &str, profile_id: Option<&str>) {
        self.state
            .lock()
            .await
            .settings
            .insert((ns(profile_id), key.to_string()), value.to_string());
    }

    /// Items currently stored for a profile, without the load gate.
    pub async fn stored_items(&self, profile_id: Option<&str>) -> HashMap<String, ReviewItem> {
        self.state
            .lock()
            .await
            .items
            .get(&ns(profile_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Events currently stored for a profile.
    pub async fn stored_events(&self, profile_id: Option<&str>) -> Vec<ActivityEvent> {
        self.state
            .lock()
            .await
            .events
            .get(&ns(profile_id))
            .cloned()
            .unwrap_or_default()
    }

    async fn write(&self, call: RecordedCall) -> Result<(), DragonError> {
        self.calls.lock().await.push(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DragonError::Storage {
                source: "injected write failure".into(),
            });
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn init(&self) -> Result<(), DragonError> {
        Ok(())
    }

    async fn items_load_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<HashMap<String, ReviewItem>, DragonError> {
        let _gate = self.load_gate.read().await;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(DragonError::Storage {
                source: "injected load failure".into(),
            });
        }
        Ok(self.stored_items(profile_id).await)
    }

    async fn item_upsert(
        &self,
        item: &ReviewItem,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        let _gate = self.write_gate.read().await;
        self.write(RecordedCall::Upsert {
            key: item.key.clone(),
            profile: owned(profile_id),
        })
        .await?;
        self.seed_item(item.clone(), profile_id).await;
        Ok(())
    }

    async fn item_remove(&self, key: &str, profile_id: Option<&str>) -> Result<(), DragonError> {
        let _gate = self.write_gate.read().await;
        self.write(RecordedCall::Remove {
            key: key.to_string(),
            profile: owned(profile_id),
        })
        .await?;
        if let Some(items) = self.state.lock().await.items.get_mut(&ns(profile_id)) {
            items.remove(key);
        }
        Ok(())
    }

    async fn event_append(
        &self,
        event: &ActivityEvent,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        let _gate = self.write_gate.read().await;
        self.write(RecordedCall::Append {
            kind: event.kind().to_string(),
            profile: owned(profile_id),
        })
        .await?;
        self.state
            .lock()
            .await
            .events
            .entry(ns(profile_id))
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn events_read_all(
        &self,
        profile_id: Option<&str>,
    ) -> Result<Vec<ActivityEvent>, DragonError> {
        Ok(self.stored_events(profile_id).await)
    }

    async fn events_clear(&self, profile_id: Option<&str>) -> Result<(), DragonError> {
        self.write(RecordedCall::ClearEvents {
            profile: owned(profile_id),
        })
        .await?;
        self.state.lock().await.events.remove(&ns(profile_id));
        Ok(())
    }

    async fn profiles_load(&self) -> Result<Vec<Profile>, DragonError> {
        Ok(self.state.lock().await.profiles.clone())
    }

    async fn profiles_save(&self, profiles: &[Profile]) -> Result<(), DragonError> {
        self.write(RecordedCall::SaveProfiles {
            count: profiles.len(),
        })
        .await?;
        self.state.lock().await.profiles = profiles.to_vec();
        Ok(())
    }

    async fn profiles_get_current(&self) -> Result<Option<String>, DragonError> {
        Ok(self.state.lock().await.current.clone())
    }

    async fn profiles_set_current(&self, id: &str) -> Result<(), DragonError> {
        self.write(RecordedCall::SetCurrent { id: id.to_string() })
            .await?;
        self.state.lock().await.current = Some(id.to_string());
        Ok(())
    }

    async fn setting_get(
        &self,
        key: &str,
        profile_id: Option<&str>,
    ) -> Result<Option<String>, DragonError> {
        Ok(self
            .state
            .lock()
            .await
            .settings
            .get(&(ns(profile_id), key.to_string()))
            .cloned())
    }

    async fn setting_set(
        &self,
        key: &str,
        value: &str,
        profile_id: Option<&str>,
    ) -> Result<(), DragonError> {
        self.write(RecordedCall::SetSetting {
            key: key.to_string(),
            profile: owned(profile_id),
        })
        .await?;
        self.seed_setting(key, value, profile_id).await;
        Ok(())
    }

    async fn migrate_global_to_profile(
        &self,
        profile_id: &str,
    ) -> Result<MigrationReport, DragonError> {
        self.write(RecordedCall::Migrate {
            profile: profile_id.to_string(),
        })
        .await?;

        let mut report = MigrationReport::default();
        let mut state = self.state.lock().await;
        let target = profile_id.to_string();

        let has_items = state.items.get(&target).is_some_and(|m| !m.is_empty());
        if let Some(global) = state.items.get("").filter(|m| !m.is_empty()).cloned() {
            if !has_items {
                state.items.insert(target.clone(), global);
                report.copied.push(ITEMS_KEY.to_string());
            }
        }

        let has_events = state.events.get(&target).is_some_and(|e| !e.is_empty());
        if let Some(global) = state.events.get("").filter(|e| !e.is_empty()).cloned() {
            if !has_events {
                state.events.insert(target.clone(), global);
                report.copied.push(EVENTS_KEY.to_string());
            }
        }

        for key in LEGACY_GLOBAL_KEYS {
            let Some(value) = state.settings.get(&(String::new(), key.to_string())).cloned() else {
                continue;
            };
            let scoped = (target.clone(), key.to_string());
            if !state.settings.contains_key(&scoped) {
                state.settings.insert(scoped, value);
                report.copied.push(key.to_string());
            }
        }

        Ok(report)
    }
}
