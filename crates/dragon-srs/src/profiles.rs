// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile lifecycle: creation, switching, PIN locks and per-profile settings.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;
use tracing::{debug, info};

use dragon_bus::{BusEvent, EventBus};
use dragon_core::types::{Avatar, Profile};
use dragon_core::scope::{EVENTS_KEY, ITEMS_KEY, PROFILE_CURRENT_KEY, PROFILE_LIST_KEY};
use dragon_core::{Clock, DragonError, MigrationReport, StorageBackend};

use crate::persist::PersistQueue;

/// Base keys that hold engine or profile state and cannot be used as settings.
const RESERVED_KEYS: &[&str] = &[ITEMS_KEY, EVENTS_KEY, PROFILE_LIST_KEY, PROFILE_CURRENT_KEY];

/// What a successful [`ProfileManager::switch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub profile: Profile,
    pub previous: Option<String>,
    /// Legacy keys copied into the profile. Empty unless this was the first
    /// profile ever made current.
    pub migrated: MigrationReport,
}

/// Manages the saved profile list and the current-profile pointer.
pub struct ProfileManager {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    bus: Arc<EventBus>,
    /// Engine writes that must land before a switch reads or migrates state.
    writer: Option<PersistQueue>,
}

impl ProfileManager {
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>, bus: Arc<EventBus>) -> Self {
        Self {
            backend,
            clock,
            bus,
            writer: None,
        }
    }

    /// Flush `writer` at the start of every switch.
    pub fn with_writer(mut self, writer: PersistQueue) -> Self {
        self.writer = Some(writer);
        self
    }

    pub async fn list(&self) -> Result<Vec<Profile>, DragonError> {
        self.backend.profiles_load().await
    }

    /// The current profile, if the pointer is set and names a saved profile.
    pub async fn current(&self) -> Result<Option<Profile>, DragonError> {
        let Some(id) = self.backend.profiles_get_current().await? else {
            return Ok(None);
        };
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    pub async fn current_id(&self) -> Result<Option<String>, DragonError> {
        self.backend.profiles_get_current().await
    }

    pub async fn get(&self, id: &str) -> Result<Profile, DragonError> {
        self.list()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| DragonError::ProfileNotFound(id.to_string()))
    }

    /// Append a new profile. It does not become current.
    pub async fn create(&self, name: &str, avatar: Avatar) -> Result<Profile, DragonError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DragonError::InvalidInput(
                "profile name must not be empty".to_string(),
            ));
        }

        let now = self.clock.now_ms();
        let profile = Profile {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            avatar,
            created_at: now,
            last_active_at: now,
            pin_hash: None,
        };

        let mut profiles = self.list().await?;
        profiles.push(profile.clone());
        self.backend.profiles_save(&profiles).await?;
        info!(profile_id = %profile.id, name = %profile.name, "profile created");
        Ok(profile)
    }

    /// Make `id` the current profile and notify subscribers.
    ///
    /// Queued engine writes are flushed first, so unscoped items added
    /// before the first profile existed are part of the migration.
    pub async fn switch(&self, id: &str) -> Result<SwitchOutcome, DragonError> {
        if let Some(writer) = &self.writer {
            writer.flush().await;
            debug!("pending writes flushed before profile switch");
        }

        let mut profiles = self.list().await?;
        let previous = self.backend.profiles_get_current().await?;

        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DragonError::ProfileNotFound(id.to_string()))?;
        profile.last_active_at = self.clock.now_ms();
        let profile = profile.clone();

        self.backend.profiles_save(&profiles).await?;
        self.backend.profiles_set_current(id).await?;

        let migrated = if previous.is_none() {
            self.backend.migrate_global_to_profile(id).await?
        } else {
            MigrationReport::default()
        };

        info!(
            profile_id = id,
            previous = ?previous,
            migrated = migrated.copied.len(),
            "profile switched"
        );
        self.bus.publish(BusEvent::ProfileChanged {
            previous: previous.clone(),
            current: id.to_string(),
        });

        Ok(SwitchOutcome {
            profile,
            previous,
            migrated,
        })
    }

    /// Lock a profile behind `pin`.
    pub async fn set_pin(&self, id: &str, pin: &str) -> Result<(), DragonError> {
        if pin.trim().is_empty() {
            return Err(DragonError::InvalidInput("pin must not be empty".to_string()));
        }
        let hash = hash_pin(pin.to_string()).await?;
        self.update(id, |p| p.pin_hash = Some(hash)).await
    }

    pub async fn clear_pin(&self, id: &str) -> Result<(), DragonError> {
        self.update(id, |p| p.pin_hash = None).await
    }

    /// Check `pin` against the profile's hash. Unlocked profiles always pass.
    pub async fn verify_pin(&self, id: &str, pin: &str) -> Result<bool, DragonError> {
        let profile = self.get(id).await?;
        match profile.pin_hash {
            None => Ok(true),
            Some(hash) => verify_pin_hash(pin.to_string(), hash).await,
        }
    }

    /// A setting scoped to the current profile (unscoped without one).
    pub async fn setting(&self, key: &str) -> Result<Option<String>, DragonError> {
        let current = self.backend.profiles_get_current().await?;
        self.backend.setting_get(key, current.as_deref()).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), DragonError> {
        if RESERVED_KEYS.contains(&key) {
            return Err(DragonError::InvalidInput(format!(
                "'{key}' is reserved and cannot be set as a setting"
            )));
        }
        let current = self.backend.profiles_get_current().await?;
        self.backend
            .setting_set(key, value, current.as_deref())
            .await
    }

    async fn update<F>(&self, id: &str, change: F) -> Result<(), DragonError>
    where
        F: FnOnce(&mut Profile),
    {
        let mut profiles = self.list().await?;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DragonError::ProfileNotFound(id.to_string()))?;
        change(profile);
        self.backend.profiles_save(&profiles).await
    }
}

async fn hash_pin(pin: String) -> Result<String, DragonError> {
    tokio::task::spawn_blocking(move || {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| DragonError::InvalidPin(format!("salt encoding failed: {e}")))?;
        Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DragonError::InvalidPin(format!("hashing failed: {e}")))
    })
    .await
    .map_err(|e| DragonError::Internal(format!("pin hashing task failed: {e}")))?
}

async fn verify_pin_hash(pin: String, hash: String) -> Result<bool, DragonError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| DragonError::InvalidPin(format!("stored hash is malformed: {e}")))?;
        Ok(Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| DragonError::Internal(format!("pin verification task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragon_core::ManualClock;
    use dragon_test_utils::MockBackend;

    fn manager() -> (ProfileManager, Arc<MockBackend>, Arc<EventBus>) {
        let mock = Arc::new(MockBackend::new());
        let bus = Arc::new(EventBus::new());
        let manager = ProfileManager::new(mock.clone(), Arc::new(ManualClock::new(42)), bus.clone());
        (manager, mock, bus)
    }

    #[tokio::test]
    async fn create_rejects_blank_names() {
        let (manager, _, _) = manager();
        let err = manager.create("   ", Avatar::Child).await.unwrap_err();
        assert!(matches!(err, DragonError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn switch_unknown_profile_fails() {
        let (manager, _, bus) = manager();
        let err = manager.switch("ghost").await.unwrap_err();
        assert!(matches!(err, DragonError::ProfileNotFound(id) if id == "ghost"));
        assert_eq!(bus.published_count(), 0);
    }

    #[tokio::test]
    async fn pin_lock_round_trip() {
        let (manager, _, _) = manager();
        let profile = manager.create("Lan", Avatar::Female).await.unwrap();
        assert!(manager.verify_pin(&profile.id, "anything").await.unwrap());

        manager.set_pin(&profile.id, "2468").await.unwrap();
        let stored = manager.get(&profile.id).await.unwrap();
        assert!(stored.is_locked());
        assert!(stored.pin_hash.unwrap().starts_with("$argon2id$"));
        assert!(manager.verify_pin(&profile.id, "2468").await.unwrap());
        assert!(!manager.verify_pin(&profile.id, "1357").await.unwrap());

        manager.clear_pin(&profile.id).await.unwrap();
        assert!(manager.verify_pin(&profile.id, "1357").await.unwrap());
    }

    #[tokio::test]
    async fn reserved_keys_are_not_settings() {
        let (manager, mock, _) = manager();
        for key in RESERVED_KEYS {
            let err = manager.set_setting(key, "[]").await.unwrap_err();
            assert!(matches!(err, DragonError::InvalidInput(_)), "{key} accepted");
        }
        assert!(mock.calls().await.is_empty());
        manager.set_setting("ui.lang", "vi").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let (manager, mock, _) = manager();
        let mut profile = manager.create("Minh", Avatar::Male).await.unwrap();
        profile.pin_hash = Some("not-a-phc-string".into());
        mock.profiles_save(&[profile.clone()]).await.unwrap();

        let err = manager.verify_pin(&profile.id, "0000").await.unwrap_err();
        assert!(matches!(err, DragonError::InvalidPin(_)));
    }
}
