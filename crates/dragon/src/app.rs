// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of backend, engine and profile manager for one CLI invocation.

use std::sync::Arc;

use tracing::debug;

use dragon_bus::EventBus;
use dragon_config::DragonConfig;
use dragon_core::{Clock, DragonError, StorageBackend, SystemClock};
use dragon_srs::{ProfileManager, SchedulingEngine};
use dragon_storage::BackendSelector;

pub struct App {
    pub backend: Arc<dyn StorageBackend>,
    pub engine: Arc<SchedulingEngine>,
    pub profiles: ProfileManager,
}

impl App {
    /// Resolve the configured backend and hydrate the engine.
    pub async fn open(config: &DragonConfig) -> Result<Self, DragonError> {
        let backend = BackendSelector::new(config.storage.clone()).get().await?;
        debug!(backend = %backend.kind(), "storage backend ready");
        Ok(Self::with_backend(backend, Arc::new(SystemClock)).await)
    }

    /// Build on an already initialized backend.
    pub async fn with_backend(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        let bus = Arc::new(EventBus::new());
        let engine = SchedulingEngine::start(backend.clone(), clock.clone(), bus.clone()).await;
        let profiles =
            ProfileManager::new(backend.clone(), clock, bus).with_writer(engine.writer().clone());
        Self {
            backend,
            engine,
            profiles,
        }
    }

    /// The profile whose state commands operate on.
    pub async fn current_profile(&self) -> Result<Option<String>, DragonError> {
        self.profiles.current_id().await
    }

    /// Land queued writes and release the backend.
    pub async fn shutdown(&self) -> Result<(), DragonError> {
        self.engine.flush().await;
        self.backend.close().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use dragon_core::ManualClock;
    use dragon_storage::LocalBackend;

    pub const T0: i64 = 1_735_689_600_000;

    /// An app over an in-memory local backend and a manual clock.
    pub async fn app() -> (App, Arc<ManualClock>) {
        let backend: Arc<dyn StorageBackend> = Arc::new(LocalBackend::in_memory());
        backend.init().await.unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        (App::with_backend(backend, clock.clone()).await, clock)
    }

    /// Captured output of a handler as a string.
    pub fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}
