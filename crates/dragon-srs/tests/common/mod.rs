// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared wiring for engine and profile integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dragon_bus::EventBus;
use dragon_core::ManualClock;
use dragon_srs::{ProfileManager, SchedulingEngine};
use dragon_test_utils::MockBackend;

/// Fixed start time for deterministic due dates.
pub const T0: i64 = 1_735_689_600_000;

pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<EventBus>,
    pub engine: Arc<SchedulingEngine>,
    pub profiles: ProfileManager,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_backend(Arc::new(MockBackend::new())).await
    }

    pub async fn with_backend(backend: Arc<MockBackend>) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let bus = Arc::new(EventBus::new());
        let engine = SchedulingEngine::start(backend.clone(), clock.clone(), bus.clone()).await;
        let profiles = ProfileManager::new(backend.clone(), clock.clone(), bus.clone())
            .with_writer(engine.writer().clone());
        Self {
            backend,
            clock,
            bus,
            engine,
            profiles,
        }
    }

    /// Wait until the engine has switched to `id` and finished reloading.
    pub async fn wait_for_profile(&self, id: &str) {
        wait_until(|| self.engine.profile().as_deref() == Some(id) && !self.engine.is_loading())
            .await;
    }

    /// Wait until the engine has recorded `id`, reload finished or not.
    pub async fn wait_for_switch_start(&self, id: &str) {
        wait_until(|| self.engine.profile().as_deref() == Some(id)).await;
    }
}

pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
