// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolves the storage backend once per process.
//!
//! The relational backend wins when it is compiled in, allowed by the
//! configuration and starts cleanly. Anything else falls back to the local
//! backend over a [`FileKvStore`].

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use dragon_config::model::StorageConfig;
use dragon_core::{DragonError, StorageBackend};

use crate::kv::{FileKvStore, KvStore};
use crate::local::LocalBackend;

/// Shared, lazily resolved backend handle.
///
/// Clones share the resolution; concurrent first callers wait for a single
/// construction and `init()`.
#[derive(Clone)]
pub struct BackendSelector {
    inner: Arc<SelectorInner>,
}

struct SelectorInner {
    config: StorageConfig,
    local_store: Option<Arc<dyn KvStore>>,
    resolved: OnceCell<Arc<dyn StorageBackend>>,
}

impl BackendSelector {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            inner: Arc::new(SelectorInner {
                config,
                local_store: None,
                resolved: OnceCell::new(),
            }),
        }
    }

    /// Use `store` instead of a [`FileKvStore`] if the local backend is chosen.
    pub fn with_local_store(config: StorageConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            inner: Arc::new(SelectorInner {
                config,
                local_store: Some(store),
                resolved: OnceCell::new(),
            }),
        }
    }

    /// The resolved, initialized backend. Resolves on first call.
    pub async fn get(&self) -> Result<Arc<dyn StorageBackend>, DragonError> {
        self.inner
            .resolved
            .get_or_try_init(|| self.inner.resolve())
            .await
            .cloned()
    }

    /// The backend if it has already been resolved.
    pub fn resolved(&self) -> Option<Arc<dyn StorageBackend>> {
        self.inner.resolved.get().cloned()
    }
}

impl SelectorInner {
    async fn resolve(&self) -> Result<Arc<dyn StorageBackend>, DragonError> {
        if let Some(relational) = self.try_relational().await {
            return Ok(relational);
        }

        let store = match &self.local_store {
            Some(store) => store.clone(),
            None => Arc::new(FileKvStore::new(&self.config.kv_dir)) as Arc<dyn KvStore>,
        };
        let local = LocalBackend::new(store);
        local.init().await?;
        info!(backend = "local", kv_dir = %self.config.kv_dir, "storage backend selected");
        Ok(Arc::new(local))
    }

    #[cfg(feature = "sqlite")]
    async fn try_relational(&self) -> Option<Arc<dyn StorageBackend>> {
        let backend = match crate::sqlite::SqliteBackend::try_new(&self.config) {
            Ok(Some(backend)) => backend,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "relational backend construction failed, using local");
                return None;
            }
        };
        match backend.init().await {
            Ok(()) => {
                info!(
                    backend = "relational",
                    path = %self.config.database_path,
                    "storage backend selected"
                );
                Some(Arc::new(backend))
            }
            Err(e) => {
                warn!(error = %e, "relational backend failed to start, using local");
                None
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    async fn try_relational(&self) -> Option<Arc<dyn StorageBackend>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use dragon_config::model::BackendPreference;
    use dragon_core::types::BackendKind;

    fn config(dir: &std::path::Path, backend: BackendPreference) -> StorageConfig {
        StorageConfig {
            backend,
            database_path: dir.join("dragon.db").to_string_lossy().into_owned(),
            kv_dir: dir.join("kv").to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn local_preference_selects_local() {
        let dir = tempfile::tempdir().unwrap();
        let selector = BackendSelector::new(config(dir.path(), BackendPreference::Local));
        let backend = selector.get().await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Local);
        assert!(dir.path().join("kv").is_dir());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn auto_prefers_relational() {
        let dir = tempfile::tempdir().unwrap();
        let selector = BackendSelector::new(config(dir.path(), BackendPreference::Auto));
        assert_eq!(selector.get().await.unwrap().kind(), BackendKind::Relational);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    #[tracing_test::traced_test]
    async fn failing_relational_init_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the database file should be makes open fail.
        let cfg = config(dir.path(), BackendPreference::Relational);
        std::fs::create_dir_all(&cfg.database_path).unwrap();

        let selector =
            BackendSelector::with_local_store(cfg, Arc::new(MemoryKvStore::new()));
        assert_eq!(selector.get().await.unwrap().kind(), BackendKind::Local);
        assert!(logs_contain("relational backend failed to start"));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_instance() {
        let dir = tempfile::tempdir().unwrap();
        let selector = BackendSelector::new(config(dir.path(), BackendPreference::Auto));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let selector = selector.clone();
            handles.push(tokio::spawn(async move { selector.get().await.unwrap() }));
        }
        let first = selector.get().await.unwrap();
        for h in handles {
            assert!(Arc::ptr_eq(&first, &h.await.unwrap()));
        }
        assert!(Arc::ptr_eq(&first, &selector.resolved().unwrap()));
    }
}
