// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! String key-value stores underneath the local backend.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use dragon_core::DragonError;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Longest hex-encoded key used verbatim as a file name. Keeps names well
/// under the usual 255-byte limit once the extension is added.
const MAX_HEX_NAME: usize = 200;

/// Flat string-to-string store. Keys are opaque; values are whole blobs.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Prepare the store (create directories). Idempotent.
    async fn init(&self) -> Result<(), DragonError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DragonError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), DragonError>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), DragonError>;
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> DragonError {
    DragonError::Internal("key-value store lock poisoned".to_string())
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DragonError> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DragonError> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DragonError> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
///
/// File names are the hex-encoded key, so any key is a valid file name.
/// Keys whose encoding would be too long are named `sha256-{digest}`
/// instead; the `-` cannot appear in a hex name, so the two never collide.
/// Writes go to a temp file in the same directory and are renamed over the
/// target, so readers see either the old or the new blob.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }
}

fn file_name_for(key: &str) -> String {
    let encoded = hex::encode(key);
    if encoded.len() <= MAX_HEX_NAME {
        format!("{encoded}.json")
    } else {
        format!("sha256-{}.json", hex::encode(Sha256::digest(key.as_bytes())))
    }
}

async fn blocking<T, F>(f: F) -> Result<T, DragonError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DragonError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DragonError::Internal(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn init(&self) -> Result<(), DragonError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        debug!(dir = %self.dir.display(), "key-value directory ready");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DragonError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DragonError> {
        let dir = self.dir.clone();
        let target = self.path_for(key);
        let value = value.to_string();
        blocking(move || {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), DragonError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_set_get_remove() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path().join("kv"));
        store.init().await.unwrap();
        store.set("srs.items::p1", "{}").await.unwrap();
        store.set("srs.items::p1", "{\"x\":1}").await.unwrap();

        let reopened = FileKvStore::new(dir.path().join("kv"));
        assert_eq!(
            reopened.get("srs.items::p1").await.unwrap().as_deref(),
            Some("{\"x\":1}")
        );
    }

    #[tokio::test]
    async fn file_names_are_hex_encoded_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        store.init().await.unwrap();
        store.set("a/b::c", "v").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![format!("{}.json", hex::encode("a/b::c"))]);
    }

    #[tokio::test]
    async fn long_keys_get_hashed_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        store.init().await.unwrap();

        let long = format!("dialect.{}::p1", "x".repeat(300));
        let longer = format!("dialect.{}::p1", "x".repeat(301));
        store.set(&long, "a").await.unwrap();
        store.set(&longer, "b").await.unwrap();
        assert_eq!(store.get(&long).await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.get(&longer).await.unwrap().as_deref(), Some("b"));

        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().into_string().unwrap();
            assert!(name.starts_with("sha256-"), "{name}");
            assert!(name.len() < 255);
        }
        store.remove(&long).await.unwrap();
        assert_eq!(store.get(&long).await.unwrap(), None);
    }

    #[test]
    fn short_keys_keep_hex_names() {
        assert_eq!(file_name_for("ui.lang"), format!("{}.json", hex::encode("ui.lang")));
        assert_eq!(file_name_for(&"k".repeat(100)).len(), 205);
        assert!(file_name_for(&"k".repeat(101)).starts_with("sha256-"));
    }

    #[tokio::test]
    async fn file_store_remove_absent_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        store.remove("missing").await.unwrap();
    }
}
