// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for Dragon Bridge.
//!
//! Two implementations of [`dragon_core::StorageBackend`]:
//! - [`LocalBackend`]: JSON blobs in a key-value store (in memory or one file
//!   per key on disk).
//! - `SqliteBackend` (feature `sqlite`, on by default): WAL-mode SQLite with
//!   embedded migrations and a single-writer connection via `tokio-rusqlite`.
//!
//! [`BackendSelector`] picks one of them once per process.

pub mod kv;
pub mod local;
pub mod selector;

#[cfg(feature = "sqlite")]
pub mod database;
#[cfg(feature = "sqlite")]
pub mod migrations;
#[cfg(feature = "sqlite")]
pub mod queries;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use local::LocalBackend;
pub use selector::BackendSelector;

#[cfg(feature = "sqlite")]
pub use database::Database;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
