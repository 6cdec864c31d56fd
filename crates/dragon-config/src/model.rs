// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DragonConfig {
    /// Application-wide settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Application-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Which storage backend the selector may choose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendPreference {
    /// Relational when available, local otherwise.
    #[default]
    Auto,
    /// Always the local key-value backend.
    Local,
    /// Relational when available; still falls back to local if it cannot start.
    Relational,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend selection policy.
    #[serde(default)]
    pub backend: BackendPreference,

    /// Path to the SQLite database file used by the relational backend.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding the local key-value backend's blobs.
    #[serde(default = "default_kv_dir")]
    pub kv_dir: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            database_path: default_database_path(),
            kv_dir: default_kv_dir(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|p| p.join("dragon"))
        .unwrap_or_else(|| std::path::PathBuf::from(".dragon"))
}

fn default_database_path() -> String {
    data_dir()
        .join("dragon_bridge.db")
        .to_string_lossy()
        .into_owned()
}

fn default_kv_dir() -> String {
    data_dir().join("kv").to_string_lossy().into_owned()
}

fn default_wal_mode() -> bool {
    true
}
