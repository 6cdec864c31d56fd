// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Dragon Bridge.

use thiserror::Error;

/// The primary error type used by the storage backends, the scheduling engine
/// and the profile manager.
#[derive(Debug, Error)]
pub enum DragonError {
    /// Configuration errors (invalid TOML, bad values, unusable paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, file I/O).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A value could not be encoded or decoded for persistence.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// A backend operation was called before `init()`.
    #[error("storage backend not initialized")]
    NotInitialized,

    /// The requested profile id is not in the saved profile list.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// A PIN could not be hashed or the stored hash is malformed.
    #[error("invalid pin: {0}")]
    InvalidPin(String),

    /// A caller-supplied value was rejected (empty profile name, empty PIN).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DragonError {
    /// Wrap any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DragonError::Storage {
            source: Box::new(err),
        }
    }
}

impl From<std::io::Error> for DragonError {
    fn from(err: std::io::Error) -> Self {
        DragonError::storage(err)
    }
}
