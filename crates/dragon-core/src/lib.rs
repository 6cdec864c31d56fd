// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Dragon Bridge.
//!
//! This crate provides the domain types (review items, profiles, activity
//! events), the error type, the clock abstraction, profile key scoping and
//! the [`StorageBackend`] trait implemented by every persistence backend.

pub mod clock;
pub mod error;
pub mod scope;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, DAY_MS, ManualClock, SystemClock};
pub use error::DragonError;
pub use scope::{MigrationReport, scoped_key};
pub use traits::StorageBackend;
pub use types::{
    ActivityEvent, Avatar, BackendKind, Grade, HistoryEntry, ItemType, MAX_BOX, MIN_BOX, Profile,
    ReviewItem,
};
