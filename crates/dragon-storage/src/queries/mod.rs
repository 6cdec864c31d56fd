// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for the relational backend.

pub mod events;
pub mod items;
pub mod migrate;
pub mod profiles;
pub mod settings;

/// Value stored in the `profile_id` column for the unscoped namespace.
pub const UNSCOPED: &str = "";

/// Map an optional profile id to its `profile_id` column value.
pub fn namespace(profile_id: Option<&str>) -> String {
    profile_id.unwrap_or(UNSCOPED).to_string()
}
