// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile scoping of storage keys.
//!
//! Every piece of persisted state is addressed by a base name. When a profile
//! is active the base is suffixed with `::{profile_id}` so one physical key
//! never holds two profiles' state.

/// Separator between a base key and the owning profile id.
pub const SCOPE_SEPARATOR: &str = "::";

/// Base key for the review item table.
pub const ITEMS_KEY: &str = "srs.items";

/// Base key for the activity log.
pub const EVENTS_KEY: &str = "activity.logs";

/// Unscoped key holding the saved profile list.
pub const PROFILE_LIST_KEY: &str = "profile.list";

/// Unscoped key holding the current profile id.
pub const PROFILE_CURRENT_KEY: &str = "profile.current";

/// Keys that existed before profiles were introduced. They are copied into
/// a profile's scope the first time that profile is migrated.
pub const LEGACY_GLOBAL_KEYS: &[&str] = &[
    ITEMS_KEY,
    EVENTS_KEY,
    "daily.reminder.config",
    "dialect.selectedDialects",
    "dialect.playbackRate",
    "dialect.preferredVoice",
    "ui.lang",
];

/// Qualify `base` with the owning profile, or return it unscoped.
pub fn scoped_key(base: &str, profile_id: Option<&str>) -> String {
    match profile_id {
        Some(id) if !id.is_empty() => format!("{base}{SCOPE_SEPARATOR}{id}"),
        _ => base.to_string(),
    }
}

/// Keys migrated into a profile by `migrate_global_to_profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Legacy base keys whose global value was copied.
    pub copied: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
    }
}
