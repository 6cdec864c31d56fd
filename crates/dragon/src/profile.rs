// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `profile` and `setting` commands.

use std::io::Write;
use std::str::FromStr;

use colored::Colorize;

use dragon_core::DragonError;
use dragon_core::types::{Avatar, Profile};

use crate::app::App;
use crate::output::{format_timestamp, write_json};

/// Find a profile by exact id, then by case-insensitive name.
async fn resolve(app: &App, needle: &str) -> Result<Profile, DragonError> {
    let profiles = app.profiles.list().await?;
    if let Some(p) = profiles.iter().find(|p| p.id == needle) {
        return Ok(p.clone());
    }

    let mut by_name = profiles
        .into_iter()
        .filter(|p| p.name.eq_ignore_ascii_case(needle));
    match (by_name.next(), by_name.next()) {
        (Some(p), None) => Ok(p),
        (Some(_), Some(_)) => Err(DragonError::InvalidInput(format!(
            "more than one profile is named '{needle}', use the id"
        ))),
        (None, _) => Err(DragonError::ProfileNotFound(needle.to_string())),
    }
}

/// Fail unless `pin` unlocks `profile`.
async fn unlock(app: &App, profile: &Profile, pin: Option<&str>) -> Result<(), DragonError> {
    if !profile.is_locked() {
        return Ok(());
    }
    let Some(pin) = pin else {
        return Err(DragonError::InvalidPin(format!(
            "profile '{}' is locked, pass --pin",
            profile.name
        )));
    };
    if app.profiles.verify_pin(&profile.id, pin).await? {
        Ok(())
    } else {
        Err(DragonError::InvalidPin("wrong pin".to_string()))
    }
}

pub async fn list(
    app: &App,
    json: bool,
    use_color: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let profiles = app.profiles.list().await?;
    let current = app.current_profile().await?;

    if json {
        return write_json(out, &profiles);
    }
    if profiles.is_empty() {
        writeln!(out, "no profiles")?;
        return Ok(());
    }
    for p in &profiles {
        let marker = if current.as_deref() == Some(p.id.as_str()) {
            if use_color {
                "*".green().bold().to_string()
            } else {
                "*".to_string()
            }
        } else {
            " ".to_string()
        };
        let lock = if p.is_locked() { " [locked]" } else { "" };
        writeln!(
            out,
            "{marker} {:<16} {:<7} {}  last active {}{lock}",
            p.name,
            p.avatar.to_string(),
            p.id,
            format_timestamp(p.last_active_at)
        )?;
    }
    Ok(())
}

pub async fn create(
    app: &App,
    name: &str,
    avatar: &str,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let avatar = Avatar::from_str(&avatar.to_ascii_lowercase()).map_err(|_| {
        DragonError::InvalidInput(format!(
            "unknown avatar '{avatar}' (expected male, female or child)"
        ))
    })?;
    let profile = app.profiles.create(name, avatar).await?;
    writeln!(out, "created profile {} ({})", profile.name, profile.id)?;
    Ok(())
}

pub async fn switch(
    app: &App,
    needle: &str,
    pin: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let profile = resolve(app, needle).await?;
    unlock(app, &profile, pin).await?;

    let outcome = app.profiles.switch(&profile.id).await?;

    writeln!(out, "switched to {}", outcome.profile.name)?;
    if !outcome.migrated.is_empty() {
        writeln!(
            out,
            "copied existing data into this profile: {}",
            outcome.migrated.copied.join(", ")
        )?;
    }
    Ok(())
}

pub async fn set_pin(
    app: &App,
    needle: &str,
    pin: &str,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let profile = resolve(app, needle).await?;
    app.profiles.set_pin(&profile.id, pin).await?;
    writeln!(out, "profile {} is now locked", profile.name)?;
    Ok(())
}

pub async fn clear_pin(
    app: &App,
    needle: &str,
    pin: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let profile = resolve(app, needle).await?;
    unlock(app, &profile, pin).await?;
    app.profiles.clear_pin(&profile.id).await?;
    writeln!(out, "profile {} is unlocked", profile.name)?;
    Ok(())
}

pub async fn setting_get(app: &App, key: &str, out: &mut dyn Write) -> Result<(), DragonError> {
    match app.profiles.setting(key).await? {
        Some(value) => writeln!(out, "{value}")?,
        None => writeln!(out, "{key} is not set")?,
    }
    Ok(())
}

pub async fn setting_set(
    app: &App,
    key: &str,
    value: &str,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    if key.trim().is_empty() {
        return Err(DragonError::InvalidInput("setting key must not be empty".to_string()));
    }
    app.profiles.set_setting(key, value).await?;
    writeln!(out, "{key} = {value}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{app, text};
    use dragon_core::StorageBackend;

    #[tokio::test]
    async fn create_and_switch_by_name() {
        let (app, _) = app().await;
        create(&app, "Lan", "Female", &mut Vec::new()).await.unwrap();

        let mut buf = Vec::new();
        switch(&app, "lan", None, &mut buf).await.unwrap();
        assert_eq!(text(buf), "switched to Lan\n");

        let mut buf = Vec::new();
        list(&app, false, false, &mut buf).await.unwrap();
        let out = text(buf);
        assert!(out.starts_with("* Lan"));
        assert!(out.contains("female"));
    }

    #[tokio::test]
    async fn first_switch_reports_migrated_data() {
        let (app, _) = app().await;
        crate::review::add(&app, "你好", "word", None, &mut Vec::new()).unwrap();
        create(&app, "An", "child", &mut Vec::new()).await.unwrap();

        let mut buf = Vec::new();
        switch(&app, "An", None, &mut buf).await.unwrap();
        let out = text(buf);
        assert!(out.contains("copied existing data into this profile: srs.items"));
    }

    #[tokio::test]
    async fn locked_profile_needs_the_right_pin() {
        let (app, _) = app().await;
        create(&app, "Minh", "male", &mut Vec::new()).await.unwrap();
        set_pin(&app, "Minh", "2468", &mut Vec::new()).await.unwrap();

        let err = switch(&app, "Minh", None, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, DragonError::InvalidPin(_)));
        let err = switch(&app, "Minh", Some("0000"), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DragonError::InvalidPin(_)));
        assert_eq!(app.current_profile().await.unwrap(), None);

        switch(&app, "Minh", Some("2468"), &mut Vec::new())
            .await
            .unwrap();
        clear_pin(&app, "Minh", Some("2468"), &mut Vec::new())
            .await
            .unwrap();
        assert!(!resolve(&app, "Minh").await.unwrap().is_locked());
    }

    #[tokio::test]
    async fn ambiguous_and_unknown_names_are_rejected() {
        let (app, _) = app().await;
        create(&app, "Twin", "male", &mut Vec::new()).await.unwrap();
        create(&app, "twin", "female", &mut Vec::new()).await.unwrap();

        let err = resolve(&app, "TWIN").await.unwrap_err();
        assert!(matches!(err, DragonError::InvalidInput(_)));
        let err = resolve(&app, "nobody").await.unwrap_err();
        assert!(matches!(err, DragonError::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn settings_round_trip_through_the_current_profile() {
        let (app, _) = app().await;
        let mut buf = Vec::new();
        setting_get(&app, "ui.lang", &mut buf).await.unwrap();
        setting_set(&app, "ui.lang", "vi", &mut buf).await.unwrap();
        setting_get(&app, "ui.lang", &mut buf).await.unwrap();
        assert_eq!(text(buf), "ui.lang is not set\nui.lang = vi\nvi\n");
    }

    #[tokio::test]
    async fn setting_cannot_overwrite_the_deck() {
        let (app, _) = app().await;
        crate::review::add(&app, "你好", "word", None, &mut Vec::new()).unwrap();
        app.engine.flush().await;

        let err = setting_set(&app, "srs.items", "{}", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DragonError::InvalidInput(_)));
        assert_eq!(app.backend.items_load_all(None).await.unwrap().len(), 1);
    }
}
